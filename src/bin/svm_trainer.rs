use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use digitcam::logging;
use digitcam::{Trainer, TrainerConfig};

#[derive(Parser)]
#[command(name = "svm-trainer")]
#[command(about = "Train the handwritten digit classifier and detector SVMs")]
struct Cli {
    /// Directory holding the four MNIST files
    #[arg(long, value_name = "DIR", default_value = "./data/MNIST")]
    mnist_dir: PathBuf,

    /// Directory holding the non-digit examples in train/ and test/
    #[arg(long, value_name = "DIR", default_value = "./data/NotDigits")]
    negatives_dir: PathBuf,

    /// Number of non-digit training images
    #[arg(long, default_value_t = 30_000)]
    negatives_train: usize,

    /// Number of non-digit test images
    #[arg(long, default_value_t = 10_000)]
    negatives_test: usize,

    /// Directory the two model files are written to
    #[arg(long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Grid-search C and gamma for the classifier with k-fold cross-validation
    #[arg(long, value_name = "K")]
    auto_tune: Option<usize>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Cli::parse();
    logging::init(args.verbose);

    let mut config = TrainerConfig::default()
        .with_mnist_dir(&args.mnist_dir)
        .with_negatives_dir(&args.negatives_dir)
        .with_negative_counts(args.negatives_train, args.negatives_test)
        .with_output_dir(&args.output_dir);
    if let Some(folds) = args.auto_tune {
        config = config.with_auto_tune(folds);
    }

    match Trainer::new(config).run() {
        Ok(report) => {
            info!(
                "Training complete: classifier {:.2}% error, detector {:.2}% error",
                report.classifier_error, report.detector_error
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
