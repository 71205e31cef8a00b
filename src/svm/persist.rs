//! Model artifact: a zstd-compressed tar holding `manifest.json` and
//! `svm.json`.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tar::{Archive, Builder, Header};
use tempfile::NamedTempFile;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, info};
use zstd::stream::{read::Decoder as ZstdDecoder, write::Encoder as ZstdEncoder};

use super::{Svm, SvmParams, TrainedModel};
use crate::error::{DigitError, Result};
use crate::models::Label;

const FORMAT_NAME: &str = "digitcam-svm";
const FORMAT_VERSION: u32 = 1;
const MANIFEST_ENTRY: &str = "manifest.json";
const MODEL_ENTRY: &str = "svm.json";

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    format: String,
    format_version: u32,
    crate_version: String,
    created: String,
    descriptor_len: usize,
    classes: Vec<Label>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SvmDocument {
    params: SvmParams,
    model: TrainedModel,
}

impl Svm {
    /// Write the trained model to `path`.
    ///
    /// The archive is written to a temporary file next to `path` and renamed
    /// into place, so an existing artifact is replaced only by a complete one.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let model = self.model.as_ref().ok_or(DigitError::Untrained)?;

        let now = OffsetDateTime::now_utc();
        let manifest = Manifest {
            format: FORMAT_NAME.to_string(),
            format_version: FORMAT_VERSION,
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            created: now
                .format(&Rfc3339)
                .map_err(|e| std::io::Error::other(e.to_string()))?,
            descriptor_len: model.descriptor_len,
            classes: model.classes.clone(),
        };
        let document = SvmDocument {
            params: self.params,
            model: model.clone(),
        };
        let manifest_json = serde_json::to_vec_pretty(&manifest).map_err(std::io::Error::other)?;
        let document_json = serde_json::to_vec(&document).map_err(std::io::Error::other)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let staging = NamedTempFile::new_in(dir)?;

        let encoder = ZstdEncoder::new(staging.as_file(), 3)?;
        let mut tar = Builder::new(encoder);
        let mtime = now.unix_timestamp().max(0) as u64;
        append_entry(&mut tar, MANIFEST_ENTRY, &manifest_json, mtime)?;
        append_entry(&mut tar, MODEL_ENTRY, &document_json, mtime)?;
        let encoder = tar.into_inner()?;
        encoder.finish()?;

        staging.as_file().sync_all()?;
        staging.persist(path).map_err(|e| e.error)?;

        info!(
            "Saved SVM model to {} ({} support vectors)",
            path.display(),
            model.support_vectors.len()
        );
        Ok(())
    }

    /// Replace this instance's parameters and model with the artifact at
    /// `path`. On any failure the instance is left exactly as it was.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(DigitError::ModelNotFound(path.to_path_buf()));
        }

        let document = read_document(path).map_err(|reason| DigitError::ModelCorrupt {
            path: path.to_path_buf(),
            reason,
        })?;

        self.params = document.params;
        self.model = Some(document.model);
        debug!("Loaded SVM model from {}", path.display());
        Ok(())
    }

    /// Load a new instance from `path`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut svm = Self::new();
        svm.load(path)?;
        Ok(svm)
    }
}

fn append_entry<W: std::io::Write>(
    tar: &mut Builder<W>,
    name: &str,
    bytes: &[u8],
    mtime: u64,
) -> Result<()> {
    let mut header = Header::new_gnu();
    header.set_size(bytes.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(mtime);
    header.set_cksum();
    tar.append_data(&mut header, name, bytes)?;
    Ok(())
}

fn read_document(path: &Path) -> std::result::Result<SvmDocument, String> {
    let file = File::open(path).map_err(|e| e.to_string())?;
    let decoder = ZstdDecoder::new(file).map_err(|e| format!("invalid zstd stream: {}", e))?;
    let mut archive = Archive::new(decoder);

    let mut manifest_json = None;
    let mut document_json = None;
    let entries = archive.entries().map_err(|e| format!("invalid archive: {}", e))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| format!("invalid archive entry: {}", e))?;
        let name = entry
            .path()
            .map_err(|e| e.to_string())?
            .to_string_lossy()
            .into_owned();
        let mut contents = String::new();
        entry
            .read_to_string(&mut contents)
            .map_err(|e| format!("cannot read {}: {}", name, e))?;
        match name.as_str() {
            MANIFEST_ENTRY => manifest_json = Some(contents),
            MODEL_ENTRY => document_json = Some(contents),
            _ => {}
        }
    }

    let manifest_json = manifest_json.ok_or_else(|| format!("missing {}", MANIFEST_ENTRY))?;
    let document_json = document_json.ok_or_else(|| format!("missing {}", MODEL_ENTRY))?;

    let manifest: Manifest =
        serde_json::from_str(&manifest_json).map_err(|e| format!("{}: {}", MANIFEST_ENTRY, e))?;
    if manifest.format != FORMAT_NAME || manifest.format_version != FORMAT_VERSION {
        return Err(format!(
            "unsupported format {} v{}",
            manifest.format, manifest.format_version
        ));
    }
    OffsetDateTime::parse(&manifest.created, &Rfc3339)
        .map_err(|e| format!("bad creation timestamp: {}", e))?;

    let document: SvmDocument =
        serde_json::from_str(&document_json).map_err(|e| format!("{}: {}", MODEL_ENTRY, e))?;
    document.model.validate()?;
    if document.model.descriptor_len != manifest.descriptor_len
        || document.model.classes != manifest.classes
    {
        return Err("manifest does not match model".to_string());
    }
    Ok(document)
}
