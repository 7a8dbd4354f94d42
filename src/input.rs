//! Document input: the file a run uploads.
//!
//! Content is forwarded to the remote service as text. Binary formats (PDF,
//! DOCX, XLS) are not parsed locally; their bytes are decoded lossily as
//! UTF-8 and sent as-is, so the quality of their summaries depends entirely
//! on what survives that decoding.

use crate::error::SummarizeError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extensions the upload step is meant for. Checked as a hint only.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["txt", "csv", "pdf", "docx", "xls", "xlsx"];

/// Where the document's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// Read from disk when the run starts uploading.
    Path(PathBuf),
    /// Already in memory.
    Bytes(Vec<u8>),
}

/// A user-selected document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInput {
    /// Display name (file name for path inputs).
    pub name: String,
    pub source: DocumentSource,
}

impl DocumentInput {
    /// A document on disk. The file is not touched until the run reads it.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            source: DocumentSource::Path(path.to_path_buf()),
        }
    }

    /// A document already held in memory.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            source: DocumentSource::Bytes(bytes.into()),
        }
    }

    /// Lower-cased extension of the display name, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
    }

    /// True when the extension is one of [`ACCEPTED_EXTENSIONS`].
    pub fn has_supported_extension(&self) -> bool {
        self.extension()
            .map(|e| ACCEPTED_EXTENSIONS.contains(&e.as_str()))
            .unwrap_or(false)
    }

    /// Read the whole document as text.
    ///
    /// Invalid UTF-8 sequences become U+FFFD; nothing else is decoded.
    pub async fn read_text(&self) -> Result<String, SummarizeError> {
        if !self.has_supported_extension() {
            warn!(
                "'{}' is not one of {:?}; forwarding its content as text anyway",
                self.name, ACCEPTED_EXTENSIONS
            );
        }

        let bytes = match self.source {
            DocumentSource::Bytes(ref b) => b.clone(),
            DocumentSource::Path(ref p) => {
                tokio::fs::read(p)
                    .await
                    .map_err(|source| SummarizeError::InputRead {
                        path: p.clone(),
                        source,
                    })?
            }
        };
        debug!("Read {} bytes from '{}'", bytes.len(), self.name);

        Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }
}
