//! Text extraction for uploaded documents
//!
//! Parsing never fails an upload: a broken file produces an
//! [`Extraction::Failed`] marker that is stored as the document body.

pub mod docx;
pub mod email;
pub mod pdf;
pub mod xlsx;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::errors::{DocError, Result};

/// Document type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Docx,
    Xlsx,
    Email,
    Other,
}

impl FileType {
    /// Classify an upload by its extension (case-insensitive)
    pub fn from_filename(filename: &str) -> Result<Self> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => Ok(FileType::Pdf),
            "docx" => Ok(FileType::Docx),
            "xlsx" | "xls" => Ok(FileType::Xlsx),
            "eml" | "msg" => Ok(FileType::Email),
            "" => Err(DocError::UnsupportedFileType(filename.to_string())),
            other => Err(DocError::UnsupportedFileType(format!(".{}", other))),
        }
    }

    /// Stored tag
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Docx => "docx",
            FileType::Xlsx => "xlsx",
            FileType::Email => "email",
            FileType::Other => "other",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = DocError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pdf" => Ok(FileType::Pdf),
            "docx" => Ok(FileType::Docx),
            "xlsx" => Ok(FileType::Xlsx),
            "email" => Ok(FileType::Email),
            "other" => Ok(FileType::Other),
            unknown => Err(DocError::UnsupportedFileType(unknown.to_string())),
        }
    }
}

/// Outcome of parsing one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Extracted plain text
    Text(String),
    /// Parse failed; the marker is stored instead of text
    Failed(String),
}

impl Extraction {
    /// Body to persist on the document
    pub fn content(&self) -> &str {
        match self {
            Extraction::Text(text) => text,
            Extraction::Failed(marker) => marker,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Extraction::Failed(_))
    }
}

/// Extract the text of a stored file according to its declared type
pub fn extract_text(path: &Path, file_type: FileType) -> Extraction {
    let (label, result) = match file_type {
        FileType::Pdf => ("PDF", pdf::extract(path)),
        FileType::Docx => ("DOCX", docx::extract(path)),
        FileType::Xlsx => ("XLSX", xlsx::extract(path)),
        FileType::Email => ("email", email::extract(path)),
        FileType::Other => return Extraction::Failed("Unsupported file type".to_string()),
    };

    match result {
        Ok(text) => {
            debug!(path = %path.display(), file_type = %file_type, chars = text.chars().count(), "extracted text");
            Extraction::Text(text)
        }
        Err(e) => {
            warn!(path = %path.display(), file_type = %file_type, error = %e, "text extraction failed");
            Extraction::Failed(format!("Error parsing {}: {}", label, e))
        }
    }
}
