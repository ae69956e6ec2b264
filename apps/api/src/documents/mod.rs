//! Document Reader: plain-text extraction from uploaded resumes.
//!
//! Accepted formats: `.pdf` (pdf-extract) and `.docx` (top-level body paragraphs).
//! Extraction is blocking file I/O; async callers wrap it in `spawn_blocking`.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

pub mod reader;

pub use reader::extract_text;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Unsupported file format: {0:?}")]
    UnsupportedFormat(String),

    #[error("Failed to read document: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to extract text: {0}")]
    Extraction(String),

    #[error("Document contains no extractable text")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Pdf,
    Docx,
}

impl SourceFormat {
    /// Detects the format from the lowercased file extension.
    pub fn from_path(path: &Path) -> Result<Self, DocumentError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        extension.parse()
    }

    pub fn extension(&self) -> &'static str {
        match self {
            SourceFormat::Pdf => "pdf",
            SourceFormat::Docx => "docx",
        }
    }
}

impl FromStr for SourceFormat {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Ok(SourceFormat::Pdf),
            "docx" => Ok(SourceFormat::Docx),
            other => Err(DocumentError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection_is_case_insensitive() {
        assert_eq!(
            SourceFormat::from_path(Path::new("/tmp/CV.PDF")).unwrap(),
            SourceFormat::Pdf
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("resume.Docx")).unwrap(),
            SourceFormat::Docx
        );
    }

    #[test]
    fn test_unknown_or_missing_extension_is_unsupported() {
        for name in ["resume.txt", "resume.doc", "resume"] {
            let err = SourceFormat::from_path(Path::new(name)).unwrap_err();
            assert!(matches!(err, DocumentError::UnsupportedFormat(_)), "{name}");
        }
    }
}
