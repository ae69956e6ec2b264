//! File-backed session storage under `UPLOAD_DIR`.
//!
//! Layout: `<session_id>_<filename>` for the upload,
//! `<session_id>_upload_name.txt` holding that file name, and
//! `<session_id>_rewritten_resume.txt` for the rewritten resume.
//! Files are never deleted here; an external janitor owns cleanup.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use crate::documents::SourceFormat;

const REWRITTEN_SUFFIX: &str = "rewritten_resume.txt";
const UPLOAD_NAME_SUFFIX: &str = "upload_name.txt";
const FALLBACK_FILENAME: &str = "resume";

#[derive(Debug, Clone)]
pub struct ResumeStore {
    dir: PathBuf,
}

impl ResumeStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn upload_path(&self, session_id: Uuid, filename: &str) -> PathBuf {
        self.dir.join(format!("{session_id}_{filename}"))
    }

    fn rewritten_path(&self, session_id: Uuid) -> PathBuf {
        self.dir.join(format!("{session_id}_{REWRITTEN_SUFFIX}"))
    }

    fn upload_name_path(&self, session_id: Uuid) -> PathBuf {
        self.dir.join(format!("{session_id}_{UPLOAD_NAME_SUFFIX}"))
    }

    /// Writes the uploaded bytes and returns their path. `filename` must already be
    /// sanitised (see `stored_filename`).
    pub async fn save_upload(&self, session_id: Uuid, filename: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.upload_path(session_id, filename);
        fs::write(&path, bytes).await?;
        fs::write(self.upload_name_path(session_id), filename).await?;
        Ok(path)
    }

    pub async fn save_rewritten(&self, session_id: Uuid, text: &str) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.rewritten_path(session_id);
        fs::write(&path, text).await?;
        Ok(path)
    }

    /// The rewritten resume, or `None` if the session is unknown or was cleaned up.
    pub async fn load_rewritten(&self, session_id: Uuid) -> io::Result<Option<String>> {
        match fs::read_to_string(self.rewritten_path(session_id)).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Stem of the uploaded file name, used to name downloads. Falls back to `resume`.
    pub async fn original_stem(&self, session_id: Uuid) -> String {
        let Ok(filename) = fs::read_to_string(self.upload_name_path(session_id)).await else {
            return FALLBACK_FILENAME.to_string();
        };
        match Path::new(filename.trim()).file_stem().and_then(|s| s.to_str()) {
            Some(stem) if !stem.is_empty() => stem.to_string(),
            _ => FALLBACK_FILENAME.to_string(),
        }
    }
}

/// Name under which an upload is stored: the sanitised stem of the client's file
/// name plus the canonical extension of `format`. The stem falls back to `resume`.
pub fn stored_filename(raw: &str, format: SourceFormat) -> String {
    let cleaned = sanitize_filename(raw);
    let stem = match cleaned.rsplit_once('.') {
        Some((stem, _)) => stem,
        None if cleaned.eq_ignore_ascii_case(format.extension()) => "",
        None => cleaned.as_str(),
    };
    let stem = if stem.is_empty() { FALLBACK_FILENAME } else { stem };
    format!("{stem}.{}", format.extension())
}

/// Reduces a client-supplied file name to a safe single path component of
/// ASCII letters, digits, `.`, `-` and `_`. Returns an empty string if nothing survives.
pub fn sanitize_filename(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = last
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    cleaned.trim_start_matches(['.', '_']).to_string()
}
