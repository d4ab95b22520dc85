//! Recordings on the local filesystem.
//!
//! Every upload is kept as `recording_<YYYYmmdd_HHMMSS>.webm` in a single
//! flat directory. Two uploads within the same second share a name and the
//! later one replaces the earlier.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::debug;
use voxscreen_core::Result;

/// Extension of stored recordings
pub const RECORDING_EXTENSION: &str = "webm";

/// Flat directory of uploaded recordings
#[derive(Debug, Clone)]
pub struct RecordingStore {
    dir: PathBuf,
    public_base_url: String,
}

impl RecordingStore {
    /// Open the store, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            public_base_url: public_base_url.into(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for a recording received at `now`
    pub fn recording_name(now: DateTime<Local>) -> String {
        format!(
            "recording_{}.{RECORDING_EXTENSION}",
            now.format("%Y%m%d_%H%M%S")
        )
    }

    /// Write an upload and return its path
    pub fn save(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.dir.join(name);
        fs::write(&path, bytes)?;
        debug!(path = %path.display(), bytes = bytes.len(), "stored recording");
        Ok(path)
    }

    /// Names of stored recordings, newest name first
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.ends_with(&format!(".{RECORDING_EXTENSION}")) {
                names.push(name);
            }
        }
        names.sort_unstable_by(|a, b| b.cmp(a));
        Ok(names)
    }

    /// Public link of a stored recording
    pub fn url_for(&self, name: &str) -> String {
        format!("{}/uploads/{name}", self.public_base_url.trim_end_matches('/'))
    }

    /// Remove a recording; `Ok(false)` when it does not exist.
    pub fn delete(&self, name: &str) -> Result<bool> {
        let path = self.dir.join(name);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "deleted recording");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Whether `name` is a plain file name inside the store
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && !name.contains("..")
        && !name.contains(['/', '\\', '\0'])
}
