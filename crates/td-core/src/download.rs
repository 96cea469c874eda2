//! Where downloaded spreadsheets end up.

use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

/// File name used for task exports.
pub const EXPORT_FILE_NAME: &str = "tasks.xlsx";
/// File name used for the import template.
pub const TEMPLATE_FILE_NAME: &str = "task_template.xlsx";

/// Receives downloaded files under a suggested name.
pub trait DownloadSink: Send + Sync {
    /// Stores `bytes` and returns the location written to.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    fn save(&self, file_name: &str, bytes: &[u8]) -> io::Result<PathBuf>;
}

/// Writes downloads into a directory, replacing files of the same name.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectorySink {
    fn save(&self, file_name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);

        // Write to a sibling temp file first so a failed write never leaves a
        // truncated spreadsheet behind.
        let tmp = self.dir.join(format!(".{file_name}.part"));
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &path)?;

        info!(path = %path.display(), size = bytes.len(), "saved download");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_directory_sink_writes_and_replaces() {
        let dir = tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("downloads"));

        let first = sink.save(EXPORT_FILE_NAME, b"one").unwrap();
        let second = sink.save(EXPORT_FILE_NAME, b"two").unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read(&second).unwrap(), b"two");
        assert!(!dir.path().join("downloads").join(".tasks.xlsx.part").exists());
    }
}
