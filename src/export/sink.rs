//! Destinations for finished PDF artifacts.

use crate::error::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Receives a finished artifact.
///
/// A sink is only called once the whole PDF has been encoded, so it never
/// sees partial output.
pub trait FileSink: Send + Sync {
    /// Store `bytes` under `file_name` and return where it ended up.
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<String>;
}

/// Writes artifacts into a directory.
///
/// Data goes to a temporary file next to the target first and is renamed
/// into place, so a failed write leaves no file under the final name.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    overwrite: bool,
}

impl DirectorySink {
    /// Save into `dir`, replacing existing files.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            overwrite: true,
        }
    }

    /// Refuse to replace an existing file.
    pub fn no_overwrite(mut self) -> Self {
        self.overwrite = false;
        self
    }

    /// Target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FileSink for DirectorySink {
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<String> {
        let target = self.dir.join(file_name);
        if !self.overwrite && target.exists() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} already exists", target.display()),
            )));
        }
        fs::create_dir_all(&self.dir)?;

        let tmp = self.dir.join(format!(".{}.part", file_name));
        let written = fs::File::create(&tmp).and_then(|mut f| {
            f.write_all(bytes)?;
            f.sync_all()
        });
        if let Err(e) = written.and_then(|_| fs::rename(&tmp, &target)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        log::debug!("Wrote {} bytes to {}", bytes.len(), target.display());
        Ok(target.display().to_string())
    }
}

/// Keeps artifacts in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    files: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Saved files in order.
    pub fn files(&self) -> Vec<(String, Vec<u8>)> {
        self.files.lock().map(|f| f.clone()).unwrap_or_default()
    }

    /// Number of saved files.
    pub fn len(&self) -> usize {
        self.files.lock().map(|f| f.len()).unwrap_or(0)
    }

    /// Check if nothing was saved.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes of the most recently saved file.
    pub fn last(&self) -> Option<(String, Vec<u8>)> {
        self.files.lock().ok().and_then(|f| f.last().cloned())
    }
}

impl FileSink for MemorySink {
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<String> {
        let mut files = self
            .files
            .lock()
            .map_err(|_| Error::Unknown("memory sink lock poisoned".into()))?;
        files.push((file_name.to_string(), bytes.to_vec()));
        Ok(format!("memory:{}", file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_directory_sink_writes_file() {
        let dir = TempDir::new().unwrap();
        let sink = DirectorySink::new(dir.path());
        let location = sink.save("cv.pdf", b"%PDF-1.4").unwrap();
        assert!(location.ends_with("cv.pdf"));
        assert_eq!(fs::read(dir.path().join("cv.pdf")).unwrap(), b"%PDF-1.4");
        assert!(!dir.path().join(".cv.pdf.part").exists());
    }

    #[test]
    fn test_directory_sink_creates_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("out/pdf");
        DirectorySink::new(&nested).save("a.pdf", b"x").unwrap();
        assert!(nested.join("a.pdf").exists());
    }

    #[test]
    fn test_no_overwrite() {
        let dir = TempDir::new().unwrap();
        let sink = DirectorySink::new(dir.path()).no_overwrite();
        sink.save("a.pdf", b"1").unwrap();
        assert!(sink.save("a.pdf", b"2").is_err());
        assert_eq!(fs::read(dir.path().join("a.pdf")).unwrap(), b"1");
    }

    #[test]
    fn test_memory_sink() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());
        let shared = sink.clone();
        shared.save("a.pdf", b"abc").unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.last().unwrap(), ("a.pdf".to_string(), b"abc".to_vec()));
    }
}
