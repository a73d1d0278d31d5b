//! Delivery: the "save as" side effect at the end of an export

use crate::{Error, Result};
use log::info;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Receives a finished document under its derived file name.
///
/// Implementations must either deliver the whole payload or nothing.
pub trait Delivery {
    /// Hand over `bytes` as `file_name`; returns where it ended up
    fn deliver(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf>;
}

impl<T: Delivery + ?Sized> Delivery for Arc<T> {
    fn deliver(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        (**self).deliver(file_name, bytes)
    }
}

impl<T: Delivery + ?Sized> Delivery for Box<T> {
    fn deliver(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        (**self).deliver(file_name, bytes)
    }
}

/// Writes documents into a directory.
///
/// The payload is written to a temporary file in the target directory and
/// renamed into place once complete, so a failed write never leaves a
/// partial document behind. The temporary file is removed on every error
/// path when its handle drops.
#[derive(Debug, Clone)]
pub struct FileDelivery {
    dir: PathBuf,
}

impl FileDelivery {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Delivery for FileDelivery {
    fn deliver(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        if file_name.is_empty() || file_name.contains(['/', '\\']) {
            return Err(Error::DeliveryError(format!("invalid file name '{}'", file_name)));
        }
        std::fs::create_dir_all(&self.dir)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".quotepress-")
            .suffix(".part")
            .tempfile_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;

        let dest = self.dir.join(file_name);
        tmp.persist(&dest)
            .map_err(|e| Error::DeliveryError(format!("cannot move document to {}: {}", dest.display(), e.error)))?;
        info!("saved {} ({} bytes)", dest.display(), bytes.len());
        Ok(dest)
    }
}

/// Keeps delivered documents in memory (tests, embedding hosts)
#[derive(Debug, Default)]
pub struct MemoryDelivery {
    files: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemoryDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything delivered so far, in delivery order
    pub fn files(&self) -> Vec<(String, Vec<u8>)> {
        self.files.lock().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.files.lock().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Delivery for MemoryDelivery {
    fn deliver(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let mut files = self
            .files
            .lock()
            .map_err(|_| Error::DeliveryError("memory delivery lock poisoned".into()))?;
        files.push((file_name.to_string(), bytes.to_vec()));
        Ok(PathBuf::from(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_delivery_writes_complete_file() {
        let dir = tempfile::tempdir().unwrap();
        let delivery = FileDelivery::new(dir.path().join("out"));
        let path = delivery.deliver("Q-1_Acme.pdf", b"%PDF-1.5 test").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.5 test");

        // Only the final file remains
        let names: Vec<_> = std::fs::read_dir(delivery.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["Q-1_Acme.pdf".to_string()]);
    }

    #[test]
    fn file_delivery_rejects_paths() {
        let dir = tempfile::tempdir().unwrap();
        let delivery = FileDelivery::new(dir.path());
        assert!(matches!(delivery.deliver("../x.pdf", b"x"), Err(Error::DeliveryError(_))));
        assert!(matches!(delivery.deliver("", b"x"), Err(Error::DeliveryError(_))));
    }

    #[test]
    fn memory_delivery_records_in_order() {
        let d = MemoryDelivery::new();
        assert!(d.is_empty());
        d.deliver("a.pdf", b"1").unwrap();
        d.deliver("b.pdf", b"2").unwrap();
        let files = d.files();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].0, "a.pdf");
        assert_eq!(files[1].1, b"2".to_vec());
    }
}
