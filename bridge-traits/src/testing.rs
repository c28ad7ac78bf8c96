//! In-memory bridge implementations for tests
//!
//! Enabled with the `test-utils` feature. Downstream crates pull this in as a
//! dev-dependency so their tests can run without touching the disk or the
//! system clock.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{BridgeError, Result};
use crate::storage::{FileMetadata, FileSystemAccess};
use crate::time::Clock;

fn not_found(path: &Path) -> BridgeError {
    BridgeError::Io(io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} not found", path.display()),
    ))
}

/// File system held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: Mutex<BTreeMap<PathBuf, Bytes>>,
    dirs: Mutex<BTreeSet<PathBuf>>,
}

impl MemoryFileSystem {
    /// Empty file system in which `root` (and its parents) already exist
    pub fn new(root: impl AsRef<Path>) -> Self {
        let fs = Self::default();
        fs.add_parents(&root.as_ref().join("_"));
        fs
    }

    /// Seed a file, creating its parent directories
    pub fn insert(&self, path: impl Into<PathBuf>, data: impl Into<Bytes>) {
        let path = path.into();
        self.add_parents(&path);
        self.files
            .lock()
            .expect("memory fs poisoned")
            .insert(path, data.into());
    }

    /// Contents of a file, if present
    pub fn contents(&self, path: &Path) -> Option<Bytes> {
        self.files
            .lock()
            .expect("memory fs poisoned")
            .get(path)
            .cloned()
    }

    /// All file paths, sorted
    pub fn file_paths(&self) -> Vec<PathBuf> {
        self.files
            .lock()
            .expect("memory fs poisoned")
            .keys()
            .cloned()
            .collect()
    }

    fn add_parents(&self, path: &Path) {
        let mut dirs = self.dirs.lock().expect("memory fs poisoned");
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() {
                break;
            }
            dirs.insert(dir.to_path_buf());
            current = dir.parent();
        }
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.lock().expect("memory fs poisoned").contains(path)
    }
}

#[async_trait]
impl FileSystemAccess for MemoryFileSystem {
    async fn exists(&self, path: &Path) -> Result<bool> {
        Ok(self.contents(path).is_some() || self.is_dir(path))
    }

    async fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        if let Some(data) = self.contents(path) {
            return Ok(FileMetadata {
                size: data.len() as u64,
                is_directory: false,
            });
        }
        if self.is_dir(path) {
            return Ok(FileMetadata {
                size: 0,
                is_directory: true,
            });
        }
        Err(not_found(path))
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.add_parents(&path.join("_"));
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes> {
        self.contents(path).ok_or_else(|| not_found(path))
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()> {
        self.insert(path.to_path_buf(), data);
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> Result<()> {
        self.files
            .lock()
            .expect("memory fs poisoned")
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }

    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>> {
        if !self.is_dir(path) {
            return Err(not_found(path));
        }

        let files = self.files.lock().expect("memory fs poisoned");
        let dirs = self.dirs.lock().expect("memory fs poisoned");
        let mut entries: Vec<PathBuf> = files
            .keys()
            .chain(dirs.iter())
            .filter(|entry| entry.parent() == Some(path))
            .cloned()
            .collect();
        entries.sort();
        Ok(entries)
    }
}

/// Clock frozen at a fixed local wall-clock time
#[derive(Debug, Clone)]
pub struct FixedClock {
    local: NaiveDateTime,
}

impl FixedClock {
    pub fn new(local: NaiveDateTime) -> Self {
        Self { local }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.local.and_utc()
    }

    fn local_now(&self) -> NaiveDateTime {
        self.local
    }
}
