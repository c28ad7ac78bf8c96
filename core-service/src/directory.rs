//! Local directory photo source
//!
//! Serves the JPEG files already present in a directory, for offline runs
//! and for hosts that manage their own photo selection.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::photos::{PhotoCriteria, PhotoSource};
use bridge_traits::storage::FileSystemAccess;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, instrument};

const JPEG_EXTENSIONS: [&str; 2] = ["jpg", "jpeg"];

pub struct DirectorySource {
    file_system: Arc<dyn FileSystemAccess>,
    directory: PathBuf,
}

impl DirectorySource {
    pub fn new(file_system: Arc<dyn FileSystemAccess>, directory: impl Into<PathBuf>) -> Self {
        Self {
            file_system,
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| JPEG_EXTENSIONS.iter().any(|j| ext.eq_ignore_ascii_case(j)))
}

#[async_trait]
impl PhotoSource for DirectorySource {
    fn name(&self) -> &str {
        "directory"
    }

    /// The first `count` JPEG files by name. Tag selection is not available.
    #[instrument(skip(self, criteria), fields(dir = %self.directory.display()))]
    async fn resolve(&self, criteria: &PhotoCriteria) -> Result<Vec<PathBuf>> {
        let count = match criteria {
            PhotoCriteria::Recent { count } => *count,
            PhotoCriteria::Tagged { .. } => {
                return Err(BridgeError::NotAvailable(
                    "Directory photos cannot be selected by tag".to_string(),
                ));
            }
        };

        let mut photos = Vec::new();
        for entry in self.file_system.list_directory(&self.directory).await? {
            if is_jpeg(&entry) && self.file_system.is_file(&entry).await? {
                photos.push(entry);
            }
        }
        photos.sort();
        photos.truncate(count);

        debug!(selected = photos.len(), "Resolved directory photos");
        Ok(photos)
    }
}
