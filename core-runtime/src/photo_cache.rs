//! Download cache for remote photos
//!
//! Remote sources download the selected photos into a local directory keyed by
//! the service's photo id (`{dir}/{id}.jpg`). A photo already present in the
//! cache is not downloaded again, so repeated runs only fetch new selections.

use crate::error::{Error, Result};
use crate::events::{CoreEvent, EventBus, SourceEvent};
use crate::logging::strip_path;
use bridge_traits::{FileSystemAccess, HttpClient, HttpRequest, RetryPolicy, SourcePhoto};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct PhotoCache {
    source_name: String,
    http_client: Arc<dyn HttpClient>,
    file_system: Arc<dyn FileSystemAccess>,
    directory: PathBuf,
    event_bus: Option<EventBus>,
}

impl PhotoCache {
    pub fn new(
        source_name: impl Into<String>,
        http_client: Arc<dyn HttpClient>,
        file_system: Arc<dyn FileSystemAccess>,
        directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            http_client,
            file_system,
            directory: directory.into(),
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Cache location for a photo id.
    ///
    /// Ids are used as file names, so anything that could escape the cache
    /// directory is rejected.
    pub fn path_for(&self, photo_id: &str) -> Result<PathBuf> {
        let invalid = photo_id.is_empty()
            || photo_id == "."
            || photo_id == ".."
            || photo_id.contains(['/', '\\', '\0']);
        if invalid {
            return Err(Error::InvalidPhotoId(photo_id.to_string()));
        }
        Ok(self.directory.join(format!("{}.jpg", photo_id)))
    }

    /// Ensure every photo is cached, downloading the missing ones.
    ///
    /// Returns the local paths in the order of `photos`. The first failed
    /// download aborts the whole fetch.
    #[instrument(skip(self, photos), fields(source = %self.source_name, total = photos.len()))]
    pub async fn fetch_all(&self, photos: &[SourcePhoto]) -> Result<Vec<PathBuf>> {
        self.file_system.create_dir_all(&self.directory).await?;

        let total = photos.len();
        let mut paths = Vec::with_capacity(total);

        for (position, photo) in photos.iter().enumerate() {
            let index = position + 1;
            let path = self.path_for(&photo.id)?;

            let cached = self.file_system.is_file(&path).await?;
            if cached {
                debug!("[{}/{}] {} already cached", index, total, photo.id);
            } else {
                info!("[{}/{}] Downloading {}", index, total, photo.id);
                self.download(photo, &path).await?;
            }

            self.emit(SourceEvent::Downloaded {
                source: self.source_name.clone(),
                photo_id: photo.id.clone(),
                index,
                total,
                cached,
            });
            paths.push(path);
        }

        Ok(paths)
    }

    async fn download(&self, photo: &SourcePhoto, path: &Path) -> Result<()> {
        let response = self
            .http_client
            .execute_with_retry(HttpRequest::get(&photo.url), RetryPolicy::default())
            .await?;

        if !response.is_success() {
            warn!(photo_id = %photo.id, status = response.status, "Photo download failed");
            return Err(Error::Download {
                photo_id: photo.id.clone(),
                status: response.status,
            });
        }

        self.file_system.write_file(path, response.body).await?;
        Ok(())
    }

    /// Delete cached JPEGs that are not in `keep`.
    ///
    /// Returns the number of files removed. A missing cache directory is
    /// treated as empty.
    #[instrument(skip(self, keep), fields(source = %self.source_name))]
    pub async fn prune(&self, keep: &[PathBuf]) -> Result<usize> {
        if !self.file_system.exists(&self.directory).await? {
            return Ok(0);
        }

        let keep: HashSet<&Path> = keep.iter().map(PathBuf::as_path).collect();
        let mut removed = 0;

        for entry in self.file_system.list_directory(&self.directory).await? {
            let is_jpeg = entry
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg"));
            if !is_jpeg || keep.contains(entry.as_path()) {
                continue;
            }
            if !self.file_system.is_file(&entry).await? {
                continue;
            }

            self.file_system.delete_file(&entry).await?;
            debug!(file = %strip_path(&entry.to_string_lossy()), "Pruned cached photo");
            removed += 1;
        }

        if removed > 0 {
            info!(removed, "Pruned photo cache");
        }
        Ok(removed)
    }

    fn emit(&self, event: SourceEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Source(event)).ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::testing::MemoryFileSystem;
    use bridge_traits::HttpResponse;
    use bytes::Bytes;
    use mockall::mock;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn cache(http: MockHttpClient, fs: Arc<MemoryFileSystem>) -> PhotoCache {
        PhotoCache::new("flickr", Arc::new(http), fs, "/cache")
    }

    #[test]
    fn test_path_for_rejects_path_like_ids() {
        let fs = Arc::new(MemoryFileSystem::new("/cache"));
        let cache = cache(MockHttpClient::new(), fs);

        assert_eq!(
            cache.path_for("5302").unwrap(),
            PathBuf::from("/cache/5302.jpg")
        );
        for bad in ["", ".", "..", "../etc", "a/b", "a\\b"] {
            assert!(matches!(cache.path_for(bad), Err(Error::InvalidPhotoId(_))));
        }
    }

    #[tokio::test]
    async fn test_fetch_all_downloads_only_missing_photos() {
        let fs = Arc::new(MemoryFileSystem::new("/cache"));
        fs.insert("/cache/1.jpg", "cached");

        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .returning(|request| {
                assert_eq!(request.url, "https://img.example/2.jpg");
                Ok(HttpResponse::new(200, Bytes::from_static(b"fresh")))
            });

        let bus = EventBus::new(10);
        let mut events = bus.subscribe();
        let cache = cache(http, fs.clone()).with_event_bus(bus);

        let photos = vec![
            SourcePhoto::new("1", "https://img.example/1.jpg"),
            SourcePhoto::new("2", "https://img.example/2.jpg"),
        ];
        let paths = cache.fetch_all(&photos).await.unwrap();

        assert_eq!(
            paths,
            vec![PathBuf::from("/cache/1.jpg"), PathBuf::from("/cache/2.jpg")]
        );
        assert_eq!(
            fs.contents(Path::new("/cache/1.jpg")),
            Some(Bytes::from_static(b"cached"))
        );
        assert_eq!(
            fs.contents(Path::new("/cache/2.jpg")),
            Some(Bytes::from_static(b"fresh"))
        );

        match events.recv().await.unwrap() {
            CoreEvent::Source(SourceEvent::Downloaded { index, cached, .. }) => {
                assert_eq!(index, 1);
                assert!(cached);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_all_fails_on_http_error() {
        let fs = Arc::new(MemoryFileSystem::new("/cache"));
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .returning(|_| Ok(HttpResponse::new(404, Bytes::new())));

        let cache = cache(http, fs.clone());
        let result = cache
            .fetch_all(&[SourcePhoto::new("9", "https://img.example/9.jpg")])
            .await;

        assert!(matches!(
            result,
            Err(Error::Download { ref photo_id, status: 404 }) if photo_id == "9"
        ));
        assert!(fs.file_paths().is_empty());
    }

    #[tokio::test]
    async fn test_prune_removes_unselected_jpegs_only() {
        let fs = Arc::new(MemoryFileSystem::new("/cache"));
        fs.insert("/cache/1.jpg", "keep");
        fs.insert("/cache/2.jpg", "drop");
        fs.insert("/cache/notes.txt", "not a photo");

        let cache = cache(MockHttpClient::new(), fs.clone());
        let removed = cache.prune(&[PathBuf::from("/cache/1.jpg")]).await.unwrap();

        assert_eq!(removed, 1);
        assert_eq!(
            fs.file_paths(),
            vec![
                PathBuf::from("/cache/1.jpg"),
                PathBuf::from("/cache/notes.txt")
            ]
        );
    }

    #[tokio::test]
    async fn test_prune_missing_directory_is_noop() {
        let fs = Arc::new(MemoryFileSystem::new("/elsewhere"));
        let cache = cache(MockHttpClient::new(), fs);
        assert_eq!(cache.prune(&[]).await.unwrap(), 0);
    }
}
