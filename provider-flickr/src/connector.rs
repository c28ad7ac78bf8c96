//! Flickr API connector implementation
//!
//! Implements the `PhotoSource` trait for the Flickr REST API.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpRequest, RetryPolicy};
use bridge_traits::photos::{PhotoCriteria, PhotoSource, SourcePhoto};
use bridge_traits::storage::FileSystemAccess;
use core_runtime::config::FlickrApiConfig;
use core_runtime::events::{CoreEvent, EventBus, SourceEvent};
use core_runtime::PhotoCache;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{FlickrError, Result};
use crate::types::{FlickrPhoto, PhotosResponse};

/// Flickr REST endpoint
const FLICKR_REST_ENDPOINT: &str = "https://api.flickr.com/services/rest/";

/// Static image host
const FLICKR_IMAGE_BASE: &str = "https://live.staticflickr.com";

/// Method listing a user's photos, newest first
const METHOD_PUBLIC_PHOTOS: &str = "flickr.people.getPublicPhotos";

/// Method searching a user's photos by tag
const METHOD_SEARCH: &str = "flickr.photos.search";

const SOURCE_NAME: &str = "flickr";

/// Flickr API connector
///
/// Implements `PhotoSource` using the public photo listing methods. Only the
/// API key is sent; no user authorization is performed, so only public
/// photos are visible.
///
/// # Example
///
/// ```ignore
/// use provider_flickr::FlickrConnector;
/// use bridge_traits::photos::{PhotoCriteria, PhotoSource};
///
/// let connector = FlickrConnector::new(http_client, file_system, config, ".airframe");
/// let paths = connector.resolve(&PhotoCriteria::Recent { count: 20 }).await?;
/// ```
pub struct FlickrConnector {
    /// HTTP client for API requests
    http_client: Arc<dyn HttpClient>,

    /// API key, account and size settings
    config: FlickrApiConfig,

    /// Download cache for the selected photos
    cache: PhotoCache,

    event_bus: Option<EventBus>,
}

impl FlickrConnector {
    /// Create a new Flickr connector
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation
    /// * `file_system` - File system used by the download cache
    /// * `config` - API key and account to list
    /// * `download_dir` - Directory holding cached photos
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        file_system: Arc<dyn FileSystemAccess>,
        config: FlickrApiConfig,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        let cache = PhotoCache::new(
            SOURCE_NAME,
            Arc::clone(&http_client),
            file_system,
            download_dir,
        );
        Self {
            http_client,
            config,
            cache,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.cache = self.cache.with_event_bus(event_bus.clone());
        self.event_bus = Some(event_bus);
        self
    }

    /// Image URL for a photo at the configured size
    pub fn photo_url(&self, photo: &FlickrPhoto) -> String {
        format!(
            "{}/{}/{}_{}_{}.jpg",
            FLICKR_IMAGE_BASE, photo.server, photo.id, photo.secret, self.config.size_suffix
        )
    }

    fn base_request(&self, method: &str, per_page: usize, page: u32) -> HttpRequest {
        HttpRequest::get(FLICKR_REST_ENDPOINT)
            .query_param("method", method)
            .query_param("api_key", self.config.api_key.as_str())
            .query_param("user_id", self.config.user_id.as_str())
            .query_param("per_page", per_page.to_string())
            .query_param("page", page.to_string())
            .query_param("format", "json")
            .query_param("nojsoncallback", "1")
            .header("Accept", "application/json")
    }

    fn page_request(&self, criteria: &PhotoCriteria, per_page: usize, page: u32) -> HttpRequest {
        match criteria {
            PhotoCriteria::Recent { .. } => self.base_request(METHOD_PUBLIC_PHOTOS, per_page, page),
            PhotoCriteria::Tagged { tags, .. } => self
                .base_request(METHOD_SEARCH, per_page, page)
                .query_param("tags", tags.join(",")),
        }
    }

    /// Fetch one page of the listing
    async fn fetch_page(
        &self,
        criteria: &PhotoCriteria,
        per_page: usize,
        page: u32,
    ) -> Result<(Vec<FlickrPhoto>, u32)> {
        let request = self.page_request(criteria, per_page, page);
        let response = self
            .http_client
            .execute_with_retry(request, RetryPolicy::default())
            .await?;

        if !response.is_success() {
            warn!("API request failed: status={}", response.status);
            return Err(FlickrError::ApiError {
                status_code: response.status,
                message: String::from_utf8_lossy(&response.body).to_string(),
            });
        }

        let parsed: PhotosResponse = serde_json::from_slice(&response.body).map_err(|e| {
            FlickrError::ParseError(format!("Failed to parse photo list response: {}", e))
        })?;

        if !parsed.is_ok() {
            return Err(FlickrError::Api {
                code: parsed.code.unwrap_or_default(),
                message: parsed
                    .message
                    .unwrap_or_else(|| format!("stat={}", parsed.stat)),
            });
        }

        let page = parsed
            .photos
            .ok_or_else(|| FlickrError::ParseError("Response has no photos element".to_string()))?;
        debug!(
            page = page.page,
            pages = page.pages,
            returned = page.photo.len(),
            "Fetched photo page"
        );
        Ok((page.photo, page.pages))
    }

    /// List up to `criteria.count()` photos, following pagination.
    ///
    /// A failed page fails the whole listing.
    #[instrument(skip(self, criteria), fields(criteria = %criteria))]
    pub async fn list_photos(&self, criteria: &PhotoCriteria) -> Result<Vec<SourcePhoto>> {
        let count = criteria.count();
        if count == 0 {
            return Ok(Vec::new());
        }

        let per_page = count.min(self.config.max_per_page).max(1);
        let mut photos = Vec::with_capacity(count);
        let mut page = 1;

        loop {
            let (batch, pages) = self.fetch_page(criteria, per_page, page).await?;
            let exhausted = batch.is_empty() || page >= pages;

            for photo in batch.into_iter().take(count - photos.len()) {
                photos.push(SourcePhoto::new(photo.id.clone(), self.photo_url(&photo)));
            }

            if photos.len() >= count || exhausted {
                break;
            }
            page += 1;
        }

        info!("Listed {} photos from Flickr", photos.len());
        Ok(photos)
    }

    fn emit(&self, event: SourceEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Source(event)).ok();
        }
    }
}

#[async_trait]
impl PhotoSource for FlickrConnector {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    #[instrument(skip(self, criteria), fields(criteria = %criteria))]
    async fn resolve(&self, criteria: &PhotoCriteria) -> BridgeResult<Vec<PathBuf>> {
        info!("Connecting to Flickr, fetching {}", criteria);
        self.emit(SourceEvent::Fetching {
            source: SOURCE_NAME.to_string(),
            criteria: criteria.to_string(),
        });

        let photos = self.list_photos(criteria).await?;
        let paths = self
            .cache
            .fetch_all(&photos)
            .await
            .map_err(FlickrError::from)?;

        info!("Found {} photos", paths.len());
        self.emit(SourceEvent::Resolved {
            source: SOURCE_NAME.to_string(),
            count: paths.len(),
        });
        Ok(paths)
    }
}
