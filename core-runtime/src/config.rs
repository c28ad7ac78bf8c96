//! # Core Configuration Module
//!
//! Configuration for a photo-frame sync run.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! holding the device address, the photo selection, optional photo-service
//! credentials and the host bridges. Validation is fail-fast: `build()`
//! rejects malformed values before any network traffic happens.
//!
//! ## Bridges
//!
//! - `HttpClient` - HTTP operations (desktop default: reqwest)
//! - `FileSystemAccess` - File I/O (desktop default: tokio fs)
//! - `Clock` - Wall clock used for upload timestamps (default: system clock)
//!
//! When the `desktop-shims` feature is enabled, desktop-ready defaults for
//! `HttpClient` and `FileSystemAccess` are injected if not provided;
//! otherwise their absence is a [`Error::CapabilityMissing`].
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, FlickrApiConfig};
//!
//! let config = CoreConfig::builder()
//!     .device_host("192.168.0.20")
//!     .photo_count(50)
//!     .photo_tags(vec!["frame".to_string()])
//!     .flickr(FlickrApiConfig::new("api-key", "12345678@N00"))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{Clock, FileSystemAccess, HttpClient, PhotoCriteria, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Directory on the card that the frame displays
pub const DEFAULT_CARD_PATH: &str = "/DCIM/100__TSB";

/// Local directory for downloaded photos
pub const DEFAULT_DOWNLOAD_DIR: &str = ".airframe";

/// Number of photos selected when no count is given
pub const DEFAULT_PHOTO_COUNT: usize = 100;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Address and timeouts for the Wi-Fi SD card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Hostname or IP address, without scheme or path
    pub host: String,

    /// Absolute directory on the card; no trailing slash
    pub card_path: String,

    /// Timeout for listing, delete and control requests
    pub request_timeout: Duration,

    /// Timeout for a single file upload
    pub upload_timeout: Duration,
}

impl DeviceConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            card_path: DEFAULT_CARD_PATH.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
        }
    }

    pub fn with_card_path(mut self, card_path: impl Into<String>) -> Self {
        self.card_path = card_path.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    /// Base URL of the card's HTTP interface
    pub fn base_url(&self) -> String {
        format!("http://{}", self.host)
    }

    pub fn validate(&self) -> Result<()> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(Error::Config("Device host cannot be empty".to_string()));
        }
        if host.contains("://") || host.contains('/') {
            return Err(Error::Config(format!(
                "Device host '{}' must be a bare hostname or IP address, without scheme or path",
                self.host
            )));
        }

        if !self.card_path.starts_with('/') {
            return Err(Error::Config(format!(
                "Card path '{}' must be absolute (start with '/')",
                self.card_path
            )));
        }
        if self.card_path.ends_with('/') {
            return Err(Error::Config(format!(
                "Card path '{}' must not end with '/'",
                self.card_path
            )));
        }

        if self.request_timeout.is_zero() || self.upload_timeout.is_zero() {
            return Err(Error::Config(
                "Device timeouts must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Credentials and paging for the Flickr REST API.
///
/// API keys should never be hardcoded; load them from the environment or a
/// host-provided configuration file.
#[derive(Clone, PartialEq, Eq)]
pub struct FlickrApiConfig {
    pub api_key: String,

    /// NSID of the account whose photos are selected (e.g. "12345678@N00")
    pub user_id: String,

    /// Size suffix of the downloaded rendition ("b" is 1024px on the long side)
    pub size_suffix: String,

    /// Page size for listing calls, at most 500
    pub max_per_page: usize,
}

impl FlickrApiConfig {
    pub fn new(api_key: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            user_id: user_id.into(),
            size_suffix: "b".to_string(),
            max_per_page: 500,
        }
    }

    pub fn with_size_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.size_suffix = suffix.into();
        self
    }

    pub fn with_max_per_page(mut self, max_per_page: usize) -> Self {
        self.max_per_page = max_per_page;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::Config("Flickr API key cannot be empty".to_string()));
        }
        if self.user_id.trim().is_empty() {
            return Err(Error::Config("Flickr user id cannot be empty".to_string()));
        }
        if self.size_suffix.is_empty() || !self.size_suffix.chars().all(|c| c.is_ascii_lowercase())
        {
            return Err(Error::Config(format!(
                "Flickr size suffix '{}' must be a lowercase letter code",
                self.size_suffix
            )));
        }
        if self.max_per_page == 0 || self.max_per_page > 500 {
            return Err(Error::Config(
                "Flickr page size must be between 1 and 500".to_string(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for FlickrApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlickrApiConfig")
            .field("api_key", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .field("size_suffix", &self.size_suffix)
            .field("max_per_page", &self.max_per_page)
            .finish()
    }
}

/// Credentials and paging for the Facebook Graph API.
#[derive(Clone, PartialEq, Eq)]
pub struct FacebookApiConfig {
    /// User access token with the `user_photos` permission
    pub access_token: String,

    pub graph_api_base: String,

    /// Upper bound on `paging.next` links followed per run
    pub max_pages: usize,
}

impl FacebookApiConfig {
    pub const DEFAULT_GRAPH_API_BASE: &'static str = "https://graph.facebook.com/v19.0";

    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            graph_api_base: Self::DEFAULT_GRAPH_API_BASE.to_string(),
            max_pages: 10,
        }
    }

    pub fn with_graph_api_base(mut self, base: impl Into<String>) -> Self {
        self.graph_api_base = base.into();
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.access_token.trim().is_empty() {
            return Err(Error::Config(
                "Facebook access token cannot be empty".to_string(),
            ));
        }
        if !self.graph_api_base.starts_with("http://") && !self.graph_api_base.starts_with("https://")
        {
            return Err(Error::Config(format!(
                "Graph API base '{}' must be an http(s) URL",
                self.graph_api_base
            )));
        }
        if self.max_pages == 0 {
            return Err(Error::Config(
                "Facebook page limit must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for FacebookApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacebookApiConfig")
            .field("access_token", &"[REDACTED]")
            .field("graph_api_base", &self.graph_api_base)
            .field("max_pages", &self.max_pages)
            .finish()
    }
}

/// Core configuration for a sync run.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Wi-Fi SD card address and timeouts
    pub device: DeviceConfig,

    /// Directory downloaded photos are cached in
    pub download_dir: PathBuf,

    /// Number of photos to select
    pub photo_count: usize,

    /// Tags to select by; empty selects the most recent photos
    pub photo_tags: Vec<String>,

    /// Re-upload every desired file even if already on the card
    pub force_upload: bool,

    /// Delete cached downloads that are no longer selected
    pub prune_cache: bool,

    pub flickr: Option<FlickrApiConfig>,

    pub facebook: Option<FacebookApiConfig>,

    pub http_client: Arc<dyn HttpClient>,

    pub file_system: Arc<dyn FileSystemAccess>,

    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("device", &self.device)
            .field("download_dir", &self.download_dir)
            .field("photo_count", &self.photo_count)
            .field("photo_tags", &self.photo_tags)
            .field("force_upload", &self.force_upload)
            .field("prune_cache", &self.prune_cache)
            .field("flickr", &self.flickr)
            .field("facebook", &self.facebook)
            .field("http_client", &"HttpClient { ... }")
            .field("file_system", &"FileSystemAccess { ... }")
            .field("clock", &"Clock { ... }")
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Photo selection derived from `photo_tags` and `photo_count`
    pub fn criteria(&self) -> PhotoCriteria {
        PhotoCriteria::from_tags(self.photo_tags.clone(), self.photo_count)
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        self.device.validate()?;

        if self.download_dir.as_os_str().is_empty() {
            return Err(Error::Config(
                "Download directory cannot be empty".to_string(),
            ));
        }

        if self.photo_count == 0 {
            return Err(Error::Config(
                "Photo count must be greater than 0".to_string(),
            ));
        }

        if let Some(flickr) = &self.flickr {
            flickr.validate()?;
        }

        if let Some(facebook) = &self.facebook {
            facebook.validate()?;
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required to reach the card and photo services. \
                 Desktop: enable the 'desktop-shims' feature to use the default ReqwestHttpClient. \
                 Otherwise inject an implementation with .http_client()."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn file_system_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "FileSystemAccess".to_string(),
        message: "FileSystemAccess implementation is required to read photos and cache downloads. \
                 Desktop: enable the 'desktop-shims' feature to use the default TokioFileSystem. \
                 Otherwise inject an implementation with .file_system()."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(device: &DeviceConfig) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    // Per-request timeouts narrow this; it only needs to cover the longest one.
    let timeout = device.upload_timeout.max(device.request_timeout);
    let client = ReqwestHttpClient::with_timeout(timeout)
        .map_err(|e| Error::Internal(format!("Failed to create default HttpClient: {}", e)))?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_device: &DeviceConfig) -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Ok(Arc::new(bridge_desktop::TokioFileSystem::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Err(file_system_missing_error())
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    device: Option<DeviceConfig>,
    download_dir: Option<PathBuf>,
    photo_count: Option<usize>,
    photo_tags: Vec<String>,
    force_upload: bool,
    prune_cache: bool,
    flickr: Option<FlickrApiConfig>,
    facebook: Option<FacebookApiConfig>,
    http_client: Option<Arc<dyn HttpClient>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    clock: Option<Arc<dyn Clock>>,
}

impl CoreConfigBuilder {
    /// Sets the full device configuration.
    pub fn device(mut self, device: DeviceConfig) -> Self {
        self.device = Some(device);
        self
    }

    /// Sets the device host, keeping default card path and timeouts.
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder().device_host("flashair");
    /// ```
    pub fn device_host(mut self, host: impl Into<String>) -> Self {
        let host = host.into();
        self.device = Some(match self.device.take() {
            Some(mut device) => {
                device.host = host;
                device
            }
            None => DeviceConfig::new(host),
        });
        self
    }

    /// Sets the directory downloaded photos are cached in.
    ///
    /// Default: `.airframe`
    pub fn download_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.download_dir = Some(path.into());
        self
    }

    /// Default: 100
    pub fn photo_count(mut self, count: usize) -> Self {
        self.photo_count = Some(count);
        self
    }

    pub fn photo_tags(mut self, tags: Vec<String>) -> Self {
        self.photo_tags = tags;
        self
    }

    pub fn force_upload(mut self, force: bool) -> Self {
        self.force_upload = force;
        self
    }

    pub fn prune_cache(mut self, prune: bool) -> Self {
        self.prune_cache = prune;
        self
    }

    pub fn flickr(mut self, config: FlickrApiConfig) -> Self {
        self.flickr = Some(config);
        self
    }

    pub fn facebook(mut self, config: FacebookApiConfig) -> Self {
        self.facebook = Some(config);
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) is used when the
    /// `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the file system access implementation.
    ///
    /// If not provided, the desktop default (tokio fs-based) is used when the
    /// `desktop-shims` feature is enabled.
    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    /// Sets the clock. Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// Fails if the device host is missing, a required bridge cannot be
    /// provided, or any value is invalid.
    pub fn build(self) -> Result<CoreConfig> {
        let device = self.device.ok_or_else(|| {
            Error::Config("Device host is required. Use .device_host() to set it.".to_string())
        })?;
        device.validate()?;

        let download_dir = self
            .download_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_DIR));

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(&device)?,
        };

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system()?,
        };

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);

        let config = CoreConfig {
            device,
            download_dir,
            photo_count: self.photo_count.unwrap_or(DEFAULT_PHOTO_COUNT),
            photo_tags: self.photo_tags,
            force_upload: self.force_upload,
            prune_cache: self.prune_cache,
            flickr: self.flickr,
            facebook: self.facebook,
            http_client,
            file_system,
            clock,
        };

        config.validate()?;

        Ok(config)
    }
}
