//! Core service façade.
//!
//! This crate wires a configured photo source into the device reconciler.
//! Hosts build a [`CoreConfig`](core_runtime::config::CoreConfig), hand it to
//! [`AirframeService`], and call [`AirframeService::run`] with the source of
//! their choice. Desktop hosts typically enable the `desktop-shims` feature so
//! the HTTP client and file system bridges are provided automatically.
//!
//! The `flickr` and `facebook` features add [`AirframeService::configured_source`]
//! support for the corresponding provider crates.

pub mod directory;
pub mod error;

pub use directory::DirectorySource;
pub use error::{CoreError, Result};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bridge_traits::{
    http::HttpClient,
    photos::{PhotoCriteria, PhotoSource},
    storage::FileSystemAccess,
    time::Clock,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, Receiver};
use core_runtime::PhotoCache;
use core_sync::{DesiredFile, DeviceClient, FlashAirClient, Reconciler, SyncReport};
use tracing::{debug, info, instrument};

/// Event buffer size for a service's bus
const EVENT_CAPACITY: usize = 256;

/// Aggregated handle to the bridge dependencies the core requires.
#[derive(Clone)]
pub struct CoreDependencies {
    pub http_client: Arc<dyn HttpClient>,
    pub file_system: Arc<dyn FileSystemAccess>,
    pub clock: Arc<dyn Clock>,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit bridge handles.
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        file_system: Arc<dyn FileSystemAccess>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            http_client,
            file_system,
            clock,
        }
    }

    /// The bridges carried by a validated configuration.
    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(
            Arc::clone(&config.http_client),
            Arc::clone(&config.file_system),
            Arc::clone(&config.clock),
        )
    }
}

/// Primary façade exposed to host applications.
pub struct AirframeService {
    config: CoreConfig,
    deps: CoreDependencies,
    event_bus: EventBus,
    reconciler: Reconciler,
    cache: PhotoCache,
}

impl AirframeService {
    /// Create a service talking to the card named in `config`.
    pub fn new(config: CoreConfig) -> Result<Self> {
        let device = FlashAirClient::new(Arc::clone(&config.http_client), &config.device);
        Self::with_device(config, Arc::new(device))
    }

    /// Create a service around an explicit device client.
    pub fn with_device(config: CoreConfig, device: Arc<dyn DeviceClient>) -> Result<Self> {
        config.validate()?;

        let deps = CoreDependencies::from_config(&config);
        let event_bus = EventBus::new(EVENT_CAPACITY);
        let reconciler = Reconciler::new(
            device,
            Arc::clone(&deps.file_system),
            Arc::clone(&deps.clock),
        )
        .with_event_bus(event_bus.clone());
        let cache = PhotoCache::new(
            "cache",
            Arc::clone(&deps.http_client),
            Arc::clone(&deps.file_system),
            config.download_dir.clone(),
        );

        Ok(Self {
            config,
            deps,
            event_bus,
            reconciler,
            cache,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Access the bridge dependencies being used by the service.
    pub fn dependencies(&self) -> &CoreDependencies {
        &self.deps
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Subscribe to source and device events.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.event_bus.subscribe()
    }

    /// Selection described by the configured count and tags.
    pub fn criteria(&self) -> PhotoCriteria {
        self.config.criteria()
    }

    /// Resolve `criteria` through `source`, then reconcile the card.
    ///
    /// With `prune_cache` set, downloads outside the new selection are removed
    /// from the download directory before the card is touched. Pruning is
    /// skipped when the selection does not come from the download directory,
    /// such as a `DirectorySource` pointed elsewhere.
    #[instrument(skip(self, source, criteria), fields(source = source.name(), criteria = %criteria))]
    pub async fn run(
        &self,
        source: &dyn PhotoSource,
        criteria: &PhotoCriteria,
    ) -> Result<SyncReport> {
        let paths = source
            .resolve(criteria)
            .await
            .map_err(|error| CoreError::Source {
                provider: source.name().to_string(),
                error,
            })?;
        info!("Resolved {} photos", paths.len());

        if self.config.prune_cache {
            if selects_from(&self.config.download_dir, &paths) {
                self.cache.prune(&paths).await?;
            } else {
                debug!("Selection is outside the download directory, not pruning");
            }
        }

        let desired: Vec<DesiredFile> = paths.into_iter().map(DesiredFile::from).collect();
        let report = self
            .reconciler
            .sync(&desired, self.config.force_upload)
            .await?;
        Ok(report)
    }

    /// Run with the configured source and criteria.
    pub async fn run_configured(&self) -> Result<SyncReport> {
        let source = self.configured_source()?;
        self.run(source.as_ref(), &self.criteria()).await
    }

    /// Build the photo source named by the configuration.
    ///
    /// Flickr wins when both services are configured.
    pub fn configured_source(&self) -> Result<Box<dyn PhotoSource>> {
        #[cfg(feature = "flickr")]
        if let Some(flickr) = &self.config.flickr {
            let connector = provider_flickr::FlickrConnector::new(
                Arc::clone(&self.deps.http_client),
                Arc::clone(&self.deps.file_system),
                flickr.clone(),
                self.config.download_dir.clone(),
            )
            .with_event_bus(self.event_bus.clone());
            return Ok(Box::new(connector));
        }

        #[cfg(feature = "facebook")]
        if let Some(facebook) = &self.config.facebook {
            let connector = provider_facebook::FacebookConnector::new(
                Arc::clone(&self.deps.http_client),
                Arc::clone(&self.deps.file_system),
                facebook.clone(),
                self.config.download_dir.clone(),
            )
            .with_event_bus(self.event_bus.clone());
            return Ok(Box::new(connector));
        }

        Err(CoreError::CapabilityMissing {
            capability: "PhotoSource".to_string(),
            message: "No photo service is configured. Set Flickr or Facebook credentials \
                      (with the matching feature enabled) or pass a source to run()."
                .to_string(),
        })
    }
}

/// True when every path was served from `download_dir`.
///
/// An empty selection proves nothing about its origin, so it never prunes.
fn selects_from(download_dir: &Path, paths: &[PathBuf]) -> bool {
    !paths.is_empty() && paths.iter().all(|path| path.parent() == Some(download_dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selects_from_download_dir() {
        let dir = Path::new("/cache");
        assert!(selects_from(
            dir,
            &[PathBuf::from("/cache/1.jpg"), PathBuf::from("/cache/2.jpg")]
        ));
        assert!(!selects_from(dir, &[PathBuf::from("/frame/1.jpg")]));
        assert!(!selects_from(
            dir,
            &[PathBuf::from("/cache/1.jpg"), PathBuf::from("/frame/2.jpg")]
        ));
        assert!(!selects_from(dir, &[PathBuf::from("/cache/sub/1.jpg")]));
        assert!(!selects_from(dir, &[]));
    }
}
