//! # Event Bus System
//!
//! Broadcasts progress of photo resolution and device synchronization using
//! `tokio::sync::broadcast`, so hosts can render progress without parsing logs.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: [`CoreEvent`] wrapping [`SourceEvent`] and [`DeviceEvent`]
//! - **EventBus**: Central broadcast channel for publishing events
//!
//! ```text
//! ┌──────────────┐     emit      ┌───────────┐
//! │ Photo source ├──────────────>│           │     subscribe    ┌────────────┐
//! └──────────────┘               │ EventBus  ├─────────────────>│ Subscriber │
//! ┌──────────────┐     emit      │           │                  └────────────┘
//! │ Reconciler   ├──────────────>│           │
//! └──────────────┘               └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, DeviceEvent, EventBus};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Device(DeviceEvent::WriteProtectUnconfirmed {
//!         host: "flashair".to_string(),
//!     }))
//!     .ok();
//!
//! let event = subscriber.recv().await.unwrap();
//! assert_eq!(event.description(), "Write protection not confirmed");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   Non-fatal; the subscriber keeps receiving new events.
//! - **`RecvError::Closed`**: All senders have been dropped.
//!
//! Emitting with no subscribers returns an error; publishers ignore it.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Photo source events (fetch, download, resolve)
    Source(SourceEvent),
    /// Device synchronization events
    Device(DeviceEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Source(e) => e.description(),
            CoreEvent::Device(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Device(DeviceEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Device(DeviceEvent::WriteProtectUnconfirmed { .. }) => {
                EventSeverity::Warning
            }
            CoreEvent::Device(DeviceEvent::Completed { .. })
            | CoreEvent::Device(DeviceEvent::Started { .. })
            | CoreEvent::Source(SourceEvent::Resolved { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Source Events
// ============================================================================

/// Events emitted while a photo source resolves its selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SourceEvent {
    /// Listing photos from the remote service.
    Fetching {
        /// Source name (e.g. "flickr").
        source: String,
        /// Human-readable selection criteria.
        criteria: String,
    },
    /// One photo is available in the local cache.
    Downloaded {
        source: String,
        photo_id: String,
        /// 1-based position in the selection.
        index: usize,
        total: usize,
        /// True when the file was already cached and no download happened.
        cached: bool,
    },
    /// The selection has been resolved into local files.
    Resolved {
        source: String,
        /// Number of local files produced.
        count: usize,
    },
}

impl SourceEvent {
    fn description(&self) -> &str {
        match self {
            SourceEvent::Fetching { .. } => "Fetching photo list",
            SourceEvent::Downloaded { .. } => "Photo downloaded",
            SourceEvent::Resolved { .. } => "Photo selection resolved",
        }
    }
}

// ============================================================================
// Device Events
// ============================================================================

/// Events emitted by a device synchronization run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum DeviceEvent {
    /// A sync run started.
    Started {
        /// Unique identifier for this run.
        run_id: String,
        host: String,
        /// Whether every desired file is re-uploaded.
        force: bool,
    },
    /// The card did not acknowledge the write-protect request.
    WriteProtectUnconfirmed { host: String },
    /// The reconciliation plan was computed.
    Planned {
        deletes: usize,
        uploads: usize,
        skipped: usize,
    },
    /// A stale file was removed from the card.
    Deleted {
        /// 1-based position among deletions.
        index: usize,
        total: usize,
        file_name: String,
    },
    /// A desired file was uploaded.
    Uploaded {
        /// 1-based position among uploads.
        index: usize,
        total: usize,
        local_path: String,
        device_name: String,
    },
    /// A desired file is already on the card and was left alone.
    Skipped {
        local_path: String,
        device_name: String,
    },
    /// The run finished successfully.
    Completed {
        run_id: String,
        deleted: usize,
        uploaded: usize,
        skipped: usize,
        duration_ms: u64,
    },
    /// The run stopped on an error.
    Failed {
        run_id: String,
        message: String,
        /// Deletions completed before the failure.
        deleted: usize,
        /// Uploads completed before the failure.
        uploaded: usize,
    },
}

impl DeviceEvent {
    fn description(&self) -> &str {
        match self {
            DeviceEvent::Started { .. } => "Device sync started",
            DeviceEvent::WriteProtectUnconfirmed { .. } => "Write protection not confirmed",
            DeviceEvent::Planned { .. } => "Sync plan computed",
            DeviceEvent::Deleted { .. } => "File deleted from device",
            DeviceEvent::Uploaded { .. } => "File uploaded to device",
            DeviceEvent::Skipped { .. } => "File already on device",
            DeviceEvent::Completed { .. } => "Device sync completed",
            DeviceEvent::Failed { .. } => "Device sync failed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning the bus yields another producer for the same channel. Each
/// `subscribe()` creates an independent receiver that sees future events only.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(run_id: &str) -> CoreEvent {
        CoreEvent::Device(DeviceEvent::Completed {
            run_id: run_id.to_string(),
            deleted: 2,
            uploaded: 3,
            skipped: 95,
            duration_ms: 1200,
        })
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::default();
        assert!(bus.emit(completed("run-1")).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Device(DeviceEvent::Started {
            run_id: "run-1".to_string(),
            host: "flashair".to_string(),
            force: false,
        });
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for index in 1..=5 {
            bus.emit(CoreEvent::Device(DeviceEvent::Deleted {
                index,
                total: 5,
                file_name: format!("{:08X}.JPG", index),
            }))
            .ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity() {
        let failed = CoreEvent::Device(DeviceEvent::Failed {
            run_id: "run-1".to_string(),
            message: "listing failed".to_string(),
            deleted: 0,
            uploaded: 0,
        });
        assert_eq!(failed.severity(), EventSeverity::Error);

        let unconfirmed = CoreEvent::Device(DeviceEvent::WriteProtectUnconfirmed {
            host: "flashair".to_string(),
        });
        assert_eq!(unconfirmed.severity(), EventSeverity::Warning);

        assert_eq!(completed("run-1").severity(), EventSeverity::Info);

        let skipped = CoreEvent::Device(DeviceEvent::Skipped {
            local_path: "a.jpg".to_string(),
            device_name: "ABCDEF01.JPG".to_string(),
        });
        assert_eq!(skipped.severity(), EventSeverity::Debug);
    }

    #[test]
    fn test_event_description() {
        assert_eq!(completed("run-1").description(), "Device sync completed");
        let downloaded = CoreEvent::Source(SourceEvent::Downloaded {
            source: "facebook".to_string(),
            photo_id: "42".to_string(),
            index: 1,
            total: 1,
            cached: true,
        });
        assert_eq!(downloaded.description(), "Photo downloaded");
    }

    #[tokio::test]
    async fn test_concurrent_publishers() {
        let bus = EventBus::new(100);
        let mut sub = bus.subscribe();

        let bus1 = bus.clone();
        let bus2 = bus.clone();

        let handle1 = tokio::spawn(async move {
            for index in 1..=10 {
                bus1.emit(CoreEvent::Source(SourceEvent::Downloaded {
                    source: "flickr".to_string(),
                    photo_id: index.to_string(),
                    index,
                    total: 10,
                    cached: false,
                }))
                .ok();
            }
        });

        let handle2 = tokio::spawn(async move {
            for index in 1..=10 {
                bus2.emit(CoreEvent::Device(DeviceEvent::Uploaded {
                    index,
                    total: 10,
                    local_path: format!("{}.jpg", index),
                    device_name: format!("{:08X}.JPG", index),
                }))
                .ok();
            }
        });

        handle1.await.ok();
        handle2.await.ok();

        let mut count = 0;
        while sub.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 20);
    }

    #[test]
    fn test_event_serialization() {
        let event = CoreEvent::Device(DeviceEvent::Planned {
            deletes: 1,
            uploads: 2,
            skipped: 3,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Device\""));
        assert!(json.contains("\"event\":\"Planned\""));

        let deserialized: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }
}
