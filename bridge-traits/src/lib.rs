//! # Host Bridge Traits
//!
//! Capability traits the core requires from its host.
//!
//! ## Overview
//!
//! This crate defines the contract between the sync core and host-specific
//! implementations. Each trait represents a capability the core needs but
//! does not implement itself, so that tests can substitute in-memory fakes and
//! hosts can plug in their own transports.
//!
//! ## Traits
//!
//! ### Networking & I/O
//! - [`HttpClient`](http::HttpClient) - Async HTTP with query parameters, multipart bodies and retry policies
//! - [`FileSystemAccess`](storage::FileSystemAccess) - File I/O for the photo cache and upload reads
//!
//! ### Photo Sources
//! - [`PhotoSource`](photos::PhotoSource) - Resolves selection criteria into local photo files
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Implementations
//!
//! | Host | Implementation Crate |
//! |------|---------------------|
//! | Desktop | `bridge-desktop` |
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Implementations should:
//!
//! - Convert platform-specific errors to `BridgeError`
//! - Provide actionable error messages
//! - Include error context (e.g., file paths, URLs)
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds so implementations can be
//! shared behind `Arc` across async tasks.

pub mod error;
pub mod http;
pub mod photos;
pub mod storage;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{
    HttpClient, HttpMethod, HttpRequest, HttpResponse, MultipartForm, MultipartPart, RetryPolicy,
};
pub use photos::{PhotoCriteria, PhotoSource, SourcePhoto};
pub use storage::{FileMetadata, FileSystemAccess};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
