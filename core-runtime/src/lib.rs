//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the sync core and the photo sources:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//! - Download cache for remote photos
//!
//! ## Overview
//!
//! Other workspace crates depend on this one for their configuration types,
//! their logging conventions and the broadcast channel they report progress on.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod photo_cache;

pub use error::{Error, Result};
pub use photo_cache::PhotoCache;
