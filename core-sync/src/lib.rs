//! # Device Sync Module
//!
//! Reconciles a directory on a FlashAir Wi-Fi SD card with a desired set of
//! local photos.
//!
//! ## Overview
//!
//! The card stores 8.3 file names only, so each local file is mapped to a
//! deterministic device name. A run lists the card directory, deletes device
//! files no desired file maps to, and uploads the desired files that are
//! missing. Repeating a run against the resulting card changes nothing.
//!
//! ## Components
//!
//! - **Naming** (`naming`): Canonical device names derived from base file names
//! - **Listing** (`listing`): Parser for the card's directory listing format
//! - **FAT32 Timestamps** (`fat32`): Packed wall-clock times for uploads
//! - **Plan** (`plan`): Pure diff of desired files against the listing
//! - **Device** (`device`): HTTP protocol client for the card
//! - **Reconciler** (`reconciler`): Executes a plan against the card

pub mod device;
pub mod error;
pub mod fat32;
pub mod listing;
pub mod naming;
pub mod plan;
pub mod reconciler;

pub use device::{DeviceClient, FlashAirClient, WriteProtectStatus};
pub use error::{Result, SyncError};
pub use fat32::Fat32Timestamp;
pub use listing::{DeviceEntry, DeviceListing, LIST_SENTINEL};
pub use naming::{derive_device_name, DesiredFile, DeviceFileName};
pub use plan::{plan, PlanSummary, PlannedUpload, ReconciliationPlan};
pub use reconciler::{Reconciler, SyncReport};
