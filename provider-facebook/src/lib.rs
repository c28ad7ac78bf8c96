//! # Facebook Provider
//!
//! Implements `PhotoSource` for the Facebook Graph API.
//!
//! ## Overview
//!
//! This module provides:
//! - Listing of the account's uploaded photos, newest first
//! - Cursor pagination via `paging.next`, bounded by a page limit
//! - Selection of the widest rendition of each photo
//! - Cached downloads through the shared photo cache
//!
//! Tag selection is not available through this API and is rejected.

pub mod connector;
pub mod error;
pub mod types;

pub use connector::{FacebookConnector, PhotoListing};
pub use error::{FacebookError, Result};
