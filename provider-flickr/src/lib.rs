//! # Flickr Provider
//!
//! Implements `PhotoSource` for the Flickr REST API.
//!
//! ## Overview
//!
//! This module provides:
//! - Most-recent selection via `flickr.people.getPublicPhotos`
//! - Tag selection via `flickr.photos.search`
//! - Paginated listing up to the requested count
//! - Cached downloads of the large-size image for each photo

pub mod connector;
pub mod error;
pub mod types;

pub use connector::FlickrConnector;
pub use error::{FlickrError, Result};
