//! Photo Source Abstraction
//!
//! A photo source turns a selection criterion into an ordered list of local
//! files. Remote sources download into a cache first; the caller only ever
//! sees local paths.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::Result;

/// Which photos to select from a source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PhotoCriteria {
    /// The `count` most recent photos
    Recent { count: usize },
    /// Up to `count` photos carrying any of `tags`
    Tagged { tags: Vec<String>, count: usize },
}

impl PhotoCriteria {
    /// Build criteria from an optional tag list: an empty list selects the
    /// most recent photos.
    pub fn from_tags(tags: Vec<String>, count: usize) -> Self {
        let tags: Vec<String> = tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        if tags.is_empty() {
            Self::Recent { count }
        } else {
            Self::Tagged { tags, count }
        }
    }

    /// Maximum number of photos to select
    pub fn count(&self) -> usize {
        match self {
            Self::Recent { count } | Self::Tagged { count, .. } => *count,
        }
    }
}

impl fmt::Display for PhotoCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recent { count } => write!(f, "{} most recent", count),
            Self::Tagged { tags, count } => write!(f, "{} tagged [{}]", count, tags.join(",")),
        }
    }
}

/// A photo as described by a remote service, before download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePhoto {
    /// Service-assigned identifier, used as the cache key
    pub id: String,
    /// URL of the image bytes to download
    pub url: String,
}

impl SourcePhoto {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }
}

/// Photo source trait
///
/// Implementations guarantee that every returned path exists and is readable
/// when `resolve` returns.
#[async_trait]
pub trait PhotoSource: Send + Sync {
    /// Short name used in logs and events (e.g. "flickr")
    fn name(&self) -> &str;

    /// Resolve `criteria` into an ordered list of local file paths
    async fn resolve(&self, criteria: &PhotoCriteria) -> Result<Vec<PathBuf>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criteria_from_empty_tags_is_recent() {
        assert_eq!(
            PhotoCriteria::from_tags(vec![], 100),
            PhotoCriteria::Recent { count: 100 }
        );
        assert_eq!(
            PhotoCriteria::from_tags(vec![" ".to_string()], 5),
            PhotoCriteria::Recent { count: 5 }
        );
    }

    #[test]
    fn test_criteria_from_tags_trims() {
        let criteria =
            PhotoCriteria::from_tags(vec![" family".to_string(), "frame ".to_string()], 20);
        assert_eq!(
            criteria,
            PhotoCriteria::Tagged {
                tags: vec!["family".to_string(), "frame".to_string()],
                count: 20
            }
        );
        assert_eq!(criteria.count(), 20);
        assert_eq!(criteria.to_string(), "20 tagged [family,frame]");
    }

    #[test]
    fn test_criteria_serialization() {
        let json = serde_json::to_string(&PhotoCriteria::Recent { count: 3 }).unwrap();
        assert_eq!(json, r#"{"kind":"recent","count":3}"#);
    }
}
