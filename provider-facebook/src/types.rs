//! Graph API response types

use serde::Deserialize;

/// `GET /me/photos/uploaded` response
#[derive(Debug, Deserialize)]
pub struct PhotoListResponse {
    #[serde(default)]
    pub data: Vec<GraphPhoto>,

    #[serde(default)]
    pub paging: Option<Paging>,
}

impl PhotoListResponse {
    /// URL of the next page, if any
    pub fn next_page(&self) -> Option<&str> {
        self.paging.as_ref().and_then(|p| p.next.as_deref())
    }
}

/// Photo node; fields are optional because the API omits them for some
/// entries
#[derive(Debug, Deserialize)]
pub struct GraphPhoto {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub images: Option<Vec<GraphImage>>,
}

impl GraphPhoto {
    /// Widest rendition of the photo; the first one listed wins a tie
    pub fn largest_image(&self) -> Option<&GraphImage> {
        self.images.as_ref()?.iter().rev().max_by_key(|image| image.width)
    }
}

/// One rendition of a photo
#[derive(Debug, Clone, Deserialize)]
pub struct GraphImage {
    pub source: String,
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub next: Option<String>,
}

/// Error envelope returned with non-success statuses
#[derive(Debug, Deserialize)]
pub struct GraphErrorResponse {
    pub error: GraphErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct GraphErrorBody {
    pub message: String,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
}
