//! Flickr API response types
//!
//! Data structures for deserializing `format=json&nojsoncallback=1` responses
//! of the photo listing methods.

use serde::{Deserialize, Serialize};

/// Envelope shared by `flickr.people.getPublicPhotos` and `flickr.photos.search`
///
/// See: https://www.flickr.com/services/api/response.json.html
#[derive(Debug, Deserialize)]
pub struct PhotosResponse {
    /// `ok` or `fail`
    pub stat: String,

    /// Result page, present when `stat` is `ok`
    #[serde(default)]
    pub photos: Option<PhotoPage>,

    /// Error code, present when `stat` is `fail`
    #[serde(default)]
    pub code: Option<i64>,

    /// Error message, present when `stat` is `fail`
    #[serde(default)]
    pub message: Option<String>,
}

impl PhotosResponse {
    pub fn is_ok(&self) -> bool {
        self.stat == "ok"
    }
}

/// One page of a photo listing
#[derive(Debug, Deserialize)]
pub struct PhotoPage {
    pub page: u32,
    pub pages: u32,
    pub perpage: u32,
    #[serde(default)]
    pub photo: Vec<FlickrPhoto>,
}

/// Flickr photo record
///
/// See: https://www.flickr.com/services/api/misc.urls.html
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlickrPhoto {
    /// Photo ID
    pub id: String,

    /// URL secret
    pub secret: String,

    /// Server hosting the image
    pub server: String,

    /// Photo title
    #[serde(default)]
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_photo_page() {
        let json = r#"{
            "photos": {
                "page": 1,
                "pages": 3,
                "perpage": 2,
                "total": 6,
                "photo": [
                    {"id": "11692277333", "owner": "12037949754@N01", "secret": "a1b2c3", "server": "7331", "farm": 8, "title": "Beach", "ispublic": 1},
                    {"id": "5302", "owner": "12037949754@N01", "secret": "d4e5f6", "server": "65535", "farm": 66, "title": "", "ispublic": 1}
                ]
            },
            "stat": "ok"
        }"#;

        let response: PhotosResponse = serde_json::from_str(json).unwrap();
        assert!(response.is_ok());
        let page = response.photos.unwrap();
        assert_eq!(page.pages, 3);
        assert_eq!(page.photo.len(), 2);
        assert_eq!(page.photo[0].id, "11692277333");
        assert_eq!(page.photo[1].server, "65535");
    }

    #[test]
    fn test_deserialize_failure() {
        let json = r#"{"stat": "fail", "code": 100, "message": "Invalid API Key (Key has invalid format)"}"#;

        let response: PhotosResponse = serde_json::from_str(json).unwrap();
        assert!(!response.is_ok());
        assert!(response.photos.is_none());
        assert_eq!(response.code, Some(100));
    }
}
