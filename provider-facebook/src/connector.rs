//! Graph API connector
//!
//! Lists the photos uploaded by the token's account and hands them to the
//! shared download cache.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse, RetryPolicy};
use bridge_traits::photos::{PhotoCriteria, PhotoSource, SourcePhoto};
use bridge_traits::storage::FileSystemAccess;
use core_runtime::config::FacebookApiConfig;
use core_runtime::events::{CoreEvent, EventBus, SourceEvent};
use core_runtime::logging::redact_url;
use core_runtime::PhotoCache;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{FacebookError, Result};
use crate::types::{GraphErrorResponse, PhotoListResponse};

const SOURCE_NAME: &str = "facebook";

/// Fields requested for each photo node
const PHOTO_FIELDS: &str = "id,images";

/// Photo listing with the number of unusable entries that were skipped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoListing {
    pub photos: Vec<SourcePhoto>,
    pub skipped: usize,
}

pub struct FacebookConnector {
    http_client: Arc<dyn HttpClient>,
    config: FacebookApiConfig,
    cache: PhotoCache,
    event_bus: Option<EventBus>,
}

impl FacebookConnector {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        file_system: Arc<dyn FileSystemAccess>,
        config: FacebookApiConfig,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        let cache = PhotoCache::new(
            SOURCE_NAME,
            Arc::clone(&http_client),
            file_system,
            download_dir,
        );
        Self {
            http_client,
            config,
            cache,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.cache = self.cache.with_event_bus(event_bus.clone());
        self.event_bus = Some(event_bus);
        self
    }

    fn first_page_request(&self, count: usize) -> HttpRequest {
        let url = format!(
            "{}/me/photos/uploaded",
            self.config.graph_api_base.trim_end_matches('/')
        );
        HttpRequest::get(url)
            .query_param("fields", PHOTO_FIELDS)
            .query_param("limit", count.to_string())
            .bearer_token(self.config.access_token.as_str())
    }

    async fn fetch_page(&self, request: HttpRequest) -> Result<PhotoListResponse> {
        let response = self
            .http_client
            .execute_with_retry(request, RetryPolicy::default())
            .await?;

        if !response.is_success() {
            return Err(api_error(&response));
        }

        serde_json::from_slice(&response.body).map_err(|e| {
            FacebookError::ParseError(format!("Failed to parse photo list: {}", e))
        })
    }

    /// List up to `count` uploaded photos, newest first.
    ///
    /// Follows at most `max_pages` `paging.next` links after the first
    /// request, so up to `max_pages + 1` pages are read. Entries without an
    /// id or without images are skipped and counted.
    #[instrument(skip(self))]
    pub async fn list_uploaded(&self, count: usize) -> Result<PhotoListing> {
        let mut listing = PhotoListing::default();
        if count == 0 {
            return Ok(listing);
        }

        let mut request = Some(self.first_page_request(count));
        let mut links_followed = 0;

        while let Some(current) = request.take() {
            let page = self.fetch_page(current).await?;
            debug!(page = links_followed + 1, entries = page.data.len(), "Fetched photo page");

            for node in &page.data {
                if listing.photos.len() >= count {
                    break;
                }
                match (node.id.as_deref(), node.largest_image()) {
                    (Some(id), Some(image)) => {
                        listing.photos.push(SourcePhoto::new(id, image.source.as_str()));
                    }
                    _ => listing.skipped += 1,
                }
            }

            if listing.photos.len() >= count || links_followed >= self.config.max_pages {
                break;
            }
            links_followed += 1;
            // The next URL already carries the query, including the token
            request = page.next_page().map(|next| {
                debug!(next = %redact_url(next), "Following paging link");
                HttpRequest::get(next).bearer_token(self.config.access_token.as_str())
            });
        }

        if listing.skipped > 0 {
            warn!(skipped = listing.skipped, "Skipped photos without id or images");
        }
        info!("Listed {} photos from Facebook", listing.photos.len());
        Ok(listing)
    }

    fn emit(&self, event: SourceEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Source(event)).ok();
        }
    }
}

fn api_error(response: &HttpResponse) -> FacebookError {
    let message = match serde_json::from_slice::<GraphErrorResponse>(&response.body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => String::from_utf8_lossy(&response.body).to_string(),
    };
    warn!(status = response.status, "Graph API request failed");
    FacebookError::ApiError {
        status_code: response.status,
        message,
    }
}

#[async_trait]
impl PhotoSource for FacebookConnector {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    #[instrument(skip(self, criteria), fields(criteria = %criteria))]
    async fn resolve(&self, criteria: &PhotoCriteria) -> BridgeResult<Vec<PathBuf>> {
        let count = match criteria {
            PhotoCriteria::Recent { count } => *count,
            PhotoCriteria::Tagged { .. } => {
                return Err(FacebookError::Unsupported(
                    "Facebook photos cannot be selected by tag".to_string(),
                )
                .into());
            }
        };

        info!("Connecting to Facebook, fetching {}", criteria);
        self.emit(SourceEvent::Fetching {
            source: SOURCE_NAME.to_string(),
            criteria: criteria.to_string(),
        });

        let listing = self.list_uploaded(count).await?;
        let paths = self
            .cache
            .fetch_all(&listing.photos)
            .await
            .map_err(FacebookError::from)?;

        self.emit(SourceEvent::Resolved {
            source: SOURCE_NAME.to_string(),
            count: paths.len(),
        });
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;
    use bridge_traits::testing::MemoryFileSystem;
    use bytes::Bytes;
    use mockall::{mock, Sequence};
    use std::path::Path;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    const BASE: &str = "https://graph.test/v19.0";

    fn connector(http: MockHttpClient, max_pages: usize) -> (FacebookConnector, Arc<MemoryFileSystem>) {
        let fs = Arc::new(MemoryFileSystem::new("/cache"));
        let config = FacebookApiConfig::new("page-token")
            .with_graph_api_base(BASE)
            .with_max_pages(max_pages);
        let connector = FacebookConnector::new(Arc::new(http), fs.clone(), config, "/cache");
        (connector, fs)
    }

    fn node(id: &str) -> String {
        format!(
            r#"{{"id":"{id}","images":[{{"width":320,"height":240,"source":"https://cdn.test/{id}_s.jpg"}},{{"width":1024,"height":768,"source":"https://cdn.test/{id}_l.jpg"}}]}}"#
        )
    }

    fn page(nodes: &[String], next: Option<&str>) -> HttpResponse {
        let paging = match next {
            Some(url) => format!(r#","paging":{{"next":"{}"}}"#, url),
            None => String::new(),
        };
        HttpResponse::new(200, format!(r#"{{"data":[{}]{}}}"#, nodes.join(","), paging))
    }

    #[tokio::test]
    async fn test_first_request_shape() {
        let mut http = MockHttpClient::new();
        http.expect_execute().times(1).returning(|request| {
            assert_eq!(request.url, format!("{}/me/photos/uploaded", BASE));
            assert_eq!(request.query_value("fields"), Some("id,images"));
            assert_eq!(request.query_value("limit"), Some("2"));
            assert_eq!(
                request.headers.get("Authorization").map(String::as_str),
                Some("Bearer page-token")
            );
            Ok(page(&[node("1"), node("2")], None))
        });

        let (connector, _) = connector(http, 10);
        let listing = connector.list_uploaded(2).await.unwrap();

        assert_eq!(
            listing.photos,
            vec![
                SourcePhoto::new("1", "https://cdn.test/1_l.jpg"),
                SourcePhoto::new("2", "https://cdn.test/2_l.jpg"),
            ]
        );
        assert_eq!(listing.skipped, 0);
    }

    #[tokio::test]
    async fn test_follows_next_until_count() {
        let mut http = MockHttpClient::new();
        let mut seq = Sequence::new();
        http.expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(page(&[node("1")], Some("https://graph.test/next?after=abc"))));
        http.expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|request| {
                assert_eq!(request.url, "https://graph.test/next?after=abc");
                assert!(request.query.is_empty());
                Ok(page(
                    &[node("2"), node("3")],
                    Some("https://graph.test/next?after=def"),
                ))
            });

        let (connector, _) = connector(http, 10);
        let listing = connector.list_uploaded(2).await.unwrap();
        let ids: Vec<&str> = listing.photos.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_page_limit_bounds_listing() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(3)
            .returning(|_| Ok(page(&[node("1")], Some("https://graph.test/next"))));

        let (connector, _) = connector(http, 2);
        let listing = connector.list_uploaded(10).await.unwrap();
        assert_eq!(listing.photos.len(), 3);
    }

    #[tokio::test]
    async fn test_page_limit_counts_followed_links() {
        let mut http = MockHttpClient::new();
        let mut seq = Sequence::new();
        http.expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|request| {
                assert_eq!(request.url, format!("{}/me/photos/uploaded", BASE));
                Ok(page(&[node("1")], Some("https://graph.test/next?after=abc")))
            });
        http.expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|request| {
                assert_eq!(request.url, "https://graph.test/next?after=abc");
                Ok(page(&[node("2")], Some("https://graph.test/next?after=def")))
            });

        let (connector, _) = connector(http, 1);
        let listing = connector.list_uploaded(5).await.unwrap();
        let ids: Vec<&str> = listing.photos.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_incomplete_entries_are_skipped() {
        let mut http = MockHttpClient::new();
        http.expect_execute().times(1).returning(|_| {
            Ok(page(
                &[
                    r#"{"images":[{"width":10,"source":"https://cdn.test/x.jpg"}]}"#.to_string(),
                    r#"{"id":"9"}"#.to_string(),
                    node("4"),
                ],
                None,
            ))
        });

        let (connector, _) = connector(http, 10);
        let listing = connector.list_uploaded(5).await.unwrap();
        assert_eq!(listing.photos.len(), 1);
        assert_eq!(listing.skipped, 2);
    }

    #[tokio::test]
    async fn test_graph_error_message_is_reported() {
        let mut http = MockHttpClient::new();
        http.expect_execute().times(1).returning(|_| {
            Ok(HttpResponse::new(
                400,
                r#"{"error":{"message":"Invalid OAuth access token.","type":"OAuthException","code":190}}"#,
            ))
        });

        let (connector, _) = connector(http, 10);
        match connector.list_uploaded(1).await {
            Err(FacebookError::ApiError {
                status_code,
                message,
            }) => {
                assert_eq!(status_code, 400);
                assert_eq!(message, "Invalid OAuth access token.");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_tags_are_unsupported() {
        let (connector, _) = connector(MockHttpClient::new(), 10);
        let criteria = PhotoCriteria::Tagged {
            tags: vec!["family".to_string()],
            count: 5,
        };

        let err = connector.resolve(&criteria).await.unwrap_err();
        assert!(matches!(err, BridgeError::NotAvailable(_)));
    }

    #[tokio::test]
    async fn test_resolve_downloads_largest_image() {
        let mut http = MockHttpClient::new();
        http.expect_execute().times(2).returning(|request| {
            if request.url.starts_with(BASE) {
                Ok(page(&[node("77")], None))
            } else {
                assert_eq!(request.url, "https://cdn.test/77_l.jpg");
                Ok(HttpResponse::new(200, Bytes::from_static(b"jpeg")))
            }
        });

        let (connector, fs) = connector(http, 10);
        let paths = connector
            .resolve(&PhotoCriteria::Recent { count: 1 })
            .await
            .unwrap();

        assert_eq!(paths, vec![PathBuf::from("/cache/77.jpg")]);
        assert_eq!(
            fs.contents(Path::new("/cache/77.jpg")),
            Some(Bytes::from_static(b"jpeg"))
        );
    }
}
