//! # FlashAir Device Protocol
//!
//! HTTP client for the card's control interface. All requests go to
//! `http://{host}/command.cgi` or `http://{host}/upload.cgi`:
//!
//! | Operation | Request |
//! |---|---|
//! | list directory | `GET command.cgi?op=100&DIR={card_path}` |
//! | delete | `GET upload.cgi?DEL={card_path}/{name}` |
//! | write-protect | `GET upload.cgi?WRITEPROTECT=ON` |
//! | next-upload timestamp | `GET upload.cgi?FTIME=0x{fat32}` |
//! | upload directory | `GET upload.cgi?UPDIR={card_path}` |
//! | upload | `POST upload.cgi`, multipart field `file` |
//!
//! The card is a single-connection embedded server, so requests are sent one
//! at a time and never retried. Any connection failure or non-2xx status is a
//! [`SyncError::Transport`].

use crate::error::{Result, SyncError};
use crate::fat32::Fat32Timestamp;
use crate::listing::DeviceListing;
use crate::naming::DeviceFileName;
use async_trait::async_trait;
use bridge_traits::{HttpClient, HttpRequest, HttpResponse, MultipartForm, RetryPolicy};
use bytes::Bytes;
use core_runtime::config::DeviceConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Token the card includes in a successful write-protect response
const WRITE_PROTECT_ACK: &str = "SUCCESS";

/// Outcome of the write-protect request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteProtectStatus {
    /// The card answered with the acknowledgment token
    Acknowledged,
    /// The request succeeded but the token was missing. Some firmware omits
    /// it even when the mode was applied.
    Unconfirmed,
}

/// Operations the reconciler needs from a card
#[async_trait]
pub trait DeviceClient: Send + Sync {
    /// Host name used in logs and events
    fn host(&self) -> &str;

    /// Put the card into host write-protect mode
    async fn enable_write_protect(&self) -> Result<WriteProtectStatus>;

    /// List the files in the card directory
    async fn list_files(&self) -> Result<DeviceListing>;

    /// Delete one file from the card directory
    async fn delete_file(&self, file_name: &str) -> Result<()>;

    /// Timestamp applied to the next uploaded file
    async fn set_upload_timestamp(&self, timestamp: Fat32Timestamp) -> Result<()>;

    /// Point uploads at the card directory
    async fn set_upload_directory(&self) -> Result<()>;

    /// Upload a file body under `device_name`
    async fn upload_file(&self, device_name: &DeviceFileName, data: Bytes) -> Result<()>;
}

/// [`DeviceClient`] for Toshiba FlashAir cards
pub struct FlashAirClient {
    http_client: Arc<dyn HttpClient>,
    host: String,
    base_url: String,
    card_path: String,
    request_timeout: Duration,
    upload_timeout: Duration,
}

impl FlashAirClient {
    pub fn new(http_client: Arc<dyn HttpClient>, config: &DeviceConfig) -> Self {
        Self {
            http_client,
            host: config.host.clone(),
            base_url: config.base_url(),
            card_path: config.card_path.clone(),
            request_timeout: config.request_timeout,
            upload_timeout: config.upload_timeout,
        }
    }

    pub fn card_path(&self) -> &str {
        &self.card_path
    }

    fn command_url(&self) -> String {
        format!("{}/command.cgi", self.base_url)
    }

    fn upload_url(&self) -> String {
        format!("{}/upload.cgi", self.base_url)
    }

    fn control_request(&self, key: &str, value: impl Into<String>) -> HttpRequest {
        HttpRequest::get(self.upload_url())
            .query_param(key, value)
            .timeout(self.request_timeout)
    }

    /// Send one request, mapping failures to [`SyncError::Transport`].
    async fn send(&self, operation: &str, request: HttpRequest) -> Result<HttpResponse> {
        let response = self
            .http_client
            .execute_with_retry(request, RetryPolicy::none())
            .await
            .map_err(|e| SyncError::Transport {
                operation: operation.to_string(),
                status: None,
                message: e.to_string(),
            })?;

        if !response.is_success() {
            let body = String::from_utf8_lossy(&response.body);
            let snippet: String = body.trim().chars().take(120).collect();
            return Err(SyncError::Transport {
                operation: operation.to_string(),
                status: Some(response.status),
                message: format!("HTTP {} {}", response.status, snippet)
                    .trim_end()
                    .to_string(),
            });
        }

        debug!(operation, status = response.status, "Device request succeeded");
        Ok(response)
    }
}

#[async_trait]
impl DeviceClient for FlashAirClient {
    fn host(&self) -> &str {
        &self.host
    }

    #[instrument(skip(self), fields(host = %self.host))]
    async fn enable_write_protect(&self) -> Result<WriteProtectStatus> {
        let response = self
            .send("write-protect", self.control_request("WRITEPROTECT", "ON"))
            .await?;

        let body = String::from_utf8_lossy(&response.body);
        if body.contains(WRITE_PROTECT_ACK) {
            Ok(WriteProtectStatus::Acknowledged)
        } else {
            Ok(WriteProtectStatus::Unconfirmed)
        }
    }

    #[instrument(skip(self), fields(host = %self.host, dir = %self.card_path))]
    async fn list_files(&self) -> Result<DeviceListing> {
        let request = HttpRequest::get(self.command_url())
            .query_param("op", "100")
            .query_param("DIR", self.card_path.as_str())
            .timeout(self.request_timeout);

        let response = self.send("list", request).await?;
        let body = String::from_utf8_lossy(&response.body);
        let listing = DeviceListing::parse(&body)?;

        debug!(
            files = listing.len(),
            skipped_lines = listing.skipped_lines(),
            "Parsed device listing"
        );
        Ok(listing)
    }

    #[instrument(skip(self), fields(host = %self.host))]
    async fn delete_file(&self, file_name: &str) -> Result<()> {
        let target = format!("{}/{}", self.card_path, file_name);
        self.send("delete", self.control_request("DEL", target))
            .await?;
        Ok(())
    }

    async fn set_upload_timestamp(&self, timestamp: Fat32Timestamp) -> Result<()> {
        self.send(
            "set-timestamp",
            self.control_request("FTIME", timestamp.to_hex()),
        )
        .await?;
        Ok(())
    }

    async fn set_upload_directory(&self) -> Result<()> {
        self.send(
            "set-upload-dir",
            self.control_request("UPDIR", self.card_path.as_str()),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self, data), fields(host = %self.host, size = data.len()))]
    async fn upload_file(&self, device_name: &DeviceFileName, data: Bytes) -> Result<()> {
        let form = MultipartForm::new().file("file", device_name.as_str(), "image/jpeg", data);
        let request = HttpRequest::post(self.upload_url())
            .multipart(form)
            .timeout(self.upload_timeout);

        self.send("upload", request).await?;
        Ok(())
    }
}
