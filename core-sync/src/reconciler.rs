//! # Device Reconciler
//!
//! Brings the card directory in line with a desired set of local photos.
//!
//! ## Workflow
//!
//! 1. Enable host write-protect. An unconfirmed response is logged and the
//!    run continues.
//! 2. Fetch the directory listing.
//! 3. Compute the [`ReconciliationPlan`].
//! 4. Delete every stale device file.
//! 5. Upload every missing file, in desired order: set the next-upload
//!    timestamp, set the upload directory, then POST the body.
//!
//! Each step waits for the previous one. The first error stops the run;
//! work already done on the card is not rolled back. A failed run emits
//! [`DeviceEvent::Failed`] with the number of files deleted and uploaded so
//! far.

use crate::device::{DeviceClient, WriteProtectStatus};
use crate::error::{Result, SyncError};
use crate::fat32::Fat32Timestamp;
use crate::naming::{DesiredFile, DeviceFileName};
use crate::plan::{plan, PlannedUpload, ReconciliationPlan};
use bridge_traits::{Clock, FileSystemAccess};
use core_runtime::events::{CoreEvent, DeviceEvent, EventBus};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub write_protect: WriteProtectStatus,
    /// Device names removed from the card, in deletion order
    pub deleted: Vec<String>,
    /// Device names written to the card, in upload order
    pub uploaded: Vec<DeviceFileName>,
    /// Desired files that were already present
    pub skipped: usize,
}

impl SyncReport {
    /// True when the run changed nothing on the card
    pub fn is_noop(&self) -> bool {
        self.deleted.is_empty() && self.uploaded.is_empty()
    }
}

/// Files touched so far, kept for failure reporting
#[derive(Debug, Default)]
struct Progress {
    deleted: Vec<String>,
    uploaded: Vec<DeviceFileName>,
}

pub struct Reconciler {
    device: Arc<dyn DeviceClient>,
    file_system: Arc<dyn FileSystemAccess>,
    clock: Arc<dyn Clock>,
    event_bus: Option<EventBus>,
}

impl Reconciler {
    pub fn new(
        device: Arc<dyn DeviceClient>,
        file_system: Arc<dyn FileSystemAccess>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            device,
            file_system,
            clock,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Reconcile the card against `desired`.
    ///
    /// With `force` every listed device file is deleted and every desired
    /// file is uploaded again.
    #[instrument(skip(self, desired), fields(host = %self.device.host(), desired = desired.len()))]
    pub async fn sync(&self, desired: &[DesiredFile], force: bool) -> Result<SyncReport> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();

        info!(%run_id, force, "Starting device sync");
        self.emit(DeviceEvent::Started {
            run_id: run_id.to_string(),
            host: self.device.host().to_string(),
            force,
        });

        let mut progress = Progress::default();
        match self.execute(desired, force, &mut progress).await {
            Ok((write_protect, skipped)) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                info!(
                    %run_id,
                    deleted = progress.deleted.len(),
                    uploaded = progress.uploaded.len(),
                    skipped,
                    duration_ms,
                    "Device sync completed"
                );
                self.emit(DeviceEvent::Completed {
                    run_id: run_id.to_string(),
                    deleted: progress.deleted.len(),
                    uploaded: progress.uploaded.len(),
                    skipped,
                    duration_ms,
                });

                Ok(SyncReport {
                    run_id,
                    write_protect,
                    deleted: progress.deleted,
                    uploaded: progress.uploaded,
                    skipped,
                })
            }
            Err(e) => {
                error!(
                    %run_id,
                    deleted = progress.deleted.len(),
                    uploaded = progress.uploaded.len(),
                    "Device sync failed: {}",
                    e
                );
                self.emit(DeviceEvent::Failed {
                    run_id: run_id.to_string(),
                    message: e.to_string(),
                    deleted: progress.deleted.len(),
                    uploaded: progress.uploaded.len(),
                });
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        desired: &[DesiredFile],
        force: bool,
        progress: &mut Progress,
    ) -> Result<(WriteProtectStatus, usize)> {
        let write_protect = self.device.enable_write_protect().await?;
        if write_protect == WriteProtectStatus::Unconfirmed {
            warn!(
                host = %self.device.host(),
                "Card did not confirm write-protect mode, continuing"
            );
            self.emit(DeviceEvent::WriteProtectUnconfirmed {
                host: self.device.host().to_string(),
            });
        }

        let listing = self.device.list_files().await?;
        let plan = plan(desired, &listing, force);
        self.announce(&plan);

        self.delete_stale(&plan.deletes, progress).await?;
        self.upload_missing(&plan.uploads, progress).await?;

        Ok((write_protect, plan.unchanged.len()))
    }

    fn announce(&self, plan: &ReconciliationPlan) {
        let summary = plan.summary();
        info!(
            deletes = summary.deletes,
            uploads = summary.uploads,
            skipped = summary.unchanged,
            "Computed reconciliation plan"
        );
        self.emit(DeviceEvent::Planned {
            deletes: summary.deletes,
            uploads: summary.uploads,
            skipped: summary.unchanged,
        });

        for entry in &plan.unchanged {
            debug!(
                "Skipping {} ({} already on card)",
                entry.local,
                entry.device_name
            );
            self.emit(DeviceEvent::Skipped {
                local_path: entry.local.to_string(),
                device_name: entry.device_name.to_string(),
            });
        }
    }

    async fn delete_stale(&self, deletes: &[String], progress: &mut Progress) -> Result<()> {
        let total = deletes.len();
        for (position, file_name) in deletes.iter().enumerate() {
            let index = position + 1;
            info!("[{}/{}] Deleting {}", index, total, file_name);
            self.device.delete_file(file_name).await?;

            progress.deleted.push(file_name.clone());
            self.emit(DeviceEvent::Deleted {
                index,
                total,
                file_name: file_name.clone(),
            });
        }
        Ok(())
    }

    async fn upload_missing(
        &self,
        uploads: &[PlannedUpload],
        progress: &mut Progress,
    ) -> Result<()> {
        let total = uploads.len();
        for (position, entry) in uploads.iter().enumerate() {
            let index = position + 1;
            info!(
                "[{}/{}] Uploading {} as {}",
                index, total, entry.local, entry.device_name
            );

            let data = self
                .file_system
                .read_file(entry.local.path())
                .await
                .map_err(|e| SyncError::LocalFile {
                    path: entry.local.path().to_path_buf(),
                    message: e.to_string(),
                })?;

            let timestamp = Fat32Timestamp::from_datetime(&self.clock.local_now())?;
            self.device.set_upload_timestamp(timestamp).await?;
            self.device.set_upload_directory().await?;
            self.device.upload_file(&entry.device_name, data).await?;

            progress.uploaded.push(entry.device_name.clone());
            self.emit(DeviceEvent::Uploaded {
                index,
                total,
                local_path: entry.local.to_string(),
                device_name: entry.device_name.to_string(),
            });
        }
        Ok(())
    }

    fn emit(&self, event: DeviceEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Device(event)).ok();
        }
    }
}
