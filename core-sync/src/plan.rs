//! # Reconciliation Plan
//!
//! Pure diff between the desired files and the card listing. Never touches
//! the network.
//!
//! - Normal mode: delete device files no desired file maps to; upload desired
//!   files whose device name is absent; leave the rest alone.
//! - Force mode: delete everything listed, upload everything desired.
//!
//! Uploads keep the order of the desired files. Desired files that alias to
//! the same device name are not merged; each one is planned.

use crate::listing::DeviceListing;
use crate::naming::{DesiredFile, DeviceFileName};
use serde::Serialize;
use std::collections::HashSet;

/// A desired file paired with its device name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpload {
    pub local: DesiredFile,
    pub device_name: DeviceFileName,
}

impl PlannedUpload {
    pub fn new(local: DesiredFile) -> Self {
        let device_name = local.device_name();
        Self { local, device_name }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    /// Device file names to delete, in listing order
    pub deletes: Vec<String>,
    /// Files to upload, in desired order
    pub uploads: Vec<PlannedUpload>,
    /// Desired files already on the device
    pub unchanged: Vec<PlannedUpload>,
}

/// Counts summarising a plan, for logs and events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub deletes: usize,
    pub uploads: usize,
    pub unchanged: usize,
}

impl ReconciliationPlan {
    /// True when the device already matches
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.uploads.is_empty()
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            deletes: self.deletes.len(),
            uploads: self.uploads.len(),
            unchanged: self.unchanged.len(),
        }
    }
}

/// Compute the delete and upload sets for one run.
pub fn plan(desired: &[DesiredFile], present: &DeviceListing, force: bool) -> ReconciliationPlan {
    let pairs: Vec<PlannedUpload> = desired.iter().cloned().map(PlannedUpload::new).collect();

    if force {
        return ReconciliationPlan {
            deletes: present.names().to_vec(),
            uploads: pairs,
            unchanged: Vec::new(),
        };
    }

    let wanted: HashSet<&str> = pairs.iter().map(|p| p.device_name.as_str()).collect();
    let deletes = present
        .names()
        .iter()
        .filter(|name| !wanted.contains(name.as_str()))
        .cloned()
        .collect();

    let (unchanged, uploads) = pairs
        .into_iter()
        .partition(|p| present.contains(p.device_name.as_str()));

    ReconciliationPlan {
        deletes,
        uploads,
        unchanged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::derive_device_name;

    fn desired(paths: &[&str]) -> Vec<DesiredFile> {
        paths.iter().map(|p| DesiredFile::from(*p)).collect()
    }

    fn name(path: &str) -> String {
        derive_device_name(path).into_string()
    }

    #[test]
    fn test_uploads_only_missing_files() {
        let present = DeviceListing::from_names([name("a.jpg")]);
        let plan = plan(&desired(&["a.jpg", "b.jpg"]), &present, false);

        assert!(plan.deletes.is_empty());
        assert_eq!(plan.uploads.len(), 1);
        assert_eq!(plan.uploads[0].local, DesiredFile::from("b.jpg"));
        assert_eq!(plan.uploads[0].device_name, derive_device_name("b.jpg"));
        assert_eq!(plan.unchanged.len(), 1);
    }

    #[test]
    fn test_deletes_unwanted_device_files() {
        let present = DeviceListing::from_names(["FLASH3.JPG", name("a.jpg").as_str(), "FA000001.JPG"]);
        let plan = plan(&desired(&["a.jpg"]), &present, false);

        assert_eq!(plan.deletes, vec!["FLASH3.JPG", "FA000001.JPG"]);
        assert!(plan.uploads.is_empty());
        assert!(!plan.is_empty());
    }

    #[test]
    fn test_partition_is_exact() {
        let present = DeviceListing::from_names([name("a.jpg"), name("c.jpg"), "OLD.JPG".into()]);
        let wanted = desired(&["a.jpg", "b.jpg", "d.jpg"]);
        let plan = plan(&wanted, &present, false);

        // every listed name is either kept or deleted, never both
        for listed in present.names() {
            let kept = plan.unchanged.iter().any(|p| p.device_name == listed.as_str());
            let deleted = plan.deletes.contains(listed);
            assert!(kept ^ deleted, "{} kept={} deleted={}", listed, kept, deleted);
        }
        // every desired file is either unchanged or uploaded, never both
        assert_eq!(plan.unchanged.len() + plan.uploads.len(), wanted.len());
        assert_eq!(plan.deletes, vec![name("c.jpg"), "OLD.JPG".to_string()]);
    }

    #[test]
    fn test_force_replaces_everything() {
        let present = DeviceListing::from_names([name("a.jpg"), "OLD.JPG".into()]);
        let wanted = desired(&["a.jpg", "b.jpg"]);
        let plan = plan(&wanted, &present, true);

        assert_eq!(plan.deletes, present.names().to_vec());
        assert_eq!(
            plan.uploads.iter().map(|p| p.local.clone()).collect::<Vec<_>>(),
            wanted
        );
        assert!(plan.unchanged.is_empty());
    }

    #[test]
    fn test_upload_order_follows_input() {
        let wanted = desired(&["z.jpg", "m.jpg", "a.jpg", "q.jpg"]);
        let plan = plan(&wanted, &DeviceListing::default(), false);

        let order: Vec<&DesiredFile> = plan.uploads.iter().map(|p| &p.local).collect();
        assert_eq!(order, wanted.iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_aliasing_files_are_each_planned() {
        let wanted = desired(&["one/beach.jpg", "two/beach.jpg"]);
        let plan = plan(&wanted, &DeviceListing::default(), false);

        assert_eq!(plan.uploads.len(), 2);
        assert_eq!(plan.uploads[0].device_name, plan.uploads[1].device_name);
    }

    #[test]
    fn test_matching_device_gives_empty_plan() {
        let wanted = desired(&["a.jpg", "b.jpg"]);
        let present = DeviceListing::from_names(wanted.iter().map(|f| f.device_name().into_string()));
        let plan = plan(&wanted, &present, false);

        assert!(plan.is_empty());
        assert_eq!(
            plan.summary(),
            PlanSummary {
                deletes: 0,
                uploads: 0,
                unchanged: 2
            }
        );
    }
}
