//! # Device Listing Parser
//!
//! Parses the body returned by `command.cgi?op=100`:
//!
//! ```text
//! WLANSD_FILELIST
//! /DCIM/100__TSB,FA000001.JPG,128751,33,16602,18432
//! ```
//!
//! The first line must be the header exactly (surrounding whitespace
//! ignored). Each later line is `{dir},{name},{size},{attr},{date},{time}`;
//! lines with fewer than two fields are skipped.

use crate::error::{Result, SyncError};
use std::collections::HashSet;

/// Header line of a directory listing
pub const LIST_SENTINEL: &str = "WLANSD_FILELIST";

/// One row of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    pub directory: String,
    pub name: String,
    pub size: Option<u64>,
    pub attributes: Option<u8>,
    /// FAT packed date
    pub date: Option<u16>,
    /// FAT packed time
    pub time: Option<u16>,
}

impl DeviceEntry {
    /// Build an entry from one listing line; `None` for malformed lines.
    pub fn from_line(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < 2 || fields[1].is_empty() {
            return None;
        }

        let field = |index: usize| fields.get(index).copied().unwrap_or_default();

        Some(Self {
            directory: field(0).to_string(),
            name: field(1).to_string(),
            size: field(2).parse().ok(),
            attributes: field(3).parse().ok(),
            date: field(4).parse().ok(),
            time: field(5).parse().ok(),
        })
    }
}

/// Snapshot of the files present in the card directory.
///
/// Names keep listing order; duplicates are reported once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceListing {
    entries: Vec<DeviceEntry>,
    names: Vec<String>,
    skipped_lines: usize,
}

impl DeviceListing {
    /// Parse a listing body.
    ///
    /// Fails with [`SyncError::ProtocolMismatch`] when the header is missing.
    pub fn parse(body: &str) -> Result<Self> {
        let mut lines = body.lines();
        let header = lines.next().unwrap_or_default().trim();
        if header != LIST_SENTINEL {
            return Err(SyncError::ProtocolMismatch {
                expected: LIST_SENTINEL.to_string(),
                found: header.chars().take(64).collect(),
            });
        }

        let mut listing = Self::default();
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            match DeviceEntry::from_line(line) {
                Some(entry) => listing.push(entry),
                None => listing.skipped_lines += 1,
            }
        }

        Ok(listing)
    }

    /// Listing holding only names, in the given order
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut listing = Self::default();
        for name in names {
            let name = name.into();
            listing.push(DeviceEntry {
                directory: String::new(),
                name,
                size: None,
                attributes: None,
                date: None,
                time: None,
            });
        }
        listing
    }

    fn push(&mut self, entry: DeviceEntry) {
        if !self.names.contains(&entry.name) {
            self.names.push(entry.name.clone());
        }
        self.entries.push(entry);
    }

    /// Distinct file names in listing order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn entries(&self) -> &[DeviceEntry] {
        &self.entries
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn name_set(&self) -> HashSet<&str> {
        self.names.iter().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Non-blank lines dropped as malformed
    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_single_entry() {
        let listing = DeviceListing::parse(
            "WLANSD_FILELIST\n/DCIM/100__TSB,FA000001.JPG,128751,33,16602,18432\n",
        )
        .unwrap();

        assert_eq!(listing.names(), ["FA000001.JPG".to_string()]);
        assert_eq!(
            listing.entries()[0],
            DeviceEntry {
                directory: "/DCIM/100__TSB".to_string(),
                name: "FA000001.JPG".to_string(),
                size: Some(128751),
                attributes: Some(33),
                date: Some(16602),
                time: Some(18432),
            }
        );
    }

    #[test]
    fn test_skips_malformed_lines() {
        let listing =
            DeviceListing::parse("WLANSD_FILELIST\ngarbage\n\n/DCIM/100__TSB,B.JPG\n").unwrap();

        assert_eq!(listing.names(), ["B.JPG".to_string()]);
        assert_eq!(listing.skipped_lines(), 1);
        assert_eq!(listing.entries()[0].size, None);
    }

    #[test]
    fn test_header_only_is_empty() {
        let listing = DeviceListing::parse("WLANSD_FILELIST").unwrap();
        assert!(listing.is_empty());
        assert_eq!(listing.len(), 0);
    }

    #[test]
    fn test_crlf_and_padded_header() {
        let listing = DeviceListing::parse(
            "  WLANSD_FILELIST \r\n/DCIM/100__TSB, FLASH3.JPG ,370952,32,0,0\r\n",
        )
        .unwrap();
        assert!(listing.contains("FLASH3.JPG"));
    }

    #[test]
    fn test_wrong_header_is_protocol_mismatch() {
        let err = DeviceListing::parse("<html>Not Found</html>\n").unwrap_err();
        match err {
            SyncError::ProtocolMismatch { expected, found } => {
                assert_eq!(expected, LIST_SENTINEL);
                assert_eq!(found, "<html>Not Found</html>");
            }
            other => panic!("unexpected error {:?}", other),
        }

        assert!(matches!(
            DeviceListing::parse(""),
            Err(SyncError::ProtocolMismatch { .. })
        ));
    }

    #[test]
    fn test_duplicate_names_reported_once() {
        let listing = DeviceListing::parse(
            "WLANSD_FILELIST\n/DCIM/100__TSB,A.JPG,1,32,0,0\n/DCIM/100__TSB,A.JPG,1,32,0,0\n",
        )
        .unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing.entries().len(), 2);
    }

    #[test]
    fn test_from_names_keeps_order() {
        let listing = DeviceListing::from_names(["B.JPG", "A.JPG"]);
        assert_eq!(listing.names(), ["B.JPG".to_string(), "A.JPG".to_string()]);
        assert!(listing.name_set().contains("A.JPG"));
    }
}
