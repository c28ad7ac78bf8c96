//! # Canonical Device Names
//!
//! The card only holds 8.3 file names, so every desired file is given a
//! device name derived from its base file name: the first eight hex digits of
//! the SHA-1 digest, uppercased, plus a `.JPG` extension. Cards written by
//! earlier airframe releases use the same names, so their files are kept.
//!
//! The mapping ignores the directory, so `a/beach.jpg` and `b/beach.jpg` are
//! the same device file. Distinct base names collide only when their digest
//! prefixes do; collisions are not detected.

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;
use std::path::{Path, PathBuf};

/// Extension every device name carries
pub const DEVICE_EXTENSION: &str = "JPG";

/// Hex digits of the digest kept in a device name
const NAME_DIGITS: usize = 8;

/// A local photo the caller wants present on the device.
///
/// The file must exist when its upload is attempted; the reconciler only
/// reads it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DesiredFile(PathBuf);

impl DesiredFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Base file name used for naming; the whole path if it has none
    pub fn base_name(&self) -> String {
        base_name(&self.0)
    }

    pub fn device_name(&self) -> DeviceFileName {
        derive_device_name(&self.0)
    }
}

impl From<PathBuf> for DesiredFile {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

impl From<&str> for DesiredFile {
    fn from(path: &str) -> Self {
        Self(PathBuf::from(path))
    }
}

impl fmt::Display for DesiredFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Name of a file as stored on the card, e.g. `56CEEB90.JPG`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceFileName(String);

impl DeviceFileName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DeviceFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DeviceFileName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for DeviceFileName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for DeviceFileName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

fn base_name(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => path.to_string_lossy().into_owned(),
    }
}

/// Derive the device name for a local path.
///
/// Pure and total: depends only on the path's base file name.
pub fn derive_device_name(path: impl AsRef<Path>) -> DeviceFileName {
    let digest = Sha1::digest(base_name(path.as_ref()).as_bytes());
    let hex = hex::encode_upper(digest);
    DeviceFileName(format!("{}.{}", &hex[..NAME_DIGITS], DEVICE_EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_names() {
        assert_eq!(derive_device_name("a.jpg"), "56CEEB90.JPG");
        assert_eq!(derive_device_name("b.jpg"), "B365F52A.JPG");
        assert_eq!(
            derive_device_name(".airframe/11692277333.jpg"),
            "9FDD52AD.JPG"
        );
    }

    #[test]
    fn test_directory_is_ignored() {
        let a = derive_device_name("/home/ann/.airframe/5302.jpg");
        let b = derive_device_name("photos/5302.jpg");
        let c = derive_device_name("5302.jpg");
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(c, "6EA25475.JPG");
    }

    #[test]
    fn test_names_match_cards_written_by_earlier_releases() {
        // sha1("a.jpg") = 56ceeb90...
        assert_eq!(derive_device_name("photos/a.jpg"), "56CEEB90.JPG");
        assert_eq!(derive_device_name("/srv/frame/5302.jpg"), "6EA25475.JPG");
    }

    #[test]
    fn test_name_shape() {
        for input in ["x", "IMG_0001.JPG", "ünïcødé.jpeg", "with space.jpg"] {
            let name = derive_device_name(input);
            let text = name.as_str();
            assert_eq!(text.len(), 12);
            assert!(text.ends_with(".JPG"));
            assert!(text[..8]
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
        }
    }

    #[test]
    fn test_desired_file_accessors() {
        let file = DesiredFile::from("/tmp/photos/a.jpg");
        assert_eq!(file.base_name(), "a.jpg");
        assert_eq!(file.device_name(), derive_device_name("a.jpg"));
        assert_eq!(file.to_string(), "/tmp/photos/a.jpg");
    }

    #[test]
    fn test_path_without_file_name_uses_whole_path() {
        assert_eq!(DesiredFile::from("..").base_name(), "..");
        assert_eq!(DesiredFile::from("/").base_name(), "/");
    }
}
