//! FAT32 packed timestamps
//!
//! The card stamps the next uploaded file with a time given as a FAT
//! date/time pair packed into one 32-bit value:
//!
//! ```text
//! bits 31-25  year - 1980
//! bits 24-21  month (1-12)
//! bits 20-16  day (1-31)
//! bits 15-11  hour (0-23)
//! bits 10-5   minute (0-59)
//! bits 4-0    second / 2
//! ```

use crate::error::{Result, SyncError};
use chrono::{Datelike, NaiveDateTime, Timelike};
use std::fmt;

const FAT_EPOCH_YEAR: i32 = 1980;
const FAT_MAX_YEAR: i32 = FAT_EPOCH_YEAR + 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fat32Timestamp(u32);

impl Fat32Timestamp {
    /// Pack a local wall-clock time.
    ///
    /// Seconds lose their low bit. Leap seconds are clamped to 59.
    pub fn from_datetime(local: &NaiveDateTime) -> Result<Self> {
        let year = local.year();
        if !(FAT_EPOCH_YEAR..=FAT_MAX_YEAR).contains(&year) {
            return Err(SyncError::TimestampOutOfRange { year });
        }

        let packed = ((year - FAT_EPOCH_YEAR) as u32) << 25
            | local.month() << 21
            | local.day() << 16
            | local.hour() << 11
            | local.minute() << 5
            | local.second().min(59) >> 1;

        Ok(Self(packed))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Wire form used by the `FTIME` parameter, e.g. `0x446F63D6`
    pub fn to_hex(self) -> String {
        format!("0x{:08X}", self.0)
    }
}

impl fmt::Display for Fat32Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}
