//! Broken-down calendar time.
//!
//! The time-sync collaborator hands the core a [`CalendarTime`]; the
//! logging gate turns it into the ISO-8601 timestamp and the per-day
//! partition key.  Conversion from Unix seconds uses the proleptic
//! Gregorian civil-from-days algorithm, so no libc or tz database is
//! involved.

use core::fmt;

/// Lowest year the FAT timestamp format can represent.
pub const MIN_PLAUSIBLE_YEAR: i32 = 1980;

/// Unix timestamp of 1980-01-01T00:00:00Z.
pub const FAT_EPOCH_UNIX_SECS: u64 = 315_532_800;

const SECS_PER_DAY: u64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CalendarTime {
    pub year: i32,
    /// 1–12
    pub month: u8,
    /// 1–31
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl CalendarTime {
    /// Convert seconds since the Unix epoch (UTC) to calendar time.
    pub fn from_unix_secs(secs: u64) -> Self {
        let days = (secs / SECS_PER_DAY) as i64;
        let rem = secs % SECS_PER_DAY;

        // civil_from_days, shifted so the era starts on 0000-03-01.
        let z = days + 719_468;
        let era = z.div_euclid(146_097);
        let doe = z.rem_euclid(146_097);
        let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
        let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
        let mp = (5 * doy + 2) / 153;
        let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
        let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
        let year = (yoe + era * 400 + i64::from(month <= 2)) as i32;

        Self {
            year,
            month,
            day,
            hour: (rem / 3600) as u8,
            minute: ((rem % 3600) / 60) as u8,
            second: (rem % 60) as u8,
        }
    }

    /// Whether the year is representable by the storage timestamp format.
    pub fn is_plausible(&self) -> bool {
        self.year >= MIN_PLAUSIBLE_YEAR
    }

    /// `YYYY-MM-DD` view used as the daily partition key.
    pub fn date(&self) -> DateKey {
        DateKey(*self)
    }
}

/// ISO-8601 without offset: `YYYY-MM-DDTHH:MM:SS`.
impl fmt::Display for CalendarTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Display adapter rendering only the date part.
#[derive(Debug, Clone, Copy)]
pub struct DateKey(CalendarTime);

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.0.year, self.0.month, self.0.day)
    }
}
