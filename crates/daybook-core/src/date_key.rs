//! Calendar-day keys
//!
//! An entry is keyed by the local calendar day it was written for, stored as
//! a fixed `YYYY-MM-DD` string. The string is computed once from local
//! wall-clock time and then used verbatim; it is never turned back into an
//! instant, so a timezone change cannot move an entry to a different day.

use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::storage::StorageError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse `value` only if it is exactly how chrono formats that day
///
/// chrono skips padding spaces and accepts signed years, so `2026-01- 1` and
/// `+026-01-01` parse; formatting the result back rejects them.
fn canonical_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .ok()
        .filter(|date| date.format(DATE_FORMAT).to_string() == value)
}

/// A validated `YYYY-MM-DD` entry key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntryDate(String);

impl EntryDate {
    /// Parse and validate a date key
    pub fn parse(value: &str) -> Result<Self, StorageError> {
        match canonical_date(value) {
            Some(_) => Ok(Self(value.to_string())),
            None => Err(StorageError::invalid("entry date", value, "YYYY-MM-DD")),
        }
    }

    /// Today's key according to the local wall clock
    pub fn today() -> Self {
        Self::from_naive(Local::now().date_naive())
    }

    /// Build a key from a calendar date
    pub fn from_naive(date: NaiveDate) -> Self {
        Self(date.format(DATE_FORMAT).to_string())
    }

    /// The key as stored
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The month this day belongs to
    pub fn month(&self) -> Month {
        Month(self.0[..7].to_string())
    }

    /// Calendar date for arithmetic (streaks); never used as a storage key
    pub fn to_naive(&self) -> NaiveDate {
        // Validated on construction.
        NaiveDate::parse_from_str(&self.0, DATE_FORMAT).unwrap_or(NaiveDate::MIN)
    }
}

impl fmt::Display for EntryDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntryDate {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EntryDate {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EntryDate> for String {
    fn from(date: EntryDate) -> Self {
        date.0
    }
}

/// A validated `YYYY-MM` month used for range listing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Month(String);

impl Month {
    /// Parse and validate a month key
    pub fn parse(value: &str) -> Result<Self, StorageError> {
        match canonical_date(&format!("{value}-01")) {
            Some(_) if value.len() == 7 => Ok(Self(value.to_string())),
            _ => Err(StorageError::invalid("month", value, "YYYY-MM")),
        }
    }

    /// The current month according to the local wall clock
    pub fn current() -> Self {
        EntryDate::today().month()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First and last day keys, inclusive
    ///
    /// Used for an index-friendly `BETWEEN` range instead of a `LIKE` prefix.
    pub fn bounds(&self) -> (String, String) {
        (format!("{}-01", self.0), format!("{}-31", self.0))
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Month {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_date() {
        let date = EntryDate::parse("2026-01-01").unwrap();
        assert_eq!(date.as_str(), "2026-01-01");
        assert_eq!(date.to_string(), "2026-01-01");
        assert_eq!(date.month().as_str(), "2026-01");
    }

    #[test]
    fn test_parse_rejects_malformed_dates() {
        for bad in [
            "",
            "2026-1-1",
            "2026-02-30",
            "2026-13-01",
            "01/01/2026",
            "2026-01-01T00:00:00Z",
            "2026-01-01 ",
            "2026- 1-01",
            "2026-01- 1",
            " 026-01-01",
            "+026-01-01",
            "0226-1-001",
        ] {
            let err = EntryDate::parse(bad).unwrap_err();
            assert!(
                matches!(err, StorageError::Validation { .. }),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_leap_day() {
        assert!(EntryDate::parse("2028-02-29").is_ok());
        assert!(EntryDate::parse("2026-02-29").is_err());
    }

    #[test]
    fn test_today_round_trips() {
        let today = EntryDate::today();
        assert_eq!(EntryDate::parse(today.as_str()).unwrap(), today);
    }

    #[test]
    fn test_serde_validates() {
        let date: EntryDate = serde_json::from_str("\"2026-03-04\"").unwrap();
        assert_eq!(date.as_str(), "2026-03-04");
        assert_eq!(serde_json::to_string(&date).unwrap(), "\"2026-03-04\"");

        assert!(serde_json::from_str::<EntryDate>("\"2026-3-4\"").is_err());
    }

    #[test]
    fn test_month() {
        let month = Month::parse("2026-02").unwrap();
        assert_eq!(
            month.bounds(),
            ("2026-02-01".to_string(), "2026-02-31".to_string())
        );

        assert!(Month::parse("2026-2").is_err());
        assert!(Month::parse("2026-00").is_err());
        assert!(Month::parse("2026-02-01").is_err());
        assert!(Month::parse("2026- 1").is_err());
        assert!(Month::parse("+026-01").is_err());
        assert!(Month::parse(" 026-01").is_err());
    }

    #[test]
    fn test_ordering_matches_calendar() {
        let mut dates = vec![
            EntryDate::parse("2026-10-02").unwrap(),
            EntryDate::parse("2025-12-31").unwrap(),
            EntryDate::parse("2026-01-15").unwrap(),
        ];
        dates.sort();
        let keys: Vec<&str> = dates.iter().map(|d| d.as_str()).collect();
        assert_eq!(keys, vec!["2025-12-31", "2026-01-15", "2026-10-02"]);
    }
}
