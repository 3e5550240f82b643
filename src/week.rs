//! ISO 8601 week identity.
//!
//! A [`WeekId`] is an ISO week-year plus week number, displayed as
//! `YYYY-Www` (e.g. `2026-W04`). It is the single source of truth for
//! mapping dates to weeks; everything else derives from [`WeekId::from_date`]
//! so a stored week id and one recomputed from a date can never drift.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidDateError {
    #[error("Invalid date '{0}'. Expected YYYY-MM-DD")]
    BadDate(String),
    #[error("Invalid week id '{0}'. Expected YYYY-Www, e.g. 2026-W04")]
    BadWeekId(String),
}

/// Parse a `YYYY-MM-DD` date string. Malformed input is an error, never
/// coerced to today.
pub fn parse_date(raw: &str) -> Result<NaiveDate, InvalidDateError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| InvalidDateError::BadDate(raw.to_string()))
}

/// An ISO week: week-year plus week number (1-52 or 53).
///
/// Note the week-year is not the calendar year near year boundaries:
/// 2025-12-29 falls in `2026-W01`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WeekId {
    year: i32,
    week: u32,
}

impl WeekId {
    /// The week containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    /// The week containing the date string `YYYY-MM-DD`.
    pub fn of(raw: &str) -> Result<Self, InvalidDateError> {
        Ok(Self::from_date(parse_date(raw)?))
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn week(&self) -> u32 {
        self.week
    }

    /// Inclusive Monday start of the week.
    pub fn start_date(&self) -> NaiveDate {
        // Every WeekId is validated at construction.
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon)
            .expect("week id validated at construction")
    }

    /// Inclusive Sunday end of the week.
    pub fn end_date(&self) -> NaiveDate {
        self.start_date() + chrono::Duration::days(6)
    }

    /// The following week. Stepping by seven days and remapping handles
    /// 52/53-week years without special cases.
    pub fn next(&self) -> Self {
        Self::from_date(self.start_date() + chrono::Duration::days(7))
    }

    /// The preceding week.
    pub fn prev(&self) -> Self {
        Self::from_date(self.start_date() - chrono::Duration::days(7))
    }

    /// Whether `date` falls inside this week.
    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::from_date(date) == *self
    }

    /// Whether the date string `YYYY-MM-DD` falls inside this week.
    pub fn contains_str(&self, raw: &str) -> Result<bool, InvalidDateError> {
        Ok(self.contains(parse_date(raw)?))
    }

    /// Human-readable date range, e.g. "Jan 19 - Jan 25, 2026".
    pub fn format_range(&self) -> String {
        let start = self.start_date();
        let end = self.end_date();
        format!(
            "{} - {}, {}",
            start.format("%b %-d"),
            end.format("%b %-d"),
            end.year()
        )
    }
}

impl fmt::Display for WeekId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-W{:02}", self.year, self.week)
    }
}

impl FromStr for WeekId {
    type Err = InvalidDateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || InvalidDateError::BadWeekId(s.to_string());

        let (year_part, week_part) = s.split_once("-W").ok_or_else(bad)?;
        if year_part.len() != 4 || week_part.len() != 2 {
            return Err(bad());
        }
        let year: i32 = year_part.parse().map_err(|_| bad())?;
        let week: u32 = week_part.parse().map_err(|_| bad())?;

        // Rejects week 0, week 54+, and week 53 in 52-week years.
        if NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).is_none() {
            return Err(bad());
        }
        Ok(Self { year, week })
    }
}

impl Serialize for WeekId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WeekId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(DeError::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(raw: &str) -> NaiveDate {
        parse_date(raw).unwrap()
    }

    #[test]
    fn test_week_id_from_date() {
        let id = WeekId::from_date(date("2026-01-19"));
        assert_eq!(id.to_string(), "2026-W04");
    }

    #[test]
    fn test_same_week_every_day() {
        let id = WeekId::from_date(date("2026-01-19"));
        for day in 19..=25 {
            let d = NaiveDate::from_ymd_opt(2026, 1, day).unwrap();
            assert_eq!(WeekId::from_date(d), id);
        }
        assert_ne!(WeekId::from_date(date("2026-01-26")), id);
    }

    #[test]
    fn test_year_boundary_belongs_to_prior_week_year() {
        // Jan 1 2023 is a Sunday, still in 2022's last week.
        assert_eq!(WeekId::of("2023-01-01").unwrap().to_string(), "2022-W52");
    }

    #[test]
    fn test_year_boundary_belongs_to_next_week_year() {
        // Dec 29 2025 is a Monday, already in 2026's first week.
        assert_eq!(WeekId::of("2025-12-29").unwrap().to_string(), "2026-W01");
    }

    #[test]
    fn test_start_and_end_dates() {
        let id: WeekId = "2026-W04".parse().unwrap();
        assert_eq!(id.start_date(), date("2026-01-19"));
        assert_eq!(id.end_date(), date("2026-01-25"));
    }

    #[test]
    fn test_round_trip_through_start_date() {
        for raw in ["2026-W01", "2026-W04", "2022-W52", "2020-W53"] {
            let id: WeekId = raw.parse().unwrap();
            assert_eq!(WeekId::from_date(id.start_date()), id);
        }
    }

    #[test]
    fn test_adjacency() {
        let id: WeekId = "2026-W04".parse().unwrap();
        assert_eq!(id.next().to_string(), "2026-W05");
        assert_eq!(id.prev().to_string(), "2026-W03");
        assert_eq!(id.next().prev(), id);
    }

    #[test]
    fn test_adjacency_across_years() {
        let last: WeekId = "2020-W53".parse().unwrap();
        assert_eq!(last.next().to_string(), "2021-W01");
        let first: WeekId = "2026-W01".parse().unwrap();
        assert_eq!(first.prev().to_string(), "2025-W52");
    }

    #[test]
    fn test_parse_rejects_malformed_ids() {
        for raw in ["2026-W4", "2026-04", "26-W04", "2026-W00", "2026-W54", "garbage"] {
            assert!(raw.parse::<WeekId>().is_err(), "{} should be rejected", raw);
        }
    }

    #[test]
    fn test_week_53_only_in_long_years() {
        assert!("2020-W53".parse::<WeekId>().is_ok());
        assert!("2023-W53".parse::<WeekId>().is_err());
    }

    #[test]
    fn test_contains() {
        let id: WeekId = "2026-W04".parse().unwrap();
        assert!(id.contains(date("2026-01-19")));
        assert!(id.contains(date("2026-01-25")));
        assert!(!id.contains(date("2026-01-26")));
        assert!(id.contains_str("2026-01-21").unwrap());
        assert!(id.contains_str("not-a-date").is_err());
    }

    #[test]
    fn test_format_range() {
        let id: WeekId = "2026-W04".parse().unwrap();
        assert_eq!(id.format_range(), "Jan 19 - Jan 25, 2026");
    }

    #[test]
    fn test_bad_date_is_an_error() {
        assert_eq!(
            WeekId::of("01/19/2026"),
            Err(InvalidDateError::BadDate("01/19/2026".to_string()))
        );
    }

    #[test]
    fn test_serde_as_string() {
        let id: WeekId = "2026-W04".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"2026-W04\"");
        let back: WeekId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
