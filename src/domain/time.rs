use crate::domain::models::ScheduleError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Half-open `[start, end)` range of minutes since midnight. `end` may be
/// 1440, which is rendered as `00:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeRange {
    pub start: u16,
    pub end: u16,
}

impl TimeRange {
    pub fn new(start: u16, end: u16) -> Result<Self, ScheduleError> {
        if end > MINUTES_PER_DAY {
            return Err(ScheduleError::InvalidRange(format!(
                "end minute {end} is past midnight"
            )));
        }
        if end <= start {
            return Err(ScheduleError::InvalidRange(format!(
                "{}-{} does not have a positive duration",
                format_hhmm(start),
                format_hhmm(end)
            )));
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> u16 {
        self.end - self.start
    }

    pub fn contains(&self, minute: u16) -> bool {
        minute >= self.start && minute < self.end
    }

    pub fn within(&self, outer: &TimeRange) -> bool {
        self.start >= outer.start && self.end <= outer.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", format_hhmm(self.start), format_hhmm(self.end))
    }
}

impl FromStr for TimeRange {
    type Err = ScheduleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ScheduleError::InvalidRange(format!("'{value}' must be HH:MM-HH:MM"));
        let (start, end) = value.trim().split_once('-').ok_or_else(invalid)?;
        let start = parse_hhmm(start).ok_or_else(invalid)?;
        let end = parse_hhmm(end).map(normalize_day_end).ok_or_else(invalid)?;
        TimeRange::new(start, end)
    }
}

impl Serialize for TimeRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Parses `H:MM` or `HH:MM` into minutes since midnight. `24:00` is
/// accepted as end of day.
pub fn parse_hhmm(value: &str) -> Option<u16> {
    let (hour, minute) = value.trim().split_once(':')?;
    if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
        return None;
    }
    let hour = hour.parse::<u16>().ok()?;
    let minute = minute.parse::<u16>().ok()?;
    if minute > 59 {
        return None;
    }
    match hour {
        0..=23 => Some(hour * 60 + minute),
        24 if minute == 0 => Some(MINUTES_PER_DAY),
        _ => None,
    }
}

pub fn format_hhmm(minute: u16) -> String {
    let minute = minute % MINUTES_PER_DAY;
    format!("{:02}:{:02}", minute / 60, minute % 60)
}

pub fn normalize_day_end(minute: u16) -> u16 {
    if minute == 0 { MINUTES_PER_DAY } else { minute }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hhmm_accepts_single_digit_hours() {
        assert_eq!(parse_hhmm("6:00"), Some(360));
        assert_eq!(parse_hhmm("06:00"), Some(360));
        assert_eq!(parse_hhmm("23:59"), Some(1439));
        assert_eq!(parse_hhmm("24:00"), Some(1440));
    }

    #[test]
    fn parse_hhmm_rejects_malformed_values() {
        for value in ["", "6", "6:0", "25:00", "12:60", "24:01", "ab:cd", "123:00"] {
            assert_eq!(parse_hhmm(value), None, "{value}");
        }
    }

    #[test]
    fn midnight_end_formats_as_zero() {
        let range = TimeRange::new(1425, MINUTES_PER_DAY).expect("valid range");
        assert_eq!(range.to_string(), "23:45-00:00");
        assert_eq!("23:45-00:00".parse::<TimeRange>().expect("parse"), range);
    }

    #[test]
    fn range_requires_positive_duration() {
        assert!(TimeRange::new(600, 600).is_err());
        assert!(TimeRange::new(600, 540).is_err());
        assert!("10:00-09:00".parse::<TimeRange>().is_err());
    }

    #[test]
    fn contains_is_half_open() {
        let range = TimeRange::new(360, 375).expect("valid range");
        assert!(range.contains(360));
        assert!(range.contains(374));
        assert!(!range.contains(375));
    }

    #[test]
    fn serde_uses_text_form() {
        let range = TimeRange::new(360, 375).expect("valid range");
        let json = serde_json::to_string(&range).expect("serialize");
        assert_eq!(json, "\"06:00-06:15\"");
        let back: TimeRange = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, range);
    }
}
