use crate::domain::time::{MINUTES_PER_DAY, TimeRange, format_hhmm, normalize_day_end};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const DEFAULT_INTERVAL_MINUTES: u16 = 15;
pub const DEFAULT_DAY_START: u16 = 6 * 60;
pub const DEFAULT_DAY_END: u16 = 23 * 60;

pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("invalid time range: {0}")]
    InvalidRange(String),
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),
    #[error("block not found: {0}")]
    BlockNotFound(String),
    #[error("invalid selection: {0}")]
    InvalidSelection(String),
    #[error("block {0} cannot be split any further")]
    Indivisible(String),
    #[error("unknown priority: {0}")]
    UnknownPriority(String),
    #[error("invalid priority: {0}")]
    InvalidPriority(String),
    #[error("unknown document: {0}")]
    UnknownDocument(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriorityTag(String);

impl PriorityTag {
    pub const NONE: &'static str = "none";

    pub fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            Self::none()
        } else {
            Self(trimmed.to_string())
        }
    }

    pub fn none() -> Self {
        Self(Self::NONE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_none(&self) -> bool {
        self.0 == Self::NONE
    }
}

impl Default for PriorityTag {
    fn default() -> Self {
        Self::none()
    }
}

impl From<&str> for PriorityTag {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for PriorityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContent {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: PriorityTag,
}

impl BlockContent {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        priority: impl Into<PriorityTag>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            priority: priority.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty() && self.description.trim().is_empty() && self.priority.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeBlock {
    pub range: TimeRange,
    pub content: BlockContent,
}

impl TimeBlock {
    pub fn empty(range: TimeRange) -> Self {
        Self {
            range,
            content: BlockContent::default(),
        }
    }

    pub fn start(&self) -> u16 {
        self.range.start
    }

    pub fn end(&self) -> u16 {
        self.range.end
    }

    pub fn duration(&self) -> u16 {
        self.range.duration()
    }

    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentBlock {
    pub id: String,
    pub index: usize,
    pub fraction: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockSequence {
    blocks: Vec<TimeBlock>,
}

impl BlockSequence {
    pub fn from_blocks(blocks: Vec<TimeBlock>) -> Result<Self, ScheduleError> {
        let sequence = Self { blocks };
        sequence.validate()?;
        Ok(sequence)
    }

    pub(crate) fn from_blocks_unchecked(blocks: Vec<TimeBlock>) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &[TimeBlock] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<TimeBlock> {
        self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TimeBlock> {
        self.blocks.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut TimeBlock> {
        self.blocks.get_mut(index)
    }

    pub(crate) fn blocks_mut(&mut self) -> &mut [TimeBlock] {
        &mut self.blocks
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeBlock> {
        self.blocks.iter()
    }

    pub fn position_of(&self, id: &str) -> Option<usize> {
        id.trim()
            .parse::<usize>()
            .ok()
            .filter(|index| *index < self.blocks.len())
    }

    pub fn require_position(&self, id: &str) -> Result<usize, ScheduleError> {
        self.position_of(id)
            .ok_or_else(|| ScheduleError::BlockNotFound(id.trim().to_string()))
    }

    pub fn span(&self) -> Option<TimeRange> {
        let first = self.blocks.first()?;
        let last = self.blocks.last()?;
        Some(TimeRange {
            start: first.start(),
            end: last.end(),
        })
    }

    pub fn assigned_count(&self) -> usize {
        self.blocks.iter().filter(|block| block.has_content()).count()
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        for pair in self.blocks.windows(2) {
            if pair[0].end() != pair[1].start() {
                return Err(ScheduleError::InvalidRange(format!(
                    "blocks {} and {} are not contiguous",
                    pair[0].range, pair[1].range
                )));
            }
        }
        Ok(())
    }

    pub fn locate(&self, minute: u16) -> Option<CurrentBlock> {
        let index = self
            .blocks
            .iter()
            .position(|block| block.range.contains(minute))?;
        let block = &self.blocks[index];
        Some(CurrentBlock {
            id: block_id(index),
            index,
            fraction: f64::from(minute - block.start()) / f64::from(block.duration()),
        })
    }
}

pub fn block_id(index: usize) -> String {
    index.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub interval_minutes: u16,
    pub day_start: u16,
    pub day_end: u16,
}

impl ScheduleConfig {
    pub fn new(interval_minutes: u16, day_start: u16, day_end: u16) -> Result<Self, ScheduleError> {
        let config = Self {
            interval_minutes,
            day_start,
            day_end: normalize_day_end(day_end),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.interval_minutes == 0 {
            return Err(ScheduleError::InvalidSchedule(
                "interval_minutes must be > 0".to_string(),
            ));
        }
        if self.day_start >= MINUTES_PER_DAY {
            return Err(ScheduleError::InvalidSchedule(
                "day_start must be before midnight".to_string(),
            ));
        }
        if self.day_end > MINUTES_PER_DAY || self.day_end <= self.day_start {
            return Err(ScheduleError::InvalidSchedule(format!(
                "day_end {} must be after day_start {}",
                format_hhmm(self.day_end),
                format_hhmm(self.day_start)
            )));
        }
        if self.interval_minutes > self.day_end - self.day_start {
            return Err(ScheduleError::InvalidSchedule(
                "interval_minutes must fit inside the day".to_string(),
            ));
        }
        Ok(())
    }

    pub fn day_range(&self) -> TimeRange {
        TimeRange {
            start: self.day_start,
            end: self.day_end,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            day_start: DEFAULT_DAY_START,
            day_end: DEFAULT_DAY_END,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Document {
    Today,
    Tomorrow,
    Routine(Weekday),
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Today => f.write_str("today"),
            Self::Tomorrow => f.write_str("tomorrow"),
            Self::Routine(weekday) => write!(f, "routine:{}", weekday_name(*weekday)),
        }
    }
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub fn parse_weekday(value: &str) -> Option<Weekday> {
    match value.trim().to_ascii_lowercase().as_str() {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Accepts the `Display` form (`today`, `tomorrow`, `routine:Friday`) and
/// the store key form (`routineFriday`).
pub fn parse_document(value: &str) -> Option<Document> {
    let value = value.trim();
    match value.to_ascii_lowercase().as_str() {
        "today" | "todaytasks" => return Some(Document::Today),
        "tomorrow" | "tomorrowtasks" => return Some(Document::Tomorrow),
        _ => {}
    }
    let lower = value.to_ascii_lowercase();
    let weekday = if lower.starts_with("routine:") {
        &value["routine:".len()..]
    } else if lower.starts_with("routine") {
        &value["routine".len()..]
    } else {
        return None;
    };
    parse_weekday(weekday).map(Document::Routine)
}

pub(crate) fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}
