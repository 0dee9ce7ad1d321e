use crate::domain::models::{PriorityTag, ScheduleError, validate_non_empty};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const NO_HIGHLIGHT: &str = "transparent";
pub const DEFAULT_NEW_PRIORITY_COLOR: &str = "#D3D3D3";
pub const PRIORITY_PALETTE: [&str; 7] = [
    "#D6B4FC", "#FF8184", "#FDAA48", "#FFFFC5", "#D1FFBD", "#90D5FF", "#D3D3D3",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityEntry {
    pub label: String,
    pub color: String,
}

impl PriorityEntry {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.label, "priority.label")?;
        validate_color(&self.color)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriorityRegistry {
    entries: BTreeMap<PriorityTag, PriorityEntry>,
}

impl Default for PriorityRegistry {
    fn default() -> Self {
        let entries = ["p1", "p2", "p3", "p4"]
            .into_iter()
            .zip(PRIORITY_PALETTE)
            .map(|(tag, color)| {
                (
                    PriorityTag::new(tag),
                    PriorityEntry {
                        label: tag.to_string(),
                        color: color.to_string(),
                    },
                )
            })
            .collect();
        Self { entries }
    }
}

impl PriorityRegistry {
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, tag: &PriorityTag) -> Option<&PriorityEntry> {
        self.entries.get(tag)
    }

    pub fn list(&self) -> Vec<(&PriorityTag, &PriorityEntry)> {
        let mut listed = self.entries.iter().collect::<Vec<_>>();
        listed.sort_by_key(|(tag, _)| (tag.as_str().len(), tag.as_str().to_string()));
        listed
    }

    pub fn add(&mut self) -> PriorityTag {
        let mut ordinal = self.entries.len() + 1;
        let tag = loop {
            let candidate = PriorityTag::new(format!("p{ordinal}"));
            if !self.entries.contains_key(&candidate) {
                break candidate;
            }
            ordinal += 1;
        };
        self.entries.insert(
            tag.clone(),
            PriorityEntry {
                label: tag.as_str().to_string(),
                color: DEFAULT_NEW_PRIORITY_COLOR.to_string(),
            },
        );
        tag
    }

    pub fn rename(&mut self, tag: &PriorityTag, label: &str) -> Result<(), ScheduleError> {
        validate_non_empty(label, "priority.label").map_err(ScheduleError::InvalidPriority)?;
        let entry = self.entry_mut(tag)?;
        entry.label = label.trim().to_string();
        Ok(())
    }

    pub fn recolor(&mut self, tag: &PriorityTag, color: &str) -> Result<(), ScheduleError> {
        validate_color(color).map_err(ScheduleError::InvalidPriority)?;
        let entry = self.entry_mut(tag)?;
        entry.color = color.trim().to_ascii_uppercase();
        Ok(())
    }

    pub fn remove(&mut self, tag: &PriorityTag) -> Result<PriorityEntry, ScheduleError> {
        self.entries
            .remove(tag)
            .ok_or_else(|| ScheduleError::UnknownPriority(tag.to_string()))
    }

    pub fn validate(&self) -> Result<(), String> {
        for (tag, entry) in &self.entries {
            if tag.is_none() {
                return Err(format!("priority tag '{}' is reserved", PriorityTag::NONE));
            }
            entry.validate()?;
        }
        Ok(())
    }

    fn entry_mut(&mut self, tag: &PriorityTag) -> Result<&mut PriorityEntry, ScheduleError> {
        self.entries
            .get_mut(tag)
            .ok_or_else(|| ScheduleError::UnknownPriority(tag.to_string()))
    }
}

/// Highlight colour for a block's priority. Unassigned, unknown and
/// deleted tags all render without highlight.
pub fn color_for<'a>(tag: &PriorityTag, registry: &'a PriorityRegistry) -> &'a str {
    if tag.is_none() {
        return NO_HIGHLIGHT;
    }
    registry
        .get(tag)
        .map(|entry| entry.color.as_str())
        .unwrap_or(NO_HIGHLIGHT)
}

fn validate_color(value: &str) -> Result<(), String> {
    let value = value.trim();
    let Some(hex) = value.strip_prefix('#') else {
        return Err(format!("color '{value}' must be #RRGGBB"));
    };
    if hex.len() != 6 || !hex.chars().all(|character| character.is_ascii_hexdigit()) {
        return Err(format!("color '{value}' must be #RRGGBB"));
    }
    Ok(())
}
