use crate::domain::models::{
    DEFAULT_DAY_END, DEFAULT_DAY_START, DEFAULT_INTERVAL_MINUTES, ScheduleConfig,
};
use crate::domain::time::{format_hhmm, parse_hhmm};
use crate::infrastructure::error::InfraError;
use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const SCHEDULE_JSON: &str = "schedule.json";
const TRANSITIONS_JSON: &str = "transitions.json";
const DEFAULT_TIMEZONE: &str = "UTC";
const DEFAULT_PROMOTE_AT: &str = "00:01";
const DEFAULT_ROUTINE_AT: &str = "00:02";

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigBundle {
    pub app: serde_json::Value,
    pub schedule: serde_json::Value,
    pub transitions: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionConfig {
    pub promote_at: NaiveTime,
    pub routine_at: NaiveTime,
    pub catch_up_on_start: bool,
    pub overwrite_tomorrow: bool,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            promote_at: NaiveTime::from_hms_opt(0, 1, 0).unwrap_or(NaiveTime::MIN),
            routine_at: NaiveTime::from_hms_opt(0, 2, 0).unwrap_or(NaiveTime::MIN),
            catch_up_on_start: true,
            overwrite_tomorrow: true,
        }
    }
}

fn default_files() -> HashMap<&'static str, serde_json::Value> {
    HashMap::from([
        (
            APP_JSON,
            serde_json::json!({
                "schema": 1,
                "timezone": DEFAULT_TIMEZONE
            }),
        ),
        (
            SCHEDULE_JSON,
            serde_json::json!({
                "schema": 1,
                "intervalMinutes": DEFAULT_INTERVAL_MINUTES,
                "dayStart": format_hhmm(DEFAULT_DAY_START),
                "dayEnd": format_hhmm(DEFAULT_DAY_END)
            }),
        ),
        (
            TRANSITIONS_JSON,
            serde_json::json!({
                "schema": 1,
                "promoteAt": DEFAULT_PROMOTE_AT,
                "routineAt": DEFAULT_ROUTINE_AT,
                "catchUpOnStart": true,
                "overwriteTomorrow": true
            }),
        ),
    ])
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    for (name, value) in default_files() {
        let path = config_dir.join(name);
        if !path.exists() {
            write_config(&path, &value)?;
        }
    }
    Ok(())
}

fn write_config(path: &Path, value: &serde_json::Value) -> Result<(), InfraError> {
    let formatted = serde_json::to_string_pretty(value)?;
    fs::write(path, format!("{formatted}\n"))?;
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_configs(config_dir: &Path) -> Result<ConfigBundle, InfraError> {
    Ok(ConfigBundle {
        app: read_config(&config_dir.join(APP_JSON))?,
        schedule: read_config(&config_dir.join(SCHEDULE_JSON))?,
        transitions: read_config(&config_dir.join(TRANSITIONS_JSON))?,
    })
}

fn read_str<'a>(value: &'a serde_json::Value, field: &str) -> Option<&'a str> {
    value
        .get(field)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn read_bool(value: &serde_json::Value, field: &str, default: bool) -> bool {
    value
        .get(field)
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(default)
}

fn read_minute(value: &serde_json::Value, field: &str, default: u16) -> Result<u16, InfraError> {
    match read_str(value, field) {
        Some(raw) => parse_hhmm(raw)
            .ok_or_else(|| InfraError::InvalidConfig(format!("{field} `{raw}` must be HH:MM"))),
        None => Ok(default),
    }
}

fn read_trigger(value: &serde_json::Value, field: &str, default: &str) -> Result<NaiveTime, InfraError> {
    let raw = read_str(value, field).unwrap_or(default);
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map_err(|error| InfraError::InvalidConfig(format!("{field} `{raw}`: {error}")))
}

pub fn read_timezone(config_dir: &Path) -> Result<Tz, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    let name = read_str(&app, "timezone").unwrap_or(DEFAULT_TIMEZONE);
    name.parse::<Tz>()
        .map_err(|_| InfraError::InvalidConfig(format!("unknown timezone `{name}`")))
}

pub fn load_schedule_config(config_dir: &Path) -> Result<ScheduleConfig, InfraError> {
    let schedule = read_config(&config_dir.join(SCHEDULE_JSON))?;
    let interval = match schedule.get("intervalMinutes") {
        None | Some(serde_json::Value::Null) => DEFAULT_INTERVAL_MINUTES,
        Some(raw) => raw
            .as_u64()
            .and_then(|value| u16::try_from(value).ok())
            .ok_or_else(|| {
                InfraError::InvalidConfig(format!("intervalMinutes must be a positive integer, got {raw}"))
            })?,
    };
    let day_start = read_minute(&schedule, "dayStart", DEFAULT_DAY_START)?;
    let day_end = read_minute(&schedule, "dayEnd", DEFAULT_DAY_END)?;
    Ok(ScheduleConfig::new(interval, day_start, day_end)?)
}

pub fn save_schedule_config(config_dir: &Path, config: &ScheduleConfig) -> Result<(), InfraError> {
    config.validate()?;
    let path = config_dir.join(SCHEDULE_JSON);
    let mut schedule = read_config(&path)?;
    let object = schedule.as_object_mut().ok_or_else(|| {
        InfraError::InvalidConfig(format!("invalid object structure in {}", path.display()))
    })?;
    object.insert(
        "intervalMinutes".to_string(),
        serde_json::Value::from(config.interval_minutes),
    );
    object.insert(
        "dayStart".to_string(),
        serde_json::Value::String(format_hhmm(config.day_start)),
    );
    object.insert(
        "dayEnd".to_string(),
        serde_json::Value::String(format_hhmm(config.day_end)),
    );
    write_config(&path, &schedule)
}

pub fn load_transition_config(config_dir: &Path) -> Result<TransitionConfig, InfraError> {
    let transitions = read_config(&config_dir.join(TRANSITIONS_JSON))?;
    let defaults = TransitionConfig::default();
    Ok(TransitionConfig {
        promote_at: read_trigger(&transitions, "promoteAt", DEFAULT_PROMOTE_AT)?,
        routine_at: read_trigger(&transitions, "routineAt", DEFAULT_ROUTINE_AT)?,
        catch_up_on_start: read_bool(&transitions, "catchUpOnStart", defaults.catch_up_on_start),
        overwrite_tomorrow: read_bool(
            &transitions,
            "overwriteTomorrow",
            defaults.overwrite_tomorrow,
        ),
    })
}
