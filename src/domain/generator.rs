use crate::domain::models::{BlockSequence, ScheduleConfig, TimeBlock};
use crate::domain::time::{MINUTES_PER_DAY, TimeRange, normalize_day_end};

/// Lays out `[day_start, day_end)` as consecutive empty blocks of
/// `interval_minutes`. A trailing partial interval is dropped.
pub fn generate_time_blocks(interval_minutes: u16, day_start: u16, day_end: u16) -> BlockSequence {
    let day_end = normalize_day_end(day_end);
    if interval_minutes == 0
        || day_start >= MINUTES_PER_DAY
        || day_end > MINUTES_PER_DAY
        || day_end <= day_start
    {
        return BlockSequence::default();
    }

    let block_count = (day_end - day_start) / interval_minutes;
    let blocks = (0..block_count)
        .map(|index| {
            let start = day_start + index * interval_minutes;
            TimeBlock::empty(TimeRange {
                start,
                end: start + interval_minutes,
            })
        })
        .collect();
    BlockSequence::from_blocks_unchecked(blocks)
}

pub fn generate_for(config: &ScheduleConfig) -> BlockSequence {
    generate_time_blocks(config.interval_minutes, config.day_start, config.day_end)
}

pub(crate) fn whole_intervals(from: u16, to: u16, interval_minutes: u16) -> Vec<TimeBlock> {
    if interval_minutes == 0 || to <= from {
        return Vec::new();
    }
    generate_time_blocks(interval_minutes, from, to).into_blocks()
}

pub(crate) fn covering_intervals(from: u16, to: u16, interval_minutes: u16) -> Vec<TimeBlock> {
    if interval_minutes == 0 || to <= from {
        return Vec::new();
    }
    let mut blocks = Vec::new();
    let mut cursor = from;
    while cursor < to {
        let end = cursor.saturating_add(interval_minutes).min(to);
        blocks.push(TimeBlock::empty(TimeRange { start: cursor, end }));
        cursor = end;
    }
    blocks
}
