use crate::domain::generator::{covering_intervals, generate_for, whole_intervals};
use crate::domain::models::{BlockSequence, ScheduleConfig, ScheduleError, TimeBlock};

pub fn adjust_boundaries(
    sequence: &BlockSequence,
    interval_minutes: u16,
    new_day_start: u16,
    new_day_end: u16,
) -> Result<BlockSequence, ScheduleError> {
    let config = ScheduleConfig::new(interval_minutes, new_day_start, new_day_end)?;
    let window = config.day_range();

    let survivors = sequence
        .iter()
        .filter(|block| block.range.within(&window))
        .cloned()
        .collect::<Vec<_>>();
    let (Some(first), Some(last)) = (survivors.first(), survivors.last()) else {
        return Ok(generate_for(&config));
    };

    let mut blocks: Vec<TimeBlock> = covering_intervals(window.start, first.start(), interval_minutes);
    let tail = whole_intervals(last.end(), window.end, interval_minutes);
    blocks.extend(survivors);
    blocks.extend(tail);
    blocks.sort_by_key(TimeBlock::start);
    Ok(BlockSequence::from_blocks_unchecked(blocks))
}

pub fn apply_schedule_change(
    sequence: &BlockSequence,
    current: &ScheduleConfig,
    next: &ScheduleConfig,
) -> Result<BlockSequence, ScheduleError> {
    next.validate()?;
    if next.interval_minutes != current.interval_minutes {
        return Ok(generate_for(next));
    }
    adjust_boundaries(sequence, next.interval_minutes, next.day_start, next.day_end)
}

pub fn discarded_by_change(
    sequence: &BlockSequence,
    current: &ScheduleConfig,
    next: &ScheduleConfig,
) -> Vec<usize> {
    let window = next.day_range();
    let regenerates = next.interval_minutes != current.interval_minutes;
    sequence
        .iter()
        .enumerate()
        .filter(|(_, block)| block.has_content())
        .filter(|(_, block)| regenerates || !block.range.within(&window))
        .map(|(index, _)| index)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::generator::generate_time_blocks;
    use crate::domain::models::BlockContent;
    use crate::domain::mutation::{Selection, assign_block, merge_blocks};
    use proptest::prelude::*;

    fn day_with_work() -> BlockSequence {
        let day = generate_time_blocks(15, 360, 1380);
        let day = assign_block(&day, "0", BlockContent::new("Run", "", "p3")).expect("assign");
        assign_block(&day, "10", BlockContent::new("Write", "draft", "p1")).expect("assign")
    }

    #[test]
    fn shrinking_start_drops_early_blocks() {
        let day = day_with_work();
        let adjusted = adjust_boundaries(&day, 15, 480, 1380).expect("adjust");

        assert_eq!(adjusted.len(), 60);
        assert_eq!(adjusted.get(0).expect("first").range.to_string(), "08:00-08:15");
        assert!(adjusted.iter().all(|block| block.start() >= 480));
        assert_eq!(adjusted.assigned_count(), 1);
        assert_eq!(adjusted.get(2).expect("kept block").content.title, "Write");
        assert!(adjusted.validate().is_ok());
    }

    #[test]
    fn extending_start_prepends_empty_blocks_and_keeps_content() {
        let day = day_with_work();
        let adjusted = adjust_boundaries(&day, 15, 300, 1380).expect("adjust");

        assert_eq!(adjusted.len(), day.len() + 4);
        assert_eq!(adjusted.get(0).expect("first").range.to_string(), "05:00-05:15");
        assert!(adjusted.blocks()[..4].iter().all(|block| !block.has_content()));
        assert_eq!(adjusted.get(4).expect("old first").content.title, "Run");
        assert_eq!(adjusted.get(14).expect("old tenth").content.title, "Write");
    }

    #[test]
    fn unaligned_start_shortens_the_joining_block() {
        let day = generate_time_blocks(15, 360, 1380);
        let adjusted = adjust_boundaries(&day, 15, 340, 1380).expect("adjust");
        let heads: Vec<String> = adjusted.blocks()[..3]
            .iter()
            .map(|block| block.range.to_string())
            .collect();
        assert_eq!(heads, ["05:40-05:55", "05:55-06:00", "06:00-06:15"]);
        assert!(adjusted.validate().is_ok());
    }

    #[test]
    fn tail_changes_append_or_drop_blocks() {
        let day = day_with_work();
        let longer = adjust_boundaries(&day, 15, 360, 0).expect("extend to midnight");
        assert_eq!(longer.len(), 72);
        assert_eq!(longer.get(71).expect("last").range.to_string(), "23:45-00:00");

        let shorter = adjust_boundaries(&day, 15, 360, 1200).expect("shrink");
        assert_eq!(shorter.len(), 56);
        assert_eq!(shorter.span().expect("span").end, 1200);
        assert_eq!(shorter.assigned_count(), 2);
    }

    #[test]
    fn straddling_block_is_dropped_and_gap_refilled() {
        let day = generate_time_blocks(15, 360, 1380);
        let day = merge_blocks(&day, &Selection::spanning(0, 3)).expect("merge first hour");
        let day = assign_block(&day, "0", BlockContent::new("Long run", "", "p2")).expect("assign");

        let adjusted = adjust_boundaries(&day, 15, 390, 1380).expect("adjust");
        assert_eq!(adjusted.get(0).expect("first").range.to_string(), "06:30-06:45");
        assert_eq!(adjusted.assigned_count(), 0);
        assert!(adjusted.validate().is_ok());
    }

    #[test]
    fn disjoint_window_regenerates() {
        let day = generate_time_blocks(15, 360, 600);
        let adjusted = adjust_boundaries(&day, 15, 720, 780).expect("adjust");
        assert_eq!(adjusted, generate_time_blocks(15, 720, 780));
    }

    #[test]
    fn invalid_boundaries_are_rejected() {
        let day = generate_time_blocks(15, 360, 1380);
        assert!(adjust_boundaries(&day, 15, 600, 600).is_err());
        assert!(adjust_boundaries(&day, 0, 360, 1380).is_err());
    }

    #[test]
    fn interval_change_regenerates_and_reports_all_content() {
        let day = day_with_work();
        let current = ScheduleConfig::default();
        let next = ScheduleConfig::new(30, 360, 1380).expect("config");

        assert_eq!(discarded_by_change(&day, &current, &next), vec![0, 10]);
        let changed = apply_schedule_change(&day, &current, &next).expect("change");
        assert_eq!(changed, generate_time_blocks(30, 360, 1380));
    }

    #[test]
    fn boundary_change_reports_only_dropped_content() {
        let day = day_with_work();
        let current = ScheduleConfig::default();
        let next = ScheduleConfig::new(15, 420, 1380).expect("config");

        assert_eq!(discarded_by_change(&day, &current, &next), vec![0]);
        let changed = apply_schedule_change(&day, &current, &next).expect("change");
        assert_eq!(changed.get(6).expect("kept").content.title, "Write");
    }

    // Feature: timeblock, adjusting to the current boundaries is a no-op
    proptest! {
        #[test]
        fn adjust_with_current_boundaries_is_identity(
            interval in prop::sample::select(vec![10u16, 15, 20, 30, 60]),
            start_hour in 0u16..12u16,
            hours in 1u16..12u16,
        ) {
            let start = start_hour * 60;
            let day = generate_time_blocks(interval, start, start + hours * 60);
            let day = assign_block(&day, "0", BlockContent::new("Keep", "", "p1")).expect("assign");
            let span = day.span().expect("span");
            let adjusted = adjust_boundaries(&day, interval, span.start, span.end).expect("adjust");
            prop_assert_eq!(adjusted, day);
        }

        #[test]
        fn adjust_output_is_contiguous_and_anchored(
            new_start in 0u16..720u16,
            new_length in 60u16..720u16,
        ) {
            let day = generate_time_blocks(15, 360, 1380);
            let new_end = new_start + new_length;
            let adjusted = adjust_boundaries(&day, 15, new_start, new_end).expect("adjust");
            prop_assert!(adjusted.validate().is_ok());
            let span = adjusted.span().expect("span");
            prop_assert_eq!(span.start, new_start);
            prop_assert!(span.end <= new_end);
            prop_assert!(new_end - span.end < 15);
        }
    }
}
