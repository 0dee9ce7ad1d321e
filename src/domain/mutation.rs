use crate::domain::models::{BlockContent, BlockSequence, ScheduleError, TimeBlock, block_id};
use crate::domain::time::TimeRange;
use std::ops::RangeInclusive;

pub const SPLIT_GRANULARITY_MINUTES: u16 = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    bounds: Option<(usize, usize)>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(index: usize) -> Self {
        Self {
            bounds: Some((index, index)),
        }
    }

    pub fn spanning(first: usize, last: usize) -> Self {
        Self {
            bounds: Some((first.min(last), first.max(last))),
        }
    }

    /// Pressing past either end extends the run to the pressed block;
    /// pressing inside shrinks it to end at the pressed block.
    pub fn press(&mut self, index: usize) {
        self.bounds = Some(match self.bounds {
            None => (index, index),
            Some((first, last)) if index > last => (first, index),
            Some((first, last)) if index < first => (index, last),
            Some((first, _)) => (first, index),
        });
    }

    pub fn clear(&mut self) {
        self.bounds = None;
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_none()
    }

    pub fn len(&self) -> usize {
        self.bounds.map_or(0, |(first, last)| last - first + 1)
    }

    pub fn first(&self) -> Option<usize> {
        self.bounds.map(|(first, _)| first)
    }

    pub fn last(&self) -> Option<usize> {
        self.bounds.map(|(_, last)| last)
    }

    pub fn indices(&self) -> Option<RangeInclusive<usize>> {
        self.bounds.map(|(first, last)| first..=last)
    }

    pub fn ids(&self) -> Vec<String> {
        self.indices()
            .map(|range| range.map(block_id).collect())
            .unwrap_or_default()
    }

    pub fn from_ids<S: AsRef<str>>(
        sequence: &BlockSequence,
        ids: &[S],
    ) -> Result<Self, ScheduleError> {
        let mut positions = ids
            .iter()
            .map(|id| sequence.require_position(id.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        positions.sort_unstable();
        let (Some(&first), Some(&last)) = (positions.first(), positions.last()) else {
            return Ok(Self::new());
        };
        let is_contiguous = positions
            .windows(2)
            .all(|pair| pair[1] == pair[0] + 1);
        if !is_contiguous {
            return Err(ScheduleError::InvalidSelection(format!(
                "blocks {} are not a contiguous run",
                positions
                    .iter()
                    .map(|position| block_id(*position))
                    .collect::<Vec<_>>()
                    .join(",")
            )));
        }
        Ok(Self::spanning(first, last))
    }
}

pub fn split_piece_minutes(duration: u16, interval_minutes: u16) -> u16 {
    if interval_minutes > 0 && duration != interval_minutes && duration % interval_minutes == 0 {
        interval_minutes
    } else {
        SPLIT_GRANULARITY_MINUTES
    }
}

/// Replaces one block with empty sub-blocks covering the same span. The
/// last sub-block absorbs any minutes that do not fill a whole piece.
pub fn split_block(
    sequence: &BlockSequence,
    block_id: &str,
    interval_minutes: u16,
) -> Result<BlockSequence, ScheduleError> {
    let index = sequence.require_position(block_id)?;
    let target = &sequence.blocks()[index];
    let piece = split_piece_minutes(target.duration(), interval_minutes);
    let piece_count = target.duration() / piece;
    if piece_count < 2 {
        return Err(ScheduleError::Indivisible(block_id.trim().to_string()));
    }

    let sub_blocks = (0..piece_count).map(|piece_index| {
        let start = target.start() + piece_index * piece;
        let end = if piece_index + 1 == piece_count {
            target.end()
        } else {
            start + piece
        };
        TimeBlock::empty(TimeRange { start, end })
    });

    let blocks = sequence.blocks();
    let mut updated = Vec::with_capacity(blocks.len() + usize::from(piece_count) - 1);
    updated.extend_from_slice(&blocks[..index]);
    updated.extend(sub_blocks);
    updated.extend_from_slice(&blocks[index + 1..]);
    Ok(BlockSequence::from_blocks_unchecked(updated))
}

pub fn merge_blocks(
    sequence: &BlockSequence,
    selection: &Selection,
) -> Result<BlockSequence, ScheduleError> {
    let Some(range) = selection.indices() else {
        return Err(ScheduleError::InvalidSelection(
            "merge needs at least two blocks".to_string(),
        ));
    };
    let (first, last) = (*range.start(), *range.end());
    if first == last {
        return Err(ScheduleError::InvalidSelection(
            "merge needs at least two blocks".to_string(),
        ));
    }
    if last >= sequence.len() {
        return Err(ScheduleError::BlockNotFound(block_id(last)));
    }

    let blocks = sequence.blocks();
    let merged = TimeBlock {
        range: TimeRange {
            start: blocks[first].start(),
            end: blocks[last].end(),
        },
        content: blocks[first].content.clone(),
    };

    let mut updated = Vec::with_capacity(blocks.len() - (last - first));
    updated.extend_from_slice(&blocks[..first]);
    updated.push(merged);
    updated.extend_from_slice(&blocks[last + 1..]);
    Ok(BlockSequence::from_blocks_unchecked(updated))
}

pub fn assign_block(
    sequence: &BlockSequence,
    block_id: &str,
    content: BlockContent,
) -> Result<BlockSequence, ScheduleError> {
    let index = sequence.require_position(block_id)?;
    let mut updated = sequence.clone();
    if let Some(block) = updated.get_mut(index) {
        block.content = content;
    }
    Ok(updated)
}

pub fn clear_contents(sequence: &BlockSequence) -> BlockSequence {
    let mut updated = sequence.clone();
    for block in updated.blocks_mut() {
        block.content = BlockContent::default();
    }
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::generator::generate_time_blocks;
    use proptest::prelude::*;

    fn assigned(sequence: &BlockSequence, id: &str, title: &str, priority: &str) -> BlockSequence {
        assign_block(
            sequence,
            id,
            BlockContent::new(title, format!("{title} notes"), priority),
        )
        .expect("assign block")
    }

    fn ranges(sequence: &BlockSequence) -> Vec<String> {
        sequence.iter().map(|block| block.range.to_string()).collect()
    }

    #[test]
    fn split_interval_block_into_five_minute_pieces() {
        let day = generate_time_blocks(15, 360, 1380);
        let day = assigned(&day, "3", "Standup", "p1");

        let split = split_block(&day, "3", 15).expect("split");
        assert_eq!(split.len(), day.len() + 2);
        assert_eq!(
            ranges(&split)[3..6],
            ["06:45-06:50", "06:50-06:55", "06:55-07:00"]
        );
        assert!(split.blocks()[3..6].iter().all(|block| !block.has_content()));
        assert_eq!(split.get(6).expect("shifted block").range.to_string(), "07:00-07:15");
        assert_eq!(split.span(), day.span());
        assert!(split.validate().is_ok());
    }

    #[test]
    fn split_multiple_of_interval_uses_interval_pieces() {
        let day = generate_time_blocks(15, 360, 1380);
        let merged = merge_blocks(&day, &Selection::spanning(0, 3)).expect("merge");
        let split = split_block(&merged, "0", 15).expect("split");
        assert_eq!(
            ranges(&split)[..4],
            ["06:00-06:15", "06:15-06:30", "06:30-06:45", "06:45-07:00"]
        );
        assert_eq!(split, day);
    }

    #[test]
    fn split_irregular_block_folds_remainder_into_last_piece() {
        let day = generate_time_blocks(15, 360, 1380);
        let day = split_block(&day, "0", 15).expect("split into fives");
        let merged = merge_blocks(&day, &Selection::spanning(0, 1)).expect("merge 10 minutes");
        let merged = merge_blocks(&merged, &Selection::spanning(0, 1)).expect("merge to 15");
        assert_eq!(merged.get(0).expect("first").duration(), 15);

        let odd = BlockSequence::from_blocks(vec![TimeBlock::empty(
            TimeRange::new(360, 372).expect("range"),
        )])
        .expect("sequence");
        let split = split_block(&odd, "0", 15).expect("split");
        assert_eq!(ranges(&split), ["06:00-06:05", "06:05-06:12"]);
    }

    #[test]
    fn split_rejects_blocks_too_short_to_divide() {
        let day = generate_time_blocks(15, 360, 1380);
        let day = split_block(&day, "0", 15).expect("split");
        assert!(matches!(
            split_block(&day, "0", 15),
            Err(ScheduleError::Indivisible(_))
        ));
        assert!(matches!(
            split_block(&day, "999", 15),
            Err(ScheduleError::BlockNotFound(_))
        ));
    }

    #[test]
    fn merge_keeps_first_selected_content() {
        let day = generate_time_blocks(15, 360, 1380);
        let day = assigned(&day, "5", "Deep work", "p2");
        let day = assigned(&day, "6", "Email", "p4");

        let selection = Selection::from_ids(&day, &["5", "6", "7"]).expect("selection");
        let merged = merge_blocks(&day, &selection).expect("merge");

        assert_eq!(merged.len(), day.len() - 2);
        let block = merged.get(5).expect("merged block");
        assert_eq!(block.range.to_string(), "07:15-08:00");
        assert_eq!(block.duration(), 45);
        assert_eq!(block.content, day.get(5).expect("original").content);
        assert_eq!(merged.get(6).expect("next").range.to_string(), "08:00-08:15");
        assert!(merged.validate().is_ok());
    }

    #[test]
    fn merge_rejects_single_or_out_of_range_selection() {
        let day = generate_time_blocks(15, 360, 1380);
        assert!(merge_blocks(&day, &Selection::new()).is_err());
        assert!(merge_blocks(&day, &Selection::single(2)).is_err());
        assert!(matches!(
            merge_blocks(&day, &Selection::spanning(66, 70)),
            Err(ScheduleError::BlockNotFound(_))
        ));
    }

    #[test]
    fn selection_from_ids_requires_contiguity() {
        let day = generate_time_blocks(15, 360, 1380);
        assert_eq!(
            Selection::from_ids(&day, &["7", "5", "6"]).expect("unordered run"),
            Selection::spanning(5, 7)
        );
        assert!(matches!(
            Selection::from_ids(&day, &["5", "7"]),
            Err(ScheduleError::InvalidSelection(_))
        ));
        assert!(matches!(
            Selection::from_ids(&day, &["5", "5"]),
            Err(ScheduleError::InvalidSelection(_))
        ));
    }

    #[test]
    fn selection_press_sequence_extends_and_shrinks() {
        let mut selection = Selection::new();
        selection.press(5);
        assert_eq!(selection.ids(), ["5"]);
        selection.press(8);
        assert_eq!(selection.ids(), ["5", "6", "7", "8"]);
        selection.press(3);
        assert_eq!(selection.ids(), ["3", "4", "5", "6", "7", "8"]);
        selection.press(4);
        assert_eq!(selection.ids(), ["3", "4"]);
        selection.press(3);
        assert_eq!(selection.ids(), ["3"]);
        selection.clear();
        assert!(selection.is_empty());
        assert_eq!(selection.len(), 0);
    }

    #[test]
    fn clear_contents_keeps_layout() {
        let day = generate_time_blocks(30, 360, 600);
        let day = assigned(&day, "1", "Gym", "p3");
        let cleared = clear_contents(&day);
        assert_eq!(ranges(&cleared), ranges(&day));
        assert_eq!(cleared.assigned_count(), 0);
    }

    // Feature: timeblock, split then merge of the pieces restores the span
    proptest! {
        #[test]
        fn split_then_merge_restores_single_block(
            interval in prop::sample::select(vec![10u16, 15, 20, 30]),
            target in 0usize..10usize,
        ) {
            let day = generate_time_blocks(interval, 360, 1380);
            let id = block_id(target);
            let day = assigned(&day, &id, "Plan", "p1");
            let split = split_block(&day, &id, interval).expect("split");
            let pieces = usize::from(interval / SPLIT_GRANULARITY_MINUTES);

            prop_assert!(split.validate().is_ok());
            prop_assert_eq!(split.len(), day.len() + pieces - 1);
            prop_assert_eq!(split.span(), day.span());

            let merged = merge_blocks(&split, &Selection::spanning(target, target + pieces - 1))
                .expect("merge");
            prop_assert_eq!(merged.len(), day.len());
            prop_assert_eq!(merged.get(target).map(|block| block.range), day.get(target).map(|block| block.range));
            prop_assert!(!merged.get(target).expect("merged").has_content());
        }
    }
}
