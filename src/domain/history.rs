use crate::domain::models::BlockSequence;

pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Default)]
pub struct BlockHistory {
    past: Vec<BlockSequence>,
    future: Vec<BlockSequence>,
    head: Option<BlockSequence>,
}

impl BlockHistory {
    pub fn record(&mut self, previous: BlockSequence, applied: BlockSequence) {
        if self.head.as_ref().is_some_and(|head| *head != previous) {
            self.past.clear();
        }
        self.past.push(previous);
        if self.past.len() > HISTORY_LIMIT {
            self.past.remove(0);
        }
        self.future.clear();
        self.head = Some(applied);
    }

    pub fn undo(&mut self, current: BlockSequence) -> Option<BlockSequence> {
        if !self.tracks(&current) {
            self.clear();
            return None;
        }
        let previous = self.past.pop()?;
        self.future.push(current);
        self.head = Some(previous.clone());
        Some(previous)
    }

    pub fn redo(&mut self, current: BlockSequence) -> Option<BlockSequence> {
        if !self.tracks(&current) {
            self.clear();
            return None;
        }
        let next = self.future.pop()?;
        self.past.push(current);
        self.head = Some(next.clone());
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
        self.head = None;
    }

    fn tracks(&self, current: &BlockSequence) -> bool {
        self.head.as_ref() == Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::generator::generate_time_blocks;
    use crate::domain::models::BlockContent;
    use crate::domain::mutation::{assign_block, split_block};

    #[test]
    fn undo_and_redo_walk_snapshots() {
        let mut history = BlockHistory::default();
        let original = generate_time_blocks(15, 360, 480);
        let split = split_block(&original, "0", 15).expect("split");

        history.record(original.clone(), split.clone());
        assert!(history.can_undo());
        assert!(!history.can_redo());

        let undone = history.undo(split.clone()).expect("undo");
        assert_eq!(undone, original);
        assert!(history.can_redo());

        let redone = history.redo(undone).expect("redo");
        assert_eq!(redone, split);
        let undone = history.undo(redone).expect("undo again");
        assert!(history.undo(undone).is_none());
    }

    #[test]
    fn new_edit_clears_redo() {
        let mut history = BlockHistory::default();
        let day = generate_time_blocks(15, 360, 480);
        let edited = assign_block(&day, "1", BlockContent::new("Read", "", "p1")).expect("assign");
        history.record(day.clone(), edited.clone());
        let undone = history.undo(edited).expect("undo");

        let split = split_block(&undone, "0", 15).expect("split");
        history.record(undone, split);
        assert!(!history.can_redo());
        assert!(history.can_undo());
    }

    #[test]
    fn outside_replacement_invalidates_history() {
        let mut history = BlockHistory::default();
        let day = generate_time_blocks(15, 360, 480);
        let edited = assign_block(&day, "1", BlockContent::new("Read", "", "p1")).expect("assign");
        history.record(day, edited);

        let replaced = generate_time_blocks(30, 360, 480);
        assert!(history.undo(replaced).is_none());
        assert!(!history.can_undo());
    }

    #[test]
    fn history_is_bounded() {
        let mut history = BlockHistory::default();
        let day = generate_time_blocks(15, 360, 480);
        for _ in 0..HISTORY_LIMIT + 10 {
            history.record(day.clone(), day.clone());
        }
        let mut steps = 0;
        let mut current = day;
        while let Some(previous) = history.undo(current) {
            current = previous;
            steps += 1;
        }
        assert_eq!(steps, HISTORY_LIMIT);
    }
}
