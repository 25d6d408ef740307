use tracing::debug;

use crate::error::{EditError, EditResult};
use crate::image_state::Snapshot;

/// One accepted edit: the document before and after it.
#[derive(Debug, Clone)]
pub struct EditCommand {
    pub label: String,
    pub before: Snapshot,
    pub after: Snapshot,
}

impl EditCommand {
    pub fn new(label: impl Into<String>, before: Snapshot, after: Snapshot) -> Self {
        Self {
            label: label.into(),
            before,
            after,
        }
    }

    /// The image the document holds once this command is applied.
    pub fn apply(&self) -> &Snapshot {
        &self.after
    }

    /// The image the document holds once this command is reversed.
    pub fn reverse(&self) -> &Snapshot {
        &self.before
    }

    /// Approximate bytes held by the two snapshots.
    pub fn memory_size(&self) -> usize {
        self.before.as_raw().len() + self.after.as_raw().len()
    }
}

/// Linear undo/redo history.
///
/// Commands before `cursor` are done, commands at or after it are undone.
/// Pushing truncates the undone tail; there is no redo tree. Every command is
/// kept, so undoing all of them always lands on the original image.
#[derive(Debug, Default)]
pub struct History {
    commands: Vec<EditCommand>,
    cursor: usize,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted edit and return the new current image.
    pub fn push(&mut self, command: EditCommand) -> Snapshot {
        if self.cursor < self.commands.len() {
            debug!(
                dropped = self.commands.len() - self.cursor,
                "history: discarding undone commands"
            );
            self.commands.truncate(self.cursor);
        }
        let after = command.apply().clone();
        self.commands.push(command);
        self.cursor = self.commands.len();
        after
    }

    pub fn undo(&mut self) -> EditResult<Snapshot> {
        if !self.can_undo() {
            return Err(EditError::EmptyHistory("Nothing to undo"));
        }
        self.cursor -= 1;
        Ok(self.commands[self.cursor].reverse().clone())
    }

    pub fn redo(&mut self) -> EditResult<Snapshot> {
        if !self.can_redo() {
            return Err(EditError::EmptyHistory("Nothing to redo"));
        }
        let image = self.commands[self.cursor].apply().clone();
        self.cursor += 1;
        Ok(image)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.commands.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn undo_label(&self) -> Option<&str> {
        self.cursor
            .checked_sub(1)
            .map(|i| self.commands[i].label.as_str())
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.commands.get(self.cursor).map(|c| c.label.as_str())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(|c| c.label.as_str())
    }

    pub fn memory_usage(&self) -> usize {
        self.commands.iter().map(EditCommand::memory_size).sum()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use image::{ImageBuffer, Rgba};

    use super::{EditCommand, History};
    use crate::error::EditError;
    use crate::image_state::Snapshot;

    fn solid(v: u8) -> Snapshot {
        Arc::new(ImageBuffer::from_pixel(3, 2, Rgba([v, v, v, 255])))
    }

    fn step(label: &str, from: u8, to: u8) -> EditCommand {
        EditCommand::new(label, solid(from), solid(to))
    }

    fn value(img: &Snapshot) -> u8 {
        img.get_pixel(0, 0)[0]
    }

    fn abc() -> History {
        let mut h = History::new();
        h.push(step("A", 0, 1));
        h.push(step("B", 1, 2));
        h.push(step("C", 2, 3));
        h
    }

    #[test]
    fn push_returns_after_image_and_advances_cursor() {
        let mut h = History::new();
        let current = h.push(step("A", 0, 1));
        assert_eq!(value(&current), 1);
        assert_eq!(h.cursor(), 1);
        assert!(h.can_undo());
        assert!(!h.can_redo());
    }

    #[test]
    fn undo_then_redo_round_trips_image_and_cursor() {
        let mut h = abc();
        let before_cursor = h.cursor();
        let undone = h.undo().unwrap();
        assert_eq!(value(&undone), 2);
        let redone = h.redo().unwrap();
        assert_eq!(value(&redone), 3);
        assert_eq!(h.cursor(), before_cursor);
    }

    #[test]
    fn redo_then_undo_round_trips_image_and_cursor() {
        let mut h = abc();
        h.undo().unwrap();
        h.undo().unwrap();
        let cursor = h.cursor();
        let redone = h.redo().unwrap();
        assert_eq!(value(&redone), 2);
        let undone = h.undo().unwrap();
        assert_eq!(value(&undone), 1);
        assert_eq!(h.cursor(), cursor);
    }

    #[test]
    fn push_after_undo_truncates_redo_tail() {
        let mut h = abc();
        h.undo().unwrap();
        h.undo().unwrap();
        assert_eq!(h.cursor(), 1);

        h.push(step("D", 1, 9));
        assert_eq!(h.labels().collect::<Vec<_>>(), vec!["A", "D"]);
        assert_eq!(h.cursor(), 2);
        assert!(!h.can_redo());
    }

    #[test]
    fn undo_on_empty_history_reports_nothing_to_undo() {
        let mut h = History::new();
        assert!(matches!(h.undo(), Err(EditError::EmptyHistory("Nothing to undo"))));
        assert_eq!(h.cursor(), 0);
    }

    #[test]
    fn redo_at_end_reports_nothing_to_redo() {
        let mut h = abc();
        assert!(matches!(h.redo(), Err(EditError::EmptyHistory("Nothing to redo"))));
        assert_eq!(h.cursor(), 3);
    }

    #[test]
    fn undo_to_start_returns_original_image() {
        let mut h = abc();
        h.undo().unwrap();
        h.undo().unwrap();
        let original = h.undo().unwrap();
        assert_eq!(value(&original), 0);
        assert_eq!(h.cursor(), 0);
    }

    #[test]
    fn labels_follow_cursor() {
        let mut h = abc();
        h.undo().unwrap();
        assert_eq!(h.undo_label(), Some("B"));
        assert_eq!(h.redo_label(), Some("C"));
    }

    #[test]
    fn memory_usage_counts_both_snapshots() {
        let mut h = History::new();
        h.push(step("A", 0, 1));
        assert_eq!(h.memory_usage(), 2 * 3 * 2 * 4);
    }
}
