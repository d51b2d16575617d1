//! Flag-change history
//!
//! Every flag change made on behalf of the user is recorded under the current
//! serial number. Closing a serial groups everything recorded since into one
//! undoable step.

use super::data::Board;
use super::types::{ObjectFlags, ObjectRef};

/// Undo collaborator of the connectivity and DRC engines
pub trait UndoLog {
    fn record_flag_change(&mut self, object: ObjectRef, before: ObjectFlags, after: ObjectFlags);

    /// Serial number the next recorded change will be filed under
    fn begin_serial(&mut self) -> u32;

    /// Close the current serial
    fn increment_serial(&mut self);

    /// Revert every change of the serial closed last and reopen it; returns
    /// the number of flag changes reverted
    fn undo_last(&mut self, board: &mut Board) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagChange {
    pub serial: u32,
    pub object: ObjectRef,
    pub before: ObjectFlags,
    pub after: ObjectFlags,
}

/// In-memory undo log holding flag changes only
#[derive(Debug, Clone, Default)]
pub struct FlagUndoLog {
    serial: u32,
    changes: Vec<FlagChange>,
}

impl FlagUndoLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn changes(&self) -> &[FlagChange] {
        &self.changes
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }
}

impl UndoLog for FlagUndoLog {
    fn record_flag_change(&mut self, object: ObjectRef, before: ObjectFlags, after: ObjectFlags) {
        if before == after {
            return;
        }
        self.changes.push(FlagChange { serial: self.serial, object, before, after });
    }

    fn begin_serial(&mut self) -> u32 {
        self.serial
    }

    fn increment_serial(&mut self) {
        self.serial += 1;
    }

    fn undo_last(&mut self, board: &mut Board) -> usize {
        let Some(last) = self.serial.checked_sub(1) else {
            return 0;
        };
        let keep = self.changes.iter().rposition(|c| c.serial < last).map_or(0, |i| i + 1);
        let undone = self.changes.split_off(keep);
        for change in undone.iter().rev() {
            board.set_flags(change.object, change.before);
        }
        let reverted = undone.len();
        self.serial = last;
        tracing::debug!("[Undo] Reverted {} flag changes of serial {}", reverted, last);
        reverted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{LayerStack, Line, Point};

    #[test]
    fn test_undo_reverts_one_serial() {
        let mut board = Board::new("undo", LayerStack::two_layer());
        let a = board.add_line(0, Line::new(Point::new(0, 0), Point::new(1, 0), 1, 0)).unwrap();
        let b = board.add_line(0, Line::new(Point::new(5, 0), Point::new(6, 0), 1, 0)).unwrap();
        let mut undo = FlagUndoLog::new();

        board.set_flags(a, ObjectFlags::FOUND);
        undo.record_flag_change(a, ObjectFlags::NONE, ObjectFlags::FOUND);
        undo.increment_serial();

        board.set_flags(b, ObjectFlags::SELECTED);
        undo.record_flag_change(b, ObjectFlags::NONE, ObjectFlags::SELECTED);
        board.set_flags(a, ObjectFlags::FOUND | ObjectFlags::SELECTED);
        undo.record_flag_change(a, ObjectFlags::FOUND, ObjectFlags::FOUND | ObjectFlags::SELECTED);
        undo.increment_serial();

        assert_eq!(undo.undo_last(&mut board), 2);
        assert_eq!(board.flags(a), Some(ObjectFlags::FOUND));
        assert_eq!(board.flags(b), Some(ObjectFlags::NONE));
        assert_eq!(undo.begin_serial(), 1);
        assert_eq!(undo.changes().len(), 1);
    }

    #[test]
    fn test_undo_of_empty_serial_keeps_history() {
        let mut board = Board::new("undo", LayerStack::two_layer());
        let a = board.add_line(0, Line::new(Point::new(0, 0), Point::new(1, 0), 1, 0)).unwrap();
        let mut undo = FlagUndoLog::new();
        board.set_flags(a, ObjectFlags::DRC);
        undo.record_flag_change(a, ObjectFlags::NONE, ObjectFlags::DRC);
        undo.increment_serial();
        undo.increment_serial();

        assert_eq!(undo.undo_last(&mut board), 0);
        assert_eq!(board.flags(a), Some(ObjectFlags::DRC));
        assert_eq!(undo.begin_serial(), 1);
    }

    #[test]
    fn test_no_op_changes_are_dropped() {
        let mut undo = FlagUndoLog::new();
        undo.record_flag_change(ObjectRef::Via(0), ObjectFlags::DRC, ObjectFlags::DRC);
        assert!(undo.changes().is_empty());
    }
}
