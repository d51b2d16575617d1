//! Connectivity lookup and design rule checking for printed circuit boards
//!
//! A `Board` holds copper objects on a layer stack. `find` grows the set of
//! objects electrically connected to a seed. `drc` builds on it to report
//! copper that is too close, overlaps too little, or is thinner than the
//! design rules allow.
//!
//! # Example
//! ```ignore
//! let mut board = Board::new("demo", LayerStack::two_layer());
//! let seed = board.add_line(0, Line::new(Point::new(0, 0), Point::new(1_000_000, 0), 254_000, 0))?;
//! let mut undo = FlagUndoLog::new();
//! pcb_connect::find_connections(&mut board, seed, false, false, &mut undo)?;
//! ```

pub mod board;
pub mod config;
pub mod drc;
pub mod error;
pub mod find;

pub use board::{Board, BoardIndex, CopperGeometry, FlagUndoLog, LayerStack, ObjectFlags, ObjectRef};
pub use config::DrcConfig;
pub use drc::{DesignRules, DrcEngine, DrcViolation, ReportDecision, ViolationLog, ViolationReporter};
pub use error::{BoardError, LogicError};
pub use find::{ConnectivityEngine, ScanContext};

use board::UndoLog;

/// Flag everything connected to `seed` with FOUND, as one undoable step.
/// Returns whether the lookup was aborted.
pub fn find_connections(
    board: &mut Board,
    seed: ObjectRef,
    include_rats: bool,
    draw: bool,
    undo: &mut dyn UndoLog,
) -> Result<bool, LogicError> {
    let index = BoardIndex::build(board);
    let oracle = CopperGeometry;
    let mut engine = ConnectivityEngine::new(board, &index, &oracle, undo);
    engine.find_connections(seed, include_rats, draw)
}

/// Run a full design rule check with the board's own rules. Returns the
/// violation count, negative when the reporter aborted.
pub fn run_drc(board: &mut Board, reporter: &mut dyn ViolationReporter, undo: &mut dyn UndoLog) -> i32 {
    let index = BoardIndex::build(board);
    let oracle = CopperGeometry;
    let engine = ConnectivityEngine::new(board, &index, &oracle, undo);
    DrcEngine::new(engine, reporter).run_drc()
}
