//! Error taxonomy
//!
//! `LogicError` covers internal inconsistencies of a scan (bad layer index,
//! stale object reference, frontier overflow). `BoardError` is returned while
//! assembling a board. A user abort is not an error: it surfaces as a negative
//! violation count from the DRC runner.

use crate::board::{ObjectKind, ObjectRef};
use thiserror::Error;

/// Internal inconsistency detected by the connectivity engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogicError {
    /// Layer index outside the board's layer stack
    #[error("layer index {layer} out of range (stack has {count} layers)")]
    BadLayer { layer: usize, count: usize },

    /// Reference that no longer resolves to a board object
    #[error("{0:?} does not refer to an object on this board")]
    MissingObject(ObjectRef),

    /// Object kind that cannot start a connection scan
    #[error("{0:?} objects cannot seed a connection scan")]
    NotSearchable(ObjectKind),

    /// More entries appended than the frontier was sized for
    #[error("{kind:?} frontier overflowed its capacity of {capacity}")]
    FrontierOverflow { kind: ObjectKind, capacity: usize },
}

/// Board assembly error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("layer {0} is not a copper layer")]
    NotCopper(usize),

    #[error("layer index {layer} out of range (stack has {count} layers)")]
    BadLayer { layer: usize, count: usize },

    #[error("layer group {group} out of range (stack has {count} groups)")]
    BadGroup { group: usize, count: usize },

    #[error("copper layer '{0}' has no layer group")]
    UngroupedCopper(String),

    #[error("duplicate layer name '{0}'")]
    DuplicateLayer(String),

    #[error("polygon needs at least 3 points, got {0}")]
    DegeneratePolygon(usize),
}
