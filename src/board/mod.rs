//! In-memory board graph and the collaborators the engines consume
//!
//! # Submodules
//! - `types` - Points, boxes, flags and the board objects themselves
//! - `layers` - Layer stack and layer groups
//! - `data` - The `Board` container
//! - `shapes` - Objects reduced to geometric shapes
//! - `distance` - Distance calculation algorithms
//! - `oracle` - Pairwise touch predicate
//! - `spatial` - R-tree range queries
//! - `undo` - Flag-change history

mod types;
mod layers;
mod data;
mod shapes;
mod distance;
mod oracle;
mod spatial;
mod undo;

pub use types::{
    Arc, BoundingBox, Coord, Element, ElementLine, LayerMask, LayerSpan, Line, ObjectFlags,
    ObjectKind, ObjectRef, Pad, PadRef, Pin, Point, Polygon, PvRef, Rat, Side, Via,
};

pub use layers::{Layer, LayerKind, LayerStack, LayerStackSpec};

pub use data::{Board, LayerData, LayerObjectView, LayerRole, ObjectCounts, PvView};

pub use shapes::{Core, Shape};

pub use distance::{ArcPath, Vec2};

pub use oracle::{CopperGeometry, GeometryOracle};

pub use spatial::{BoardIndex, IndexCategory, IndexEntry, SpatialIndex};

pub use undo::{FlagChange, FlagUndoLog, UndoLog};
