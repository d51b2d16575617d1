//! Connectivity lookup
//!
//! Grows a found set from a seed object to its fixed point over the
//! geometric touch relation, one round of four expansion passes at a time.
//!
//! # Submodules
//! - `frontier` - Append-only worklist with a processing cursor
//! - `scan` - Per-scan state, abort signal and discovery record
//! - `engine` - Engine construction, seeding and the round loop
//! - `lookup` - The four expansion passes

mod frontier;
mod scan;
mod engine;
mod lookup;

pub use frontier::Frontier;

pub use scan::{AbortSignal, Discovery, ScanContext};

pub use engine::ConnectivityEngine;
