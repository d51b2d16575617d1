//! Design Rule Check (DRC) built on connectivity lookups
//!
//! Copper spacing and overlap are tested by comparing lookups from the same
//! seed at nominal, bloated and shrunk sizes. Per-object minimums are
//! checked separately on the static board data.
//!
//! # Submodules
//! - `types` - DRC data structures (violations, rules)
//! - `reporter` - Violation sink and abort decision
//! - `checks` - Static per-object rule checks
//! - `runners` - Whole-board DRC entry point

mod types;
mod reporter;
mod checks;
mod runners;

// Re-export public types
pub use types::{DesignRules, DrcViolation, ViolationKind};

pub use reporter::{ReportDecision, ViolationLog, ViolationReporter};

pub use checks::{Finding, StaticChecks};

pub use runners::DrcEngine;
