//! Violation reporting
//!
//! The reporter is the only place a DRC run can be suspended: it sees one
//! violation at a time and decides whether the run goes on.

use super::types::DrcViolation;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportDecision {
    Continue,
    Abort,
}

/// User-facing sink for violations
pub trait ViolationReporter {
    fn report(&mut self, violation: &DrcViolation) -> ReportDecision;

    /// Forget everything reported by a previous run
    fn reset(&mut self);
}

/// Reporter that keeps every violation, optionally aborting after a fixed
/// number of counted ones
#[derive(Clone, Debug, Default)]
pub struct ViolationLog {
    violations: Vec<DrcViolation>,
    abort_after: Option<usize>,
}

impl ViolationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort as soon as `limit` counted violations have been seen
    pub fn abort_after(limit: usize) -> Self {
        Self { violations: Vec::new(), abort_after: Some(limit) }
    }

    /// Everything reported, notice included
    pub fn violations(&self) -> &[DrcViolation] {
        &self.violations
    }

    /// Reported violations without the informational notice
    pub fn counted(&self) -> impl Iterator<Item = &DrcViolation> {
        self.violations.iter().filter(|v| !v.is_notice())
    }

    pub fn titled<'a>(&'a self, title: &'a str) -> impl Iterator<Item = &'a DrcViolation> + 'a {
        self.violations.iter().filter(move |v| v.title == title)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.violations)
    }
}

impl ViolationReporter for ViolationLog {
    fn report(&mut self, violation: &DrcViolation) -> ReportDecision {
        self.violations.push(violation.clone());
        match self.abort_after {
            Some(limit) if self.counted().count() >= limit => ReportDecision::Abort,
            _ => ReportDecision::Continue,
        }
    }

    fn reset(&mut self) {
        self.violations.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Point;
    use crate::drc::ViolationKind;

    fn thin_line() -> DrcViolation {
        DrcViolation::new(ViolationKind::LineTooThin, "Line width is too thin", Point::new(0, 0), Some(5), 6, vec![])
    }

    #[test]
    fn test_notice_does_not_count_toward_abort() {
        let mut log = ViolationLog::abort_after(1);
        assert_eq!(log.report(&DrcViolation::notice()), ReportDecision::Continue);
        assert_eq!(log.report(&thin_line()), ReportDecision::Abort);
        assert_eq!(log.counted().count(), 1);
        assert_eq!(log.titled("Line width is too thin").count(), 1);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut log = ViolationLog::new();
        log.report(&thin_line());
        log.reset();
        assert!(log.violations().is_empty());
        assert_eq!(log.to_json().unwrap(), "[]");
    }
}
