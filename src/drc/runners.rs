//! DRC runner
//!
//! `run_drc` seeds a shrink probe and a bloat probe from every pin, pad and
//! via not yet covered by an earlier net, then from leftover copper, and
//! finishes with the static per-object checks.

use super::checks::{Finding, StaticChecks};
use super::reporter::{ReportDecision, ViolationReporter};
use super::types::{DesignRules, DrcViolation, ViolationKind};
use crate::board::{Coord, ObjectFlags, ObjectRef, Point};
use crate::find::{ConnectivityEngine, ScanContext};
use tracing::{debug, error, info, warn};

const SCRATCH: ObjectFlags = ObjectFlags::from_bits(
    ObjectFlags::FOUND.bits() | ObjectFlags::SELECTED.bits(),
);
const ALL_DRC: ObjectFlags = ObjectFlags::from_bits(
    ObjectFlags::FOUND.bits() | ObjectFlags::SELECTED.bits() | ObjectFlags::DRC.bits(),
);

/// Design rule checker driving a connectivity engine
pub struct DrcEngine<'a, 'r> {
    engine: ConnectivityEngine<'a>,
    reporter: &'r mut dyn ViolationReporter,
    rules: DesignRules,
    count: usize,
}

impl<'a, 'r> DrcEngine<'a, 'r> {
    pub fn new(engine: ConnectivityEngine<'a>, reporter: &'r mut dyn ViolationReporter) -> Self {
        let rules = engine.board().rules;
        Self { engine, reporter, rules, count: 0 }
    }

    /// Check the whole board. Returns the number of violations, negated when
    /// the reporter aborted the run.
    pub fn run_drc(&mut self) -> i32 {
        let start = std::time::Instant::now();
        info!("[DRC] Checking '{}'", self.engine.board().name);
        self.count = 0;
        self.reporter.reset();
        if self.reporter.report(&DrcViolation::notice()) == ReportDecision::Abort {
            debug!("[DRC] Reporter asked to abort on the notice; ignored");
        }

        if self.engine.clear_flags(ALL_DRC, true) {
            self.engine.undo_log().increment_serial();
        }

        let mut ctx = self.engine.init_drc_scan();
        let mut aborted = false;
        for seed in self.seeds(&ctx) {
            let checked = self
                .engine
                .board()
                .flags(seed)
                .map_or(true, |flags| flags.contains(ObjectFlags::DRC));
            if checked {
                continue;
            }
            debug!("[DRC] Probing from {:?}", seed);
            if self.drc_find(&mut ctx, seed) == ReportDecision::Abort {
                aborted = true;
                break;
            }
        }

        self.engine.clear_flags(if aborted { ObjectFlags::DRC } else { ALL_DRC }, false);
        if !aborted {
            aborted = self.static_checks() == ReportDecision::Abort;
        }

        let count = i32::try_from(self.count).unwrap_or(i32::MAX);
        if aborted {
            warn!("[DRC] Aborted by user after {} violations", count);
        }
        info!("[DRC] Finished in {:.2?}: {} violations", start.elapsed(), count);
        if aborted {
            -count
        } else {
            count
        }
    }

    /// Seeds in reporting order: per element its pins then pads, vias, then
    /// copper lines, arcs and polygons of each participating layer
    fn seeds(&self, ctx: &ScanContext) -> Vec<ObjectRef> {
        let board = self.engine.board();
        let mut seeds = Vec::new();
        for (element, e) in board.elements.iter().enumerate() {
            seeds.extend((0..e.pins.len()).map(|index| ObjectRef::Pin { element, index }));
            seeds.extend((0..e.pads.len()).map(|index| ObjectRef::Pad { element, index }));
        }
        seeds.extend((0..board.vias.len()).map(ObjectRef::Via));
        for layer in board.stack.copper_layers() {
            if !ctx.layer_participates(layer) {
                continue;
            }
            let data = &board.layers[layer];
            seeds.extend((0..data.lines.len()).map(|index| ObjectRef::Line { layer, index }));
            seeds.extend((0..data.arcs.len()).map(|index| ObjectRef::Arc { layer, index }));
            seeds.extend((0..data.polygons.len()).map(|index| ObjectRef::Polygon { layer, index }));
        }
        seeds
    }

    /// Fresh probe from `seed` at `bloat`, flagging with `flag`. With
    /// `accounted` set the probe stops at the first object lacking those
    /// bits; objects carrying any bit of `exclude` are left alone.
    fn probe(
        &mut self,
        ctx: &mut ScanContext,
        seed: ObjectRef,
        flag: ObjectFlags,
        bloat: Coord,
        accounted: Option<ObjectFlags>,
        exclude: ObjectFlags,
    ) -> bool {
        ctx.dump();
        ctx.set_bloat(bloat);
        ctx.set_flag(flag);
        ctx.set_record_undo(false);
        ctx.set_abort_on_new(accounted);
        ctx.set_exclude(exclude);
        if let Err(err) = self.engine.seed(ctx, seed) {
            error!("[DRC] Cannot probe from {:?}: {}", seed, err);
            return false;
        }
        self.engine.run(ctx, flag, false, false)
    }

    /// Shrink and bloat experiments from one seed. Its net is marked DRC
    /// once both have run.
    pub fn drc_find(&mut self, ctx: &mut ScanContext, seed: ObjectRef) -> ReportDecision {
        if self.rules.shrink != 0 && self.shrink_test(ctx, seed) == ReportDecision::Abort {
            return ReportDecision::Abort;
        }
        self.bloat_test(ctx, seed)
    }

    /// Whatever the seed reaches at nominal size but not when shrunk hangs
    /// on by a fragile overlap
    fn shrink_test(&mut self, ctx: &mut ScanContext, seed: ObjectRef) -> ReportDecision {
        let shrink = self.rules.shrink;
        self.engine.clear_flags(SCRATCH, false);

        self.probe(ctx, seed, ObjectFlags::SELECTED, -shrink, None, ObjectFlags::NONE);
        if !self.probe(ctx, seed, ObjectFlags::FOUND, 0, Some(ObjectFlags::SELECTED), ObjectFlags::NONE) {
            return ReportDecision::Continue;
        }
        let Some(discovery) = ctx.discovery() else {
            return ReportDecision::Continue;
        };
        self.engine.clear_flags(SCRATCH, false);
        let implicated: Vec<ObjectRef> = discovery.from.into_iter().chain([discovery.object]).collect();
        self.report_implicated(
            ViolationKind::BrokenTrace,
            "Potential for broken trace",
            discovery.object,
            &implicated,
            shrink,
        )
    }

    /// Anything the seed reaches only when bloated belongs to another net
    /// that is too close. Nets checked by earlier seeds are excluded, so
    /// each pair is reported once. Every hit net is marked SELECTED and the
    /// probe repeats until it finds nothing new.
    fn bloat_test(&mut self, ctx: &mut ScanContext, seed: ObjectRef) -> ReportDecision {
        let bloat = self.rules.bloat;
        self.engine.clear_flags(SCRATCH, false);

        // the seed's own net carries FOUND for the rest of the test
        self.probe(ctx, seed, ObjectFlags::FOUND, 0, None, ObjectFlags::DRC);
        let nominal = ctx.found();

        let mut encroachers: Vec<ObjectRef> = Vec::new();
        loop {
            for &other in &encroachers {
                self.probe(ctx, other, ObjectFlags::SELECTED, 0, None, ObjectFlags::DRC);
            }
            let hit = self.probe(
                ctx,
                seed,
                ObjectFlags::SELECTED,
                bloat,
                Some(ObjectFlags::FOUND),
                ObjectFlags::DRC,
            );
            if !hit {
                break;
            }
            let Some(discovery) = ctx.discovery() else {
                break;
            };
            self.engine.clear_flags(SCRATCH, false);
            let implicated: Vec<ObjectRef> = discovery.from.into_iter().chain([discovery.object]).collect();
            let decision = self.report_implicated(
                ViolationKind::TooClose,
                "Copper areas too close",
                discovery.object,
                &implicated,
                bloat,
            );
            if decision == ReportDecision::Abort {
                return decision;
            }
            encroachers.push(discovery.object);
            self.engine.clear_flags(SCRATCH, false);
            self.engine.set_flags_on(&nominal, ObjectFlags::FOUND, false);
        }

        self.engine.clear_flags(SCRATCH, false);
        self.engine.set_flags_on(&nominal, ObjectFlags::DRC, false);
        ReportDecision::Continue
    }

    /// Highlight `implicated` as one undoable step and report it. On
    /// Continue the highlight is undone again; on Abort it stays for the
    /// user to inspect.
    fn report_implicated(
        &mut self,
        kind: ViolationKind,
        title: &str,
        at: ObjectRef,
        implicated: &[ObjectRef],
        required: Coord,
    ) -> ReportDecision {
        self.engine.set_flags_on(implicated, ObjectFlags::SELECTED, true);
        let violation = self.violation(kind, title, at, implicated, None, required);
        self.deliver(&violation)
    }

    fn violation(
        &self,
        kind: ViolationKind,
        title: &str,
        at: ObjectRef,
        implicated: &[ObjectRef],
        measured: Option<Coord>,
        required: Coord,
    ) -> DrcViolation {
        let board = self.engine.board();
        let location = board.locate(at).unwrap_or(Point::default());
        let objects = implicated
            .iter()
            .filter_map(|&object| board.object_id(object).map(|id| (id, object.kind())))
            .collect();
        DrcViolation::new(kind, title, location, measured, required, objects)
    }

    fn deliver(&mut self, violation: &DrcViolation) -> ReportDecision {
        self.count += 1;
        debug!("[DRC] Violation {}: {}", self.count, violation.title);
        let decision = self.reporter.report(violation);
        if decision == ReportDecision::Continue {
            self.engine.undo.increment_serial();
            self.engine.undo.undo_last(&mut *self.engine.board);
        }
        decision
    }

    fn static_checks(&mut self) -> ReportDecision {
        let index = self.engine.index;
        let findings = StaticChecks::new(self.engine.board(), index, self.engine.oracle(), self.rules).run();
        for finding in findings {
            if self.report_finding(&finding) == ReportDecision::Abort {
                return ReportDecision::Abort;
            }
        }
        ReportDecision::Continue
    }

    fn report_finding(&mut self, finding: &Finding) -> ReportDecision {
        self.engine.set_flags_on(&[finding.object], ObjectFlags::SELECTED, true);
        if let Some(polygon) = finding.polygon {
            self.engine.set_flags_on(&[polygon], ObjectFlags::FOUND, true);
        }
        let violation = self.violation(
            finding.kind,
            &finding.title,
            finding.object,
            &finding.implicated(),
            finding.measured,
            finding.required,
        );
        self.deliver(&violation)
    }
}
