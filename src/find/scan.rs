//! Per-scan state
//!
//! A `ScanContext` owns every frontier of one connectivity scan plus the
//! knobs that distinguish a plain lookup from a DRC probe: the gap allowance,
//! the abort-on-new mode and undo recording.

use super::frontier::Frontier;
use crate::board::{Board, Coord, ObjectFlags, ObjectRef, PadRef, PvRef, Side};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation token shared by every visitor of a scan
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn raise(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Object that tripped an abort-on-new scan, and the found object it touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discovery {
    pub object: ObjectRef,
    pub from: Option<ObjectRef>,
}

/// Frontiers and settings of one connectivity scan
#[derive(Debug)]
pub struct ScanContext {
    pub(crate) lines: Vec<Frontier<usize>>,
    pub(crate) arcs: Vec<Frontier<usize>>,
    pub(crate) polygons: Vec<Frontier<usize>>,
    pub(crate) pads: [Frontier<PadRef>; 2],
    pub(crate) pvs: Frontier<PvRef>,
    pub(crate) rats: Frontier<usize>,
    /// Layers taking part in the scan
    pub(crate) layer_on: Vec<bool>,
    pub(crate) flag: ObjectFlags,
    pub(crate) bloat: Coord,
    pub(crate) include_rats: bool,
    pub(crate) emit_draw: bool,
    pub(crate) abort_on_new: Option<ObjectFlags>,
    /// Objects carrying any of these bits are neither added nor walked
    pub(crate) exclude: ObjectFlags,
    pub(crate) record_undo: bool,
    pub(crate) signal: AbortSignal,
    pub(crate) discovery: Option<Discovery>,
    pub(crate) redraw: Vec<ObjectRef>,
}

impl ScanContext {
    /// Allocate frontiers sized from the board's object counts. With
    /// `respect_no_drc`, layers flagged `no_drc` sit the scan out.
    pub fn for_board(board: &Board, respect_no_drc: bool) -> Self {
        let counts = board.counts();
        let stack = &board.stack;
        let layer_on = (0..stack.layer_count())
            .map(|layer| stack.is_copper(layer) && !(respect_no_drc && stack.is_no_drc(layer)))
            .collect();
        Self {
            lines: counts.lines.iter().map(|&n| Frontier::with_capacity(n)).collect(),
            arcs: counts.arcs.iter().map(|&n| Frontier::with_capacity(n)).collect(),
            polygons: counts.polygons.iter().map(|&n| Frontier::with_capacity(n)).collect(),
            pads: Side::ALL.map(|side| Frontier::with_capacity(counts.pads[side.index()])),
            pvs: Frontier::with_capacity(counts.pins_vias),
            rats: Frontier::with_capacity(counts.rats),
            layer_on,
            flag: ObjectFlags::FOUND,
            bloat: 0,
            include_rats: false,
            emit_draw: false,
            abort_on_new: None,
            exclude: ObjectFlags::NONE,
            record_undo: false,
            signal: AbortSignal::default(),
            discovery: None,
            redraw: Vec::new(),
        }
    }

    /// Reset every frontier for reuse with the next seed
    pub fn dump(&mut self) {
        for frontier in self.lines.iter_mut().chain(&mut self.arcs).chain(&mut self.polygons) {
            frontier.clear();
        }
        for frontier in &mut self.pads {
            frontier.clear();
        }
        self.pvs.clear();
        self.rats.clear();
        self.signal.reset();
        self.discovery = None;
        self.redraw.clear();
    }

    pub fn set_bloat(&mut self, bloat: Coord) {
        self.bloat = bloat;
    }

    pub fn bloat(&self) -> Coord {
        self.bloat
    }

    /// Flag set on every object the scan finds
    pub fn set_flag(&mut self, flag: ObjectFlags) {
        self.flag = flag;
    }

    pub fn flag(&self) -> ObjectFlags {
        self.flag
    }

    /// Abort as soon as an object lacking every bit of `accounted` is found
    pub fn set_abort_on_new(&mut self, accounted: Option<ObjectFlags>) {
        self.abort_on_new = accounted;
    }

    /// Leave objects carrying any bit of `exclude` out of the scan
    pub fn set_exclude(&mut self, exclude: ObjectFlags) {
        self.exclude = exclude;
    }

    /// Whether an object with `flags` is already found or excluded
    pub(crate) fn skips(&self, flags: ObjectFlags) -> bool {
        flags.contains(self.flag) || flags.intersects(self.exclude)
    }

    /// Record each flag change in the undo log
    pub fn set_record_undo(&mut self, record: bool) {
        self.record_undo = record;
    }

    pub fn is_aborted(&self) -> bool {
        self.signal.is_raised()
    }

    /// Handle that can cancel the scan from outside
    pub fn abort_signal(&self) -> AbortSignal {
        self.signal.clone()
    }

    pub fn discovery(&self) -> Option<Discovery> {
        self.discovery
    }

    pub fn layer_participates(&self, layer: usize) -> bool {
        self.layer_on.get(layer).copied().unwrap_or(false)
    }

    /// Search margin around a source object
    pub(crate) fn margin(&self) -> Coord {
        self.bloat.max(0) + 1
    }

    /// Any frontier still has unprocessed entries
    pub fn has_pending(&self) -> bool {
        self.lines.iter().any(Frontier::has_pending)
            || self.arcs.iter().any(Frontier::has_pending)
            || self.polygons.iter().any(Frontier::has_pending)
            || self.pads.iter().any(Frontier::has_pending)
            || self.pvs.has_pending()
            || self.rats.has_pending()
    }

    /// Every object found so far: pins and vias, pads, per-layer lines,
    /// arcs and polygons, rats
    pub fn found(&self) -> Vec<ObjectRef> {
        let mut found: Vec<ObjectRef> = self.pvs.items().iter().map(|&pv| pv.into()).collect();
        for frontier in &self.pads {
            found.extend(frontier.items().iter().map(|&pad| ObjectRef::from(pad)));
        }
        for layer in 0..self.lines.len() {
            found.extend(self.lines[layer].items().iter().map(|&index| ObjectRef::Line { layer, index }));
            found.extend(self.arcs[layer].items().iter().map(|&index| ObjectRef::Arc { layer, index }));
            found.extend(
                self.polygons[layer].items().iter().map(|&index| ObjectRef::Polygon { layer, index }),
            );
        }
        found.extend(self.rats.items().iter().map(|&index| ObjectRef::Rat(index)));
        found
    }

    pub fn found_count(&self) -> usize {
        self.lines.iter().chain(&self.arcs).chain(&self.polygons).map(Frontier::len).sum::<usize>()
            + self.pads.iter().map(Frontier::len).sum::<usize>()
            + self.pvs.len()
            + self.rats.len()
    }

    /// Move entries found since the last call onto the redraw list
    pub(crate) fn collect_redraw(&mut self) {
        let mut fresh: Vec<ObjectRef> = self.pvs.take_undrawn().iter().map(|&pv| pv.into()).collect();
        for frontier in &mut self.pads {
            fresh.extend(frontier.take_undrawn().iter().map(|&pad| ObjectRef::from(pad)));
        }
        for layer in 0..self.lines.len() {
            fresh.extend(self.lines[layer].take_undrawn().iter().map(|&index| ObjectRef::Line { layer, index }));
            fresh.extend(self.arcs[layer].take_undrawn().iter().map(|&index| ObjectRef::Arc { layer, index }));
            fresh.extend(
                self.polygons[layer]
                    .take_undrawn()
                    .iter()
                    .map(|&index| ObjectRef::Polygon { layer, index }),
            );
        }
        fresh.extend(self.rats.take_undrawn().iter().map(|&index| ObjectRef::Rat(index)));
        self.redraw.extend(fresh);
    }

    /// Objects found since the last call, for a GUI to repaint
    pub fn take_redraw(&mut self) -> Vec<ObjectRef> {
        std::mem::take(&mut self.redraw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{LayerStack, Line, Point};

    #[test]
    fn test_frontiers_sized_from_board() {
        let mut board = Board::new("scan", LayerStack::two_layer());
        board.add_line(1, Line::new(Point::new(0, 0), Point::new(1, 0), 1, 0)).unwrap();
        board.add_line(1, Line::new(Point::new(0, 5), Point::new(1, 5), 1, 0)).unwrap();
        let ctx = ScanContext::for_board(&board, false);
        assert_eq!(ctx.lines.len(), 4);
        assert_eq!(ctx.lines[1].capacity(), 2);
        assert!(ctx.layer_participates(0));
        assert!(!ctx.layer_participates(2));
        assert!(!ctx.has_pending());
    }

    #[test]
    fn test_no_drc_layer_skipped_for_drc() {
        let mut stack = LayerStack::two_layer();
        if let Some(layer) = stack.layer_mut(1) {
            layer.no_drc = true;
        }
        let board = Board::new("scan", stack);
        assert!(ScanContext::for_board(&board, false).layer_participates(1));
        assert!(!ScanContext::for_board(&board, true).layer_participates(1));
    }

    #[test]
    fn test_dump_resets_state() {
        let board = Board::new("scan", LayerStack::two_layer());
        let mut ctx = ScanContext::for_board(&board, false);
        ctx.signal.raise();
        ctx.discovery = Some(Discovery { object: ObjectRef::Via(0), from: None });
        ctx.dump();
        assert!(!ctx.is_aborted());
        assert!(ctx.discovery().is_none());
        assert_eq!(ctx.found_count(), 0);
    }

    #[test]
    fn test_skips_found_and_excluded() {
        let board = Board::new("scan", LayerStack::two_layer());
        let mut ctx = ScanContext::for_board(&board, false);
        ctx.set_flag(ObjectFlags::SELECTED);
        assert!(ctx.skips(ObjectFlags::SELECTED | ObjectFlags::FOUND));
        assert!(!ctx.skips(ObjectFlags::DRC));

        ctx.set_exclude(ObjectFlags::DRC);
        assert!(ctx.skips(ObjectFlags::DRC));
        assert!(!ctx.skips(ObjectFlags::FOUND));
    }
}
