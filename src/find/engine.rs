//! Connectivity engine public API
//!
//! The engine borrows the board mutably for the duration of a lookup and
//! consults the spatial index and geometry oracle read-only. Everything a
//! single scan needs lives in the caller-owned `ScanContext`.

use super::frontier::Frontier;
use super::scan::{Discovery, ScanContext};
use crate::board::{
    Board, GeometryOracle, ObjectFlags, ObjectKind, ObjectRef, PadRef, PvRef, SpatialIndex,
    UndoLog,
};
use crate::error::LogicError;
use tracing::{debug, error, trace};

pub struct ConnectivityEngine<'a> {
    pub(crate) board: &'a mut Board,
    pub(crate) index: &'a dyn SpatialIndex,
    pub(crate) oracle: &'a dyn GeometryOracle,
    pub(crate) undo: &'a mut dyn UndoLog,
}

impl<'a> ConnectivityEngine<'a> {
    pub fn new(
        board: &'a mut Board,
        index: &'a dyn SpatialIndex,
        oracle: &'a dyn GeometryOracle,
        undo: &'a mut dyn UndoLog,
    ) -> Self {
        Self { board, index, oracle, undo }
    }

    pub fn board(&self) -> &Board {
        &*self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut *self.board
    }

    pub fn oracle(&self) -> &'a dyn GeometryOracle {
        self.oracle
    }

    pub fn undo_log(&mut self) -> &mut dyn UndoLog {
        &mut *self.undo
    }

    /// Frontiers for a plain lookup over every copper layer
    pub fn init_scan(&self) -> ScanContext {
        ScanContext::for_board(&*self.board, false)
    }

    /// Frontiers for a DRC probe; `no_drc` layers are left out
    pub fn init_drc_scan(&self) -> ScanContext {
        ScanContext::for_board(&*self.board, true)
    }

    /// Put the starting object into its frontier and flag it
    pub fn seed(&mut self, ctx: &mut ScanContext, object: ObjectRef) -> Result<(), LogicError> {
        if let Some(layer) = object.layer() {
            let count = self.board.stack.layer_count();
            if layer >= count {
                return Err(LogicError::BadLayer { layer, count });
            }
        }
        if object.kind() == ObjectKind::Element {
            return Err(LogicError::NotSearchable(ObjectKind::Element));
        }
        if self.board.flags(object).is_none() {
            return Err(LogicError::MissingObject(object));
        }
        self.add_object(ctx, object, None);
        Ok(())
    }

    /// Expand the found set to its fixed point. Returns whether the scan was
    /// cut short by an abort.
    pub fn run(
        &mut self,
        ctx: &mut ScanContext,
        flag: ObjectFlags,
        include_rats: bool,
        emit_draw: bool,
    ) -> bool {
        ctx.flag = flag;
        ctx.include_rats = include_rats;
        ctx.emit_draw = emit_draw;

        let mut rounds = 0;
        while ctx.has_pending() && !ctx.is_aborted() {
            rounds += 1;
            self.pv_to_pv(ctx);
            if !ctx.is_aborted() {
                self.lo_to_pv(ctx);
            }
            if !ctx.is_aborted() {
                self.lo_to_lo(ctx);
            }
            if !ctx.is_aborted() {
                self.pv_to_lo(ctx);
            }
            if emit_draw {
                ctx.collect_redraw();
            }
        }

        debug!(
            "[Find] {} rounds at bloat {}: {} objects found{}",
            rounds,
            ctx.bloat,
            ctx.found_count(),
            if ctx.is_aborted() { " (aborted)" } else { "" }
        );
        ctx.is_aborted()
    }

    /// Reset a context's frontiers for the next seed
    pub fn dump(&self, ctx: &mut ScanContext) {
        ctx.dump();
    }

    /// Clear `flag` on every object. Returns whether anything changed.
    pub fn clear_flags(&mut self, flag: ObjectFlags, record_undo: bool) -> bool {
        let changed = self.board.clear_flags(flag);
        if record_undo {
            for &(object, before) in &changed {
                let mut after = before;
                after.remove(flag);
                self.undo.record_flag_change(object, before, after);
            }
        }
        !changed.is_empty()
    }

    /// Set `flag` on `objects`, optionally recording each change
    pub fn set_flags_on(&mut self, objects: &[ObjectRef], flag: ObjectFlags, record_undo: bool) {
        for &object in objects {
            let Some(before) = self.board.flags(object) else {
                error!("[Find] {}", LogicError::MissingObject(object));
                continue;
            };
            let after = before | flag;
            if after == before {
                continue;
            }
            self.board.set_flags(object, after);
            if record_undo {
                self.undo.record_flag_change(object, before, after);
            }
        }
    }

    /// Mark everything connected to `seed` with FOUND as one undoable step.
    /// Returns whether the lookup was aborted.
    pub fn find_connections(
        &mut self,
        seed: ObjectRef,
        include_rats: bool,
        draw: bool,
    ) -> Result<bool, LogicError> {
        self.clear_flags(ObjectFlags::FOUND, true);
        let mut ctx = self.init_scan();
        ctx.set_record_undo(true);
        let result = self
            .seed(&mut ctx, seed)
            .map(|()| self.run(&mut ctx, ObjectFlags::FOUND, include_rats, draw));
        self.undo.increment_serial();
        result
    }

    /// Add an object to the found set unless it already carries the scan
    /// flag. Returns whether it was added.
    pub(crate) fn add_object(
        &mut self,
        ctx: &mut ScanContext,
        object: ObjectRef,
        from: Option<ObjectRef>,
    ) -> bool {
        let Some(before) = self.board.flags(object) else {
            error!("[Find] {}", LogicError::MissingObject(object));
            return false;
        };
        if ctx.skips(before) {
            return false;
        }

        let pushed = match object {
            ObjectRef::Line { layer, index } => push_layer(&mut ctx.lines, layer, index, ObjectKind::Line),
            ObjectRef::Arc { layer, index } => push_layer(&mut ctx.arcs, layer, index, ObjectKind::Arc),
            ObjectRef::Polygon { layer, index } => {
                push_layer(&mut ctx.polygons, layer, index, ObjectKind::Polygon)
            }
            ObjectRef::Pad { element, index } => {
                let pad = PadRef { element, index };
                match self.board.pad(pad) {
                    Some(p) => push_checked(&mut ctx.pads[p.side.index()], pad, ObjectKind::Pad),
                    None => false,
                }
            }
            ObjectRef::Pin { element, index } => {
                push_checked(&mut ctx.pvs, PvRef::Pin { element, index }, ObjectKind::Pin)
            }
            ObjectRef::Via(index) => push_checked(&mut ctx.pvs, PvRef::Via(index), ObjectKind::Via),
            ObjectRef::Rat(index) => push_checked(&mut ctx.rats, index, ObjectKind::Rat),
            ObjectRef::Element(_) => {
                error!("[Find] {}", LogicError::NotSearchable(ObjectKind::Element));
                false
            }
        };
        if !pushed {
            return false;
        }

        let after = before | ctx.flag;
        self.board.set_flags(object, after);
        if ctx.record_undo {
            self.undo.record_flag_change(object, before, after);
        }
        if ctx.emit_draw {
            trace!("[Find] Found {:?}", object);
        }

        if let Some(accounted) = ctx.abort_on_new {
            if !before.intersects(accounted) {
                ctx.discovery = Some(Discovery { object, from });
                ctx.signal.raise();
            }
        }
        true
    }
}

fn push_layer(
    frontiers: &mut [Frontier<usize>],
    layer: usize,
    index: usize,
    kind: ObjectKind,
) -> bool {
    match frontiers.get_mut(layer) {
        Some(frontier) => push_checked(frontier, index, kind),
        None => {
            error!("[Find] {}", LogicError::BadLayer { layer, count: frontiers.len() });
            false
        }
    }
}

fn push_checked<T: Copy>(frontier: &mut Frontier<T>, item: T, kind: ObjectKind) -> bool {
    if frontier.is_full() {
        error!(
            "[Find] {}",
            LogicError::FrontierOverflow { kind, capacity: frontier.capacity() }
        );
    }
    frontier.push(item);
    true
}
