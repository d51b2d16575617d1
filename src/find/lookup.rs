//! The four expansion passes of a connectivity round
//!
//! 1. PV→PV: pins/vias touching found pins/vias
//! 2. LO→PV: layer objects and rats touching found pins/vias
//! 3. LO→LO: layer objects touching found layer objects within a layer
//!    group, plus whatever sits at the far end of found rats
//! 4. PV→LO: pins/vias touching found layer objects
//!
//! Every visitor checks the abort signal first, so an abort-on-new discovery
//! unwinds out of nested range queries without touching anything else.

use super::engine::ConnectivityEngine;
use super::scan::ScanContext;
use crate::board::{
    BoundingBox, Coord, IndexCategory, LayerObjectView, LayerRole, ObjectFlags, ObjectRef, PadRef, Point,
    PvRef, PvView, Shape, Side,
};
use tracing::warn;

impl<'a> ConnectivityEngine<'a> {
    /// Pass 1. Walks the pin/via frontier without consuming it; pass 2
    /// still has to expand the same entries onto layer objects.
    pub(crate) fn pv_to_pv(&mut self, ctx: &mut ScanContext) {
        let mut position = ctx.pvs.cursor();
        while let Some(source) = ctx.pvs.get(position) {
            position += 1;
            if ctx.is_aborted() {
                return;
            }
            let Some(pv) = self.board.pv(source) else {
                continue;
            };
            self.pvs_touching_pv(ctx, source, &pv);
        }
    }

    fn pvs_touching_pv(&mut self, ctx: &mut ScanContext, source: PvRef, pv: &PvView) {
        let (index, oracle) = (self.index, self.oracle);
        let shape = Shape::of_pv(pv);
        let bounds = shape.bounding_box().bloated(ctx.margin());
        let from = ObjectRef::from(source);
        index.range_query(IndexCategory::PinsVias, &bounds, &mut |candidate| {
            if ctx.is_aborted() || candidate == from {
                return;
            }
            let Some(other_ref) = PvRef::from_object(candidate) else {
                return;
            };
            let Some(other) = self.board.pv(other_ref) else {
                return;
            };
            if ctx.skips(other.flags) || !pv.shares_layers(&other) {
                return;
            }
            if !oracle.touches(&shape, &Shape::of_pv(&other), ctx.bloat) {
                return;
            }
            if pv.is_hole() || other.is_hole() {
                self.warn_hole(from, pv, candidate, &other);
                return;
            }
            self.add_object(ctx, candidate, Some(from));
        });
    }

    /// An unplated hole never conducts; flag it so the overlap can be fixed
    fn warn_hole(&mut self, a: ObjectRef, pa: &PvView, b: ObjectRef, pb: &PvView) {
        for (object, view) in [(a, pa), (b, pb)] {
            if view.is_hole() && !view.flags.contains(ObjectFlags::WARN) {
                self.board.set_flags(object, view.flags | ObjectFlags::WARN);
                warn!(
                    "[Find] Hole {:?} at ({}, {}) is too close to another pin or via",
                    object, view.center.x, view.center.y
                );
            }
        }
    }

    /// Pass 2. Consumes the pin/via frontier.
    pub(crate) fn lo_to_pv(&mut self, ctx: &mut ScanContext) {
        while let Some(source) = ctx.pvs.advance() {
            if ctx.is_aborted() {
                return;
            }
            let Some(pv) = self.board.pv(source) else {
                continue;
            };
            if pv.is_hole() {
                continue;
            }
            let from = ObjectRef::from(source);
            let shape = Shape::of_pv(&pv);
            let bounds = shape.bounding_box().bloated(ctx.margin());

            for layer in 0..self.board.stack.layer_count() {
                if !ctx.layer_participates(layer) || !pv.on_layer(layer) {
                    continue;
                }
                for category in [
                    IndexCategory::Lines(layer),
                    IndexCategory::Arcs(layer),
                    IndexCategory::Polygons(layer),
                ] {
                    self.los_touching_pv(ctx, from, &pv, &shape, Some(layer), category, &bounds);
                }
            }
            for side in Side::ALL {
                let group = self.board.stack.pad_group(side);
                if pv.reaches_group(&self.board.stack, group) {
                    self.los_touching_pv(ctx, from, &pv, &shape, None, IndexCategory::Pads(side), &bounds);
                }
            }
            if ctx.include_rats {
                self.rats_touching_pv(ctx, from, &pv, &shape, &bounds);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn los_touching_pv(
        &mut self,
        ctx: &mut ScanContext,
        from: ObjectRef,
        pv: &PvView,
        shape: &Shape,
        layer: Option<usize>,
        category: IndexCategory,
        bounds: &BoundingBox,
    ) {
        let index = self.index;
        index.range_query(category, bounds, &mut |candidate| {
            if ctx.is_aborted() {
                return;
            }
            let Some(view) = self.board.layer_object(candidate) else {
                return;
            };
            if !ctx.skips(view.flags) && self.pv_touches_lo(pv, shape, layer, &view, ctx.bloat) {
                self.add_object(ctx, candidate, Some(from));
            }
        });
    }

    fn rats_touching_pv(
        &mut self,
        ctx: &mut ScanContext,
        from: ObjectRef,
        pv: &PvView,
        shape: &Shape,
        bounds: &BoundingBox,
    ) {
        let (index, oracle) = (self.index, self.oracle);
        index.range_query(IndexCategory::Rats, bounds, &mut |candidate| {
            if ctx.is_aborted() {
                return;
            }
            let ObjectRef::Rat(rat_index) = candidate else {
                return;
            };
            let Some(rat) = self.board.rat(rat_index) else {
                return;
            };
            if ctx.skips(rat.flags) {
                return;
            }
            let attached = rat.ends().into_iter().any(|(end, group)| {
                pv.reaches_group(&self.board.stack, group)
                    && oracle.touches(&Shape::point(end), shape, 0)
            });
            if attached {
                self.add_object(ctx, candidate, Some(from));
            }
        });
    }

    /// Pass 3. Each layer group is expanded to exhaustion using local
    /// positions; the frontier cursors are left for pass 4.
    pub(crate) fn lo_to_lo(&mut self, ctx: &mut ScanContext) {
        for group in 0..self.board.stack.group_count() {
            if ctx.is_aborted() {
                return;
            }
            self.expand_group(ctx, group);
        }
        self.follow_rats(ctx);
    }

    fn expand_group(&mut self, ctx: &mut ScanContext, group: usize) {
        let layers: Vec<usize> = self
            .board
            .stack
            .group_layers(group)
            .iter()
            .copied()
            .filter(|&layer| ctx.layer_participates(layer))
            .collect();
        let sides: Vec<Side> = self.board.stack.sides_of_group(group).collect();

        let mut line_pos: Vec<usize> = layers.iter().map(|&l| ctx.lines[l].cursor()).collect();
        let mut arc_pos: Vec<usize> = layers.iter().map(|&l| ctx.arcs[l].cursor()).collect();
        let mut poly_pos: Vec<usize> = layers.iter().map(|&l| ctx.polygons[l].cursor()).collect();
        let mut pad_pos: Vec<usize> = sides.iter().map(|s| ctx.pads[s.index()].cursor()).collect();

        loop {
            let mut progressed = false;
            for (slot, &layer) in layers.iter().enumerate() {
                while let Some(index) = ctx.lines[layer].get(line_pos[slot]) {
                    line_pos[slot] += 1;
                    progressed = true;
                    self.los_touching_lo(ctx, ObjectRef::Line { layer, index }, group, &layers, &sides);
                    if ctx.is_aborted() {
                        return;
                    }
                }
                while let Some(index) = ctx.arcs[layer].get(arc_pos[slot]) {
                    arc_pos[slot] += 1;
                    progressed = true;
                    self.los_touching_lo(ctx, ObjectRef::Arc { layer, index }, group, &layers, &sides);
                    if ctx.is_aborted() {
                        return;
                    }
                }
                while let Some(index) = ctx.polygons[layer].get(poly_pos[slot]) {
                    poly_pos[slot] += 1;
                    progressed = true;
                    self.los_touching_lo(ctx, ObjectRef::Polygon { layer, index }, group, &layers, &sides);
                    if ctx.is_aborted() {
                        return;
                    }
                }
            }
            for (slot, side) in sides.iter().enumerate() {
                while let Some(pad) = ctx.pads[side.index()].get(pad_pos[slot]) {
                    pad_pos[slot] += 1;
                    progressed = true;
                    self.los_touching_lo(ctx, pad.into(), group, &layers, &sides);
                    if ctx.is_aborted() {
                        return;
                    }
                }
            }
            if !progressed {
                return;
            }
        }
    }

    fn los_touching_lo(
        &mut self,
        ctx: &mut ScanContext,
        source: ObjectRef,
        group: usize,
        layers: &[usize],
        sides: &[Side],
    ) {
        let Some(view) = self.board.layer_object(source) else {
            return;
        };
        let bounds = view.shape.bounding_box().bloated(ctx.margin());
        for &layer in layers {
            for category in [
                IndexCategory::Lines(layer),
                IndexCategory::Arcs(layer),
                IndexCategory::Polygons(layer),
            ] {
                self.los_touching_view(ctx, source, &view, category, &bounds);
            }
        }
        for &side in sides {
            self.los_touching_view(ctx, source, &view, IndexCategory::Pads(side), &bounds);
        }
        if ctx.include_rats {
            self.rats_touching_lo(ctx, source, &view, group, &bounds);
        }
    }

    fn los_touching_view(
        &mut self,
        ctx: &mut ScanContext,
        source: ObjectRef,
        view: &LayerObjectView,
        category: IndexCategory,
        bounds: &BoundingBox,
    ) {
        let (index, oracle) = (self.index, self.oracle);
        index.range_query(category, bounds, &mut |candidate| {
            if ctx.is_aborted() || candidate == source {
                return;
            }
            let Some(other) = self.board.layer_object(candidate) else {
                return;
            };
            if ctx.skips(other.flags) || view.role.isolated_from(other.role) {
                return;
            }
            if oracle.touches(&view.shape, &other.shape, ctx.bloat) {
                self.add_object(ctx, candidate, Some(source));
            }
        });
    }

    fn rats_touching_lo(
        &mut self,
        ctx: &mut ScanContext,
        source: ObjectRef,
        view: &LayerObjectView,
        group: usize,
        bounds: &BoundingBox,
    ) {
        let (index, oracle) = (self.index, self.oracle);
        index.range_query(IndexCategory::Rats, bounds, &mut |candidate| {
            if ctx.is_aborted() {
                return;
            }
            let ObjectRef::Rat(rat_index) = candidate else {
                return;
            };
            let Some(rat) = self.board.rat(rat_index) else {
                return;
            };
            if ctx.skips(rat.flags) {
                return;
            }
            let attached = rat
                .ends()
                .into_iter()
                .any(|(end, end_group)| end_group == group && oracle.touches(&Shape::point(end), &view.shape, 0));
            if attached {
                self.add_object(ctx, candidate, Some(source));
            }
        });
    }

    /// Consume the rat frontier: whatever sits under either end of a found
    /// rat joins the found set
    fn follow_rats(&mut self, ctx: &mut ScanContext) {
        while let Some(rat_index) = ctx.rats.advance() {
            if ctx.is_aborted() {
                return;
            }
            let Some(rat) = self.board.rat(rat_index) else {
                continue;
            };
            for (end, group) in rat.ends() {
                self.objects_at_rat_end(ctx, ObjectRef::Rat(rat_index), end, group);
                if ctx.is_aborted() {
                    return;
                }
            }
        }
    }

    fn objects_at_rat_end(&mut self, ctx: &mut ScanContext, rat: ObjectRef, end: Point, group: usize) {
        let (index, oracle) = (self.index, self.oracle);
        let probe = Shape::point(end);
        let bounds = BoundingBox::around(end, 1);

        let mut categories: Vec<IndexCategory> = Vec::new();
        for &layer in self.board.stack.group_layers(group) {
            if ctx.layer_participates(layer) {
                categories.extend([
                    IndexCategory::Lines(layer),
                    IndexCategory::Arcs(layer),
                    IndexCategory::Polygons(layer),
                ]);
            }
        }
        categories.extend(self.board.stack.sides_of_group(group).map(IndexCategory::Pads));

        for category in categories {
            index.range_query(category, &bounds, &mut |candidate| {
                if ctx.is_aborted() {
                    return;
                }
                let Some(view) = self.board.layer_object(candidate) else {
                    return;
                };
                if !ctx.skips(view.flags) && oracle.touches(&probe, &view.shape, 0) {
                    self.add_object(ctx, candidate, Some(rat));
                }
            });
        }

        index.range_query(IndexCategory::PinsVias, &bounds, &mut |candidate| {
            if ctx.is_aborted() {
                return;
            }
            let Some(pv) = PvRef::from_object(candidate).and_then(|r| self.board.pv(r)) else {
                return;
            };
            if ctx.skips(pv.flags) || pv.is_hole() || !pv.reaches_group(&self.board.stack, group) {
                return;
            }
            if oracle.touches(&probe, &Shape::of_pv(&pv), 0) {
                self.add_object(ctx, candidate, Some(rat));
            }
        });
    }

    /// Pass 4. Consumes the layer-object frontiers.
    pub(crate) fn pv_to_lo(&mut self, ctx: &mut ScanContext) {
        for layer in 0..ctx.lines.len() {
            while let Some(index) = ctx.lines[layer].advance() {
                self.pvs_touching_lo(ctx, ObjectRef::Line { layer, index }, Some(layer));
                if ctx.is_aborted() {
                    return;
                }
            }
            while let Some(index) = ctx.arcs[layer].advance() {
                self.pvs_touching_lo(ctx, ObjectRef::Arc { layer, index }, Some(layer));
                if ctx.is_aborted() {
                    return;
                }
            }
            while let Some(index) = ctx.polygons[layer].advance() {
                self.pvs_touching_lo(ctx, ObjectRef::Polygon { layer, index }, Some(layer));
                if ctx.is_aborted() {
                    return;
                }
            }
        }
        for side in Side::ALL {
            while let Some(pad) = ctx.pads[side.index()].advance() {
                self.pvs_touching_pad(ctx, pad, side);
                if ctx.is_aborted() {
                    return;
                }
            }
        }
    }

    fn pvs_touching_lo(&mut self, ctx: &mut ScanContext, source: ObjectRef, layer: Option<usize>) {
        let Some(view) = self.board.layer_object(source) else {
            return;
        };
        let index = self.index;
        let bounds = view.shape.bounding_box().bloated(ctx.margin());
        index.range_query(IndexCategory::PinsVias, &bounds, &mut |candidate| {
            if ctx.is_aborted() {
                return;
            }
            let Some(pv) = PvRef::from_object(candidate).and_then(|r| self.board.pv(r)) else {
                return;
            };
            if ctx.skips(pv.flags) || layer.is_some_and(|l| !pv.on_layer(l)) {
                return;
            }
            let shape = Shape::of_pv(&pv);
            if self.pv_touches_lo(&pv, &shape, layer, &view, ctx.bloat) {
                self.add_object(ctx, candidate, Some(source));
            }
        });
    }

    fn pvs_touching_pad(&mut self, ctx: &mut ScanContext, pad: PadRef, side: Side) {
        let group = self.board.stack.pad_group(side);
        let source = ObjectRef::from(pad);
        let Some(view) = self.board.layer_object(source) else {
            return;
        };
        let index = self.index;
        let bounds = view.shape.bounding_box().bloated(ctx.margin());
        index.range_query(IndexCategory::PinsVias, &bounds, &mut |candidate| {
            if ctx.is_aborted() {
                return;
            }
            let Some(pv) = PvRef::from_object(candidate).and_then(|r| self.board.pv(r)) else {
                return;
            };
            if ctx.skips(pv.flags) || !pv.reaches_group(&self.board.stack, group) {
                return;
            }
            let shape = Shape::of_pv(&pv);
            if self.pv_touches_lo(&pv, &shape, None, &view, ctx.bloat) {
                self.add_object(ctx, candidate, Some(source));
            }
        });
    }

    /// Pin/via against a layer object. Holes never conduct. A clearing
    /// polygon only connects to a pin/via without clearance, or through a
    /// thermal on that layer.
    fn pv_touches_lo(
        &self,
        pv: &PvView,
        shape: &Shape,
        layer: Option<usize>,
        view: &LayerObjectView,
        bloat: Coord,
    ) -> bool {
        if pv.is_hole() {
            return false;
        }
        if view.role == (LayerRole::Polygon { clearing: true })
            && pv.clearance > 0
            && !layer.is_some_and(|l| pv.thermal_on(l))
        {
            return false;
        }
        self.oracle.touches(shape, &view.shape, bloat)
    }
}
