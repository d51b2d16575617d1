//! Static per-object rule checks
//!
//! Findings are computed in parallel per layer and per element, then
//! flattened in a fixed order so repeated runs report identically:
//! copper lines, arcs, pins, pads, vias, silk lines, element outlines.

use super::types::{DesignRules, ViolationKind};
use crate::board::{
    Board, Coord, GeometryOracle, IndexCategory, ObjectFlags, ObjectKind, ObjectRef, PvRef, PvView,
    Shape, SpatialIndex,
};
use rayon::prelude::*;

/// A rule breach found by a static check, not yet reported
#[derive(Clone, Debug, PartialEq)]
pub struct Finding {
    pub kind: ViolationKind,
    pub title: String,
    pub object: ObjectRef,
    /// Clearing polygon the object sits in, for the plow test
    pub polygon: Option<ObjectRef>,
    pub measured: Option<Coord>,
    pub required: Coord,
}

impl Finding {
    fn new(kind: ViolationKind, title: impl Into<String>, object: ObjectRef, measured: Coord, required: Coord) -> Self {
        Self {
            kind,
            title: title.into(),
            object,
            polygon: None,
            measured: Some(measured),
            required,
        }
    }

    /// Objects to highlight and list in the violation
    pub fn implicated(&self) -> Vec<ObjectRef> {
        std::iter::once(self.object).chain(self.polygon).collect()
    }
}

/// Shared inputs of every static check
pub struct StaticChecks<'a> {
    pub board: &'a Board,
    pub index: &'a dyn SpatialIndex,
    pub oracle: &'a dyn GeometryOracle,
    pub rules: DesignRules,
}

impl<'a> StaticChecks<'a> {
    pub fn new(
        board: &'a Board,
        index: &'a dyn SpatialIndex,
        oracle: &'a dyn GeometryOracle,
        rules: DesignRules,
    ) -> Self {
        Self { board, index, oracle, rules }
    }

    /// Every finding, in reporting order
    pub fn run(&self) -> Vec<Finding> {
        let start = std::time::Instant::now();
        let mut findings = self.line_findings();
        findings.extend(self.arc_findings());
        findings.extend(self.pin_findings());
        findings.extend(self.pad_findings());
        findings.extend(self.via_findings());
        findings.extend(self.silk_findings());
        findings.extend(self.element_silk_findings());
        tracing::debug!(
            "[DRC] Static checks produced {} findings in {:.2?}",
            findings.len(),
            start.elapsed()
        );
        findings
    }

    fn drc_layers(&self) -> Vec<usize> {
        self.board
            .stack
            .copper_layers()
            .filter(|&layer| !self.board.stack.is_no_drc(layer))
            .collect()
    }

    /// Plow test threshold: clearance cut-outs narrower than twice the bloat
    fn plow_applies(&self, clearance: Coord) -> bool {
        clearance < 2 * self.rules.bloat
    }

    fn plow_finding(&self, object: ObjectRef, kind: ObjectKind, clearance: Coord, polygon: ObjectRef) -> Finding {
        let noun = match kind {
            ObjectKind::Line => "Line",
            ObjectKind::Arc => "Arc",
            ObjectKind::Pad => "Pad",
            ObjectKind::Pin => "Pin",
            _ => "Via",
        };
        Finding {
            kind: ViolationKind::PolygonClearance,
            title: format!("{} with insufficient clearance inside polygon", noun),
            object,
            polygon: Some(polygon),
            measured: Some(clearance / 2),
            required: self.rules.bloat,
        }
    }

    /// First clearing polygon on any of `layers` that `shape` overlaps
    fn plowed_polygon(&self, shape: &Shape, layers: &[usize]) -> Option<ObjectRef> {
        let bounds = shape.bounding_box();
        for &layer in layers {
            let mut hit = None;
            self.index.range_query(IndexCategory::Polygons(layer), &bounds, &mut |candidate| {
                if hit.is_some() {
                    return;
                }
                let Some(view) = self.board.layer_object(candidate) else {
                    return;
                };
                if view.flags.contains(ObjectFlags::CLEAR_POLY) && self.oracle.touches(shape, &view.shape, 0) {
                    hit = Some(candidate);
                }
            });
            if hit.is_some() {
                return hit;
            }
        }
        None
    }

    fn line_findings(&self) -> Vec<Finding> {
        self.drc_layers()
            .par_iter()
            .flat_map_iter(|&layer| {
                let lines = &self.board.layers[layer].lines;
                let mut findings = Vec::new();
                for (index, line) in lines.iter().enumerate() {
                    let object = ObjectRef::Line { layer, index };
                    if line.flags.contains(ObjectFlags::CLEAR_LINE) && self.plow_applies(line.clearance) {
                        if let Some(polygon) = self.plowed_polygon(&Shape::of_line(line), &[layer]) {
                            findings.push(self.plow_finding(object, ObjectKind::Line, line.clearance, polygon));
                        }
                    }
                    if line.thickness < self.rules.min_wid {
                        findings.push(Finding::new(
                            ViolationKind::LineTooThin,
                            "Line width is too thin",
                            object,
                            line.thickness,
                            self.rules.min_wid,
                        ));
                    }
                }
                findings
            })
            .collect()
    }

    fn arc_findings(&self) -> Vec<Finding> {
        self.drc_layers()
            .par_iter()
            .flat_map_iter(|&layer| {
                let arcs = &self.board.layers[layer].arcs;
                let mut findings = Vec::new();
                for (index, arc) in arcs.iter().enumerate() {
                    let object = ObjectRef::Arc { layer, index };
                    if arc.flags.contains(ObjectFlags::CLEAR_LINE) && self.plow_applies(arc.clearance) {
                        if let Some(polygon) = self.plowed_polygon(&Shape::of_arc(arc), &[layer]) {
                            findings.push(self.plow_finding(object, ObjectKind::Arc, arc.clearance, polygon));
                        }
                    }
                    if arc.thickness < self.rules.min_wid {
                        findings.push(Finding::new(
                            ViolationKind::ArcTooThin,
                            "Arc width is too thin",
                            object,
                            arc.thickness,
                            self.rules.min_wid,
                        ));
                    }
                }
                findings
            })
            .collect()
    }

    /// Plow, annular ring and drill checks shared by pins and vias
    fn pv_findings(&self, pv: PvRef, view: &PvView) -> Vec<Finding> {
        let object = ObjectRef::from(pv);
        let (kind, noun, ring_kind, drill_kind) = match pv {
            PvRef::Pin { .. } => (ObjectKind::Pin, "Pin", ViolationKind::PinRingTooSmall, ViolationKind::PinDrillTooSmall),
            PvRef::Via(_) => (ObjectKind::Via, "Via", ViolationKind::ViaRingTooSmall, ViolationKind::ViaDrillTooSmall),
        };
        let mut findings = Vec::new();

        if view.clearance > 0 && self.plow_applies(view.clearance) && !view.is_hole() {
            let layers: Vec<usize> = self
                .drc_layers()
                .into_iter()
                .filter(|&layer| view.on_layer(layer) && !view.thermal_on(layer))
                .collect();
            if let Some(polygon) = self.plowed_polygon(&Shape::of_pv(view), &layers) {
                findings.push(self.plow_finding(object, kind, view.clearance, polygon));
            }
        }
        let ring = (view.thickness - view.drill) / 2;
        if !view.is_hole() && ring < self.rules.min_ring {
            findings.push(Finding::new(
                ring_kind,
                format!("{} annular ring too small", noun),
                object,
                ring,
                self.rules.min_ring,
            ));
        }
        if view.drill < self.rules.min_drill {
            findings.push(Finding::new(
                drill_kind,
                format!("{} drill size is too small", noun),
                object,
                view.drill,
                self.rules.min_drill,
            ));
        }
        findings
    }

    fn pin_findings(&self) -> Vec<Finding> {
        (0..self.board.elements.len())
            .into_par_iter()
            .flat_map_iter(|element| {
                let pins = self.board.elements[element].pins.len();
                (0..pins)
                    .filter_map(move |index| {
                        let pv = PvRef::Pin { element, index };
                        self.board.pv(pv).map(|view| self.pv_findings(pv, &view))
                    })
                    .flatten()
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn pad_findings(&self) -> Vec<Finding> {
        (0..self.board.elements.len())
            .into_par_iter()
            .flat_map_iter(|element| {
                let mut findings = Vec::new();
                for (index, pad) in self.board.elements[element].pads.iter().enumerate() {
                    let object = ObjectRef::Pad { element, index };
                    if pad.clearance > 0 && self.plow_applies(pad.clearance) {
                        let group = self.board.stack.pad_group(pad.side);
                        let layers: Vec<usize> = self
                            .board
                            .stack
                            .group_layers(group)
                            .iter()
                            .copied()
                            .filter(|&layer| !self.board.stack.is_no_drc(layer))
                            .collect();
                        if let Some(polygon) = self.plowed_polygon(&Shape::of_pad(pad), &layers) {
                            findings.push(self.plow_finding(object, ObjectKind::Pad, pad.clearance, polygon));
                        }
                    }
                    if pad.thickness < self.rules.min_wid {
                        findings.push(Finding::new(
                            ViolationKind::PadTooThin,
                            "Pad is too thin",
                            object,
                            pad.thickness,
                            self.rules.min_wid,
                        ));
                    }
                }
                findings
            })
            .collect()
    }

    fn via_findings(&self) -> Vec<Finding> {
        (0..self.board.vias.len())
            .into_par_iter()
            .flat_map_iter(|index| {
                let pv = PvRef::Via(index);
                self.board
                    .pv(pv)
                    .map(|view| self.pv_findings(pv, &view))
                    .unwrap_or_default()
            })
            .collect()
    }

    fn silk_findings(&self) -> Vec<Finding> {
        let silk_layers: Vec<usize> = self.board.stack.silk_layers().collect();
        silk_layers
            .par_iter()
            .flat_map_iter(|&layer| {
                self.board.layers[layer]
                    .lines
                    .iter()
                    .enumerate()
                    .filter(|(_, line)| line.thickness < self.rules.min_slk)
                    .map(move |(index, line)| {
                        Finding::new(
                            ViolationKind::SilkTooThin,
                            "Silk line is too thin",
                            ObjectRef::Line { layer, index },
                            line.thickness,
                            self.rules.min_slk,
                        )
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// One finding per element, covering all of its thin outline lines.
    /// The measured value is how many lines are too thin.
    fn element_silk_findings(&self) -> Vec<Finding> {
        self.board
            .elements
            .par_iter()
            .enumerate()
            .filter_map(|(index, element)| {
                let thin = element
                    .silk
                    .iter()
                    .filter(|line| line.thickness < self.rules.min_slk)
                    .count();
                if thin == 0 {
                    return None;
                }
                Some(Finding::new(
                    ViolationKind::ElementSilkTooThin,
                    format!("Element {} has {} silk lines which are too thin", element.name, thin),
                    ObjectRef::Element(index),
                    thin as Coord,
                    self.rules.min_slk,
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BoardIndex, CopperGeometry, Element, LayerStack, Line, Pin, Point, Polygon, Via};

    fn findings(board: &Board) -> Vec<Finding> {
        let index = BoardIndex::build(board);
        StaticChecks::new(board, &index, &CopperGeometry, board.rules).run()
    }

    fn lenient() -> DesignRules {
        DesignRules { bloat: 100, shrink: 0, min_wid: 10, min_slk: 10, min_drill: 10, min_ring: 10 }
    }

    #[test]
    fn test_thin_line_and_arc() {
        let mut board = Board::new("checks", LayerStack::two_layer()).with_rules(lenient());
        board.add_line(0, Line::new(Point::new(0, 0), Point::new(100, 0), 5, 0)).unwrap();
        board.add_line(0, Line::new(Point::new(0, 50), Point::new(100, 50), 20, 0)).unwrap();
        let found = findings(&board);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Line width is too thin");
        assert_eq!(found[0].measured, Some(5));
        assert_eq!(found[0].required, 10);
    }

    #[test]
    fn test_hole_has_no_ring_check() {
        let mut board = Board::new("checks", LayerStack::two_layer()).with_rules(lenient());
        board.add_via(Via::new(Point::new(0, 0), 30, 0, 30).with_flags(ObjectFlags::HOLE)).unwrap();
        board.add_via(Via::new(Point::new(500, 0), 30, 0, 30)).unwrap();
        let found = findings(&board);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].object, ObjectRef::Via(1));
        assert_eq!(found[0].title, "Via annular ring too small");
        assert_eq!(found[0].measured, Some(0));
    }

    #[test]
    fn test_plow_skips_thermal_layer() {
        let mut board = Board::new("checks", LayerStack::two_layer()).with_rules(lenient());
        board
            .add_polygon(0, Polygon::rectangle(-1000, -1000, 1000, 1000).with_flags(ObjectFlags::CLEAR_POLY))
            .unwrap();
        board.add_element(
            Element::new("J1", Point::new(0, 0))
                .with_pin(Pin::new("1", Point::new(0, 0), 100, 50, 40))
                .with_pin(Pin::new("2", Point::new(400, 0), 100, 50, 40).with_thermal(0)),
        );
        let found = findings(&board);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Pin with insufficient clearance inside polygon");
        assert_eq!(found[0].object, ObjectRef::Pin { element: 0, index: 0 });
        assert_eq!(found[0].polygon, Some(ObjectRef::Polygon { layer: 0, index: 0 }));
        assert_eq!(found[0].measured, Some(25));
        assert_eq!(found[0].required, 100);
    }

    #[test]
    fn test_element_silk_single_finding() {
        let mut board = Board::new("checks", LayerStack::two_layer()).with_rules(lenient());
        board.add_element(
            Element::new("U7", Point::new(0, 0))
                .with_silk_line(Point::new(0, 0), Point::new(10, 0), 5)
                .with_silk_line(Point::new(10, 0), Point::new(10, 10), 6)
                .with_silk_line(Point::new(10, 10), Point::new(0, 10), 20),
        );
        board.add_line(2, Line::new(Point::new(0, 0), Point::new(50, 0), 3, 0)).unwrap();
        let found = findings(&board);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].title, "Silk line is too thin");
        assert_eq!(found[1].title, "Element U7 has 2 silk lines which are too thin");
        assert_eq!(found[1].measured, Some(2));
    }
}
