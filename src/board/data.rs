//! In-memory board graph
//!
//! The board owns every object. Connectivity scans never move objects around;
//! they only flip flag bits, so objects are addressed by `ObjectRef` indices.

use super::layers::LayerStack;
use super::shapes::Shape;
use super::types::{
    Arc, BoundingBox, Coord, Element, Line, ObjectFlags, ObjectRef, Pad, PadRef, Point, Polygon,
    PvRef, LayerMask, LayerSpan, Rat, Side, Via,
};
use crate::drc::DesignRules;
use crate::error::BoardError;

/// Objects living on one physical layer
#[derive(Debug, Clone, Default)]
pub struct LayerData {
    pub lines: Vec<Line>,
    pub arcs: Vec<Arc>,
    pub polygons: Vec<Polygon>,
}

/// Object counts used to size scan frontiers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectCounts {
    pub lines: Vec<usize>,
    pub arcs: Vec<usize>,
    pub polygons: Vec<usize>,
    pub pads: [usize; 2],
    pub pins_vias: usize,
    pub rats: usize,
}

/// Uniform read-only view of a pin or a via
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PvView {
    pub id: u64,
    pub center: Point,
    pub thickness: Coord,
    pub clearance: Coord,
    pub drill: Coord,
    pub flags: ObjectFlags,
    pub thermals: LayerMask,
    pub span: Option<LayerSpan>,
}

impl PvView {
    pub fn is_hole(&self) -> bool {
        self.flags.contains(ObjectFlags::HOLE)
    }

    pub fn on_layer(&self, layer: usize) -> bool {
        self.span.map_or(true, |span| span.contains(layer))
    }

    /// Whether the barrel reaches any copper layer of `group`
    pub fn reaches_group(&self, stack: &LayerStack, group: usize) -> bool {
        stack.group_layers(group).iter().any(|&layer| self.on_layer(layer))
    }

    pub fn thermal_on(&self, layer: usize) -> bool {
        layer < 64 && self.thermals & (1 << layer) != 0
    }

    /// Two barrels share at least one copper layer
    pub fn shares_layers(&self, other: &PvView) -> bool {
        match (self.span, other.span) {
            (Some(a), Some(b)) => a.overlaps(&b),
            _ => true,
        }
    }
}

/// How a layer object interacts with clearing polygons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerRole {
    /// Line or arc; `clears` when it requests a polygon cut-out
    Trace { clears: bool },
    /// Pad; `clears` when its clearance is non-zero
    Pad { clears: bool },
    /// Polygon; `clearing` when it cuts clearance around other objects
    Polygon { clearing: bool },
}

impl LayerRole {
    /// Two layer objects are isolated when a clearing polygon meets an
    /// object that asks to be cleared
    pub fn isolated_from(self, other: LayerRole) -> bool {
        fn clears(role: LayerRole) -> bool {
            matches!(role, LayerRole::Trace { clears: true } | LayerRole::Pad { clears: true })
        }
        match (self, other) {
            (LayerRole::Polygon { clearing: true }, o) => clears(o),
            (o, LayerRole::Polygon { clearing: true }) => clears(o),
            _ => false,
        }
    }
}

/// Geometry and role of a line, arc, polygon or pad
#[derive(Debug, Clone)]
pub struct LayerObjectView {
    pub shape: Shape,
    pub flags: ObjectFlags,
    pub role: LayerRole,
}

/// A complete board: layer stack, rules and every object
#[derive(Debug, Clone)]
pub struct Board {
    pub name: String,
    pub stack: LayerStack,
    pub rules: DesignRules,
    pub layers: Vec<LayerData>,
    pub elements: Vec<Element>,
    pub vias: Vec<Via>,
    pub rats: Vec<Rat>,
    next_id: u64,
}

impl Board {
    pub fn new(name: impl Into<String>, stack: LayerStack) -> Self {
        let layers = vec![LayerData::default(); stack.layer_count()];
        Self {
            name: name.into(),
            stack,
            rules: DesignRules::default(),
            layers,
            elements: Vec::new(),
            vias: Vec::new(),
            rats: Vec::new(),
            next_id: 1,
        }
    }

    pub fn with_rules(mut self, rules: DesignRules) -> Self {
        self.rules = rules;
        self
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn check_layer(&self, layer: usize) -> Result<(), BoardError> {
        if layer >= self.layers.len() {
            return Err(BoardError::BadLayer { layer, count: self.layers.len() });
        }
        Ok(())
    }

    /// Add a copper or silk line
    pub fn add_line(&mut self, layer: usize, mut line: Line) -> Result<ObjectRef, BoardError> {
        self.check_layer(layer)?;
        line.id = self.allocate_id();
        let lines = &mut self.layers[layer].lines;
        lines.push(line);
        Ok(ObjectRef::Line { layer, index: lines.len() - 1 })
    }

    /// Add a copper or silk arc
    pub fn add_arc(&mut self, layer: usize, mut arc: Arc) -> Result<ObjectRef, BoardError> {
        self.check_layer(layer)?;
        arc.id = self.allocate_id();
        let arcs = &mut self.layers[layer].arcs;
        arcs.push(arc);
        Ok(ObjectRef::Arc { layer, index: arcs.len() - 1 })
    }

    /// Add a copper polygon
    pub fn add_polygon(&mut self, layer: usize, mut polygon: Polygon) -> Result<ObjectRef, BoardError> {
        self.check_layer(layer)?;
        if !self.stack.is_copper(layer) {
            return Err(BoardError::NotCopper(layer));
        }
        if polygon.points.len() < 3 {
            return Err(BoardError::DegeneratePolygon(polygon.points.len()));
        }
        polygon.id = self.allocate_id();
        let polygons = &mut self.layers[layer].polygons;
        polygons.push(polygon);
        Ok(ObjectRef::Polygon { layer, index: polygons.len() - 1 })
    }

    pub fn add_via(&mut self, mut via: Via) -> Result<ObjectRef, BoardError> {
        if let Some(span) = via.span {
            for layer in [span.from, span.to] {
                if !self.stack.is_copper(layer) {
                    return Err(BoardError::NotCopper(layer));
                }
            }
        }
        via.id = self.allocate_id();
        self.vias.push(via);
        Ok(ObjectRef::Via(self.vias.len() - 1))
    }

    /// Add an element, assigning IDs to it and every pin and pad it owns
    pub fn add_element(&mut self, mut element: Element) -> ObjectRef {
        element.id = self.allocate_id();
        for pin in &mut element.pins {
            pin.id = self.next_id;
            self.next_id += 1;
        }
        for pad in &mut element.pads {
            pad.id = self.next_id;
            self.next_id += 1;
        }
        self.elements.push(element);
        ObjectRef::Element(self.elements.len() - 1)
    }

    pub fn add_rat(&mut self, mut rat: Rat) -> Result<ObjectRef, BoardError> {
        let count = self.stack.group_count();
        for group in [rat.group1, rat.group2] {
            if group >= count {
                return Err(BoardError::BadGroup { group, count });
            }
        }
        rat.id = self.allocate_id();
        self.rats.push(rat);
        Ok(ObjectRef::Rat(self.rats.len() - 1))
    }

    /// Reference to pin `index` of element `element`
    pub fn pin_ref(&self, element: usize, index: usize) -> Option<ObjectRef> {
        self.elements.get(element)?.pins.get(index)?;
        Some(ObjectRef::Pin { element, index })
    }

    pub fn line(&self, layer: usize, index: usize) -> Option<&Line> {
        self.layers.get(layer)?.lines.get(index)
    }

    pub fn arc(&self, layer: usize, index: usize) -> Option<&Arc> {
        self.layers.get(layer)?.arcs.get(index)
    }

    pub fn polygon(&self, layer: usize, index: usize) -> Option<&Polygon> {
        self.layers.get(layer)?.polygons.get(index)
    }

    pub fn pad(&self, pad: PadRef) -> Option<&Pad> {
        self.elements.get(pad.element)?.pads.get(pad.index)
    }

    pub fn rat(&self, index: usize) -> Option<&Rat> {
        self.rats.get(index)
    }

    pub fn pv(&self, pv: PvRef) -> Option<PvView> {
        match pv {
            PvRef::Pin { element, index } => {
                let pin = self.elements.get(element)?.pins.get(index)?;
                Some(PvView {
                    id: pin.id,
                    center: pin.center,
                    thickness: pin.thickness,
                    clearance: pin.clearance,
                    drill: pin.drill,
                    flags: pin.flags,
                    thermals: pin.thermals,
                    span: None,
                })
            }
            PvRef::Via(index) => {
                let via = self.vias.get(index)?;
                Some(PvView {
                    id: via.id,
                    center: via.center,
                    thickness: via.thickness,
                    clearance: via.clearance,
                    drill: via.drill,
                    flags: via.flags,
                    thermals: via.thermals,
                    span: via.span,
                })
            }
        }
    }

    /// Shape and polygon-clearance role of a line, arc, polygon or pad
    pub fn layer_object(&self, object: ObjectRef) -> Option<LayerObjectView> {
        match object {
            ObjectRef::Line { layer, index } => {
                let line = self.line(layer, index)?;
                Some(LayerObjectView {
                    shape: Shape::of_line(line),
                    flags: line.flags,
                    role: LayerRole::Trace { clears: line.flags.contains(ObjectFlags::CLEAR_LINE) },
                })
            }
            ObjectRef::Arc { layer, index } => {
                let arc = self.arc(layer, index)?;
                Some(LayerObjectView {
                    shape: Shape::of_arc(arc),
                    flags: arc.flags,
                    role: LayerRole::Trace { clears: arc.flags.contains(ObjectFlags::CLEAR_LINE) },
                })
            }
            ObjectRef::Polygon { layer, index } => {
                let polygon = self.polygon(layer, index)?;
                Some(LayerObjectView {
                    shape: Shape::of_polygon(polygon),
                    flags: polygon.flags,
                    role: LayerRole::Polygon {
                        clearing: polygon.flags.contains(ObjectFlags::CLEAR_POLY),
                    },
                })
            }
            ObjectRef::Pad { element, index } => {
                let pad = self.pad(PadRef { element, index })?;
                Some(LayerObjectView {
                    shape: Shape::of_pad(pad),
                    flags: pad.flags,
                    role: LayerRole::Pad { clears: pad.clearance > 0 },
                })
            }
            _ => None,
        }
    }

    /// Shape of any searchable object, used for bounding boxes and reporting
    pub fn shape(&self, object: ObjectRef) -> Option<Shape> {
        match object {
            ObjectRef::Pin { element, index } => self.pv(PvRef::Pin { element, index }).map(|pv| Shape::of_pv(&pv)),
            ObjectRef::Via(index) => self.pv(PvRef::Via(index)).map(|pv| Shape::of_pv(&pv)),
            ObjectRef::Rat(index) => self.rat(index).map(Shape::of_rat),
            ObjectRef::Element(_) => None,
            other => self.layer_object(other).map(|view| view.shape),
        }
    }

    pub fn flags(&self, object: ObjectRef) -> Option<ObjectFlags> {
        match object {
            ObjectRef::Line { layer, index } => self.line(layer, index).map(|o| o.flags),
            ObjectRef::Arc { layer, index } => self.arc(layer, index).map(|o| o.flags),
            ObjectRef::Polygon { layer, index } => self.polygon(layer, index).map(|o| o.flags),
            ObjectRef::Pin { element, index } => {
                self.elements.get(element)?.pins.get(index).map(|o| o.flags)
            }
            ObjectRef::Via(index) => self.vias.get(index).map(|o| o.flags),
            ObjectRef::Pad { element, index } => self.pad(PadRef { element, index }).map(|o| o.flags),
            ObjectRef::Element(index) => self.elements.get(index).map(|o| o.flags),
            ObjectRef::Rat(index) => self.rats.get(index).map(|o| o.flags),
        }
    }

    fn flags_mut(&mut self, object: ObjectRef) -> Option<&mut ObjectFlags> {
        match object {
            ObjectRef::Line { layer, index } => {
                self.layers.get_mut(layer)?.lines.get_mut(index).map(|o| &mut o.flags)
            }
            ObjectRef::Arc { layer, index } => {
                self.layers.get_mut(layer)?.arcs.get_mut(index).map(|o| &mut o.flags)
            }
            ObjectRef::Polygon { layer, index } => {
                self.layers.get_mut(layer)?.polygons.get_mut(index).map(|o| &mut o.flags)
            }
            ObjectRef::Pin { element, index } => {
                self.elements.get_mut(element)?.pins.get_mut(index).map(|o| &mut o.flags)
            }
            ObjectRef::Via(index) => self.vias.get_mut(index).map(|o| &mut o.flags),
            ObjectRef::Pad { element, index } => {
                self.elements.get_mut(element)?.pads.get_mut(index).map(|o| &mut o.flags)
            }
            ObjectRef::Element(index) => self.elements.get_mut(index).map(|o| &mut o.flags),
            ObjectRef::Rat(index) => self.rats.get_mut(index).map(|o| &mut o.flags),
        }
    }

    /// Overwrite an object's flags; returns false for a stale reference
    pub fn set_flags(&mut self, object: ObjectRef, flags: ObjectFlags) -> bool {
        match self.flags_mut(object) {
            Some(slot) => {
                *slot = flags;
                true
            }
            None => false,
        }
    }

    pub fn object_id(&self, object: ObjectRef) -> Option<u64> {
        match object {
            ObjectRef::Line { layer, index } => self.line(layer, index).map(|o| o.id),
            ObjectRef::Arc { layer, index } => self.arc(layer, index).map(|o| o.id),
            ObjectRef::Polygon { layer, index } => self.polygon(layer, index).map(|o| o.id),
            ObjectRef::Pin { element, index } => self.pv(PvRef::Pin { element, index }).map(|o| o.id),
            ObjectRef::Via(index) => self.vias.get(index).map(|o| o.id),
            ObjectRef::Pad { element, index } => self.pad(PadRef { element, index }).map(|o| o.id),
            ObjectRef::Element(index) => self.elements.get(index).map(|o| o.id),
            ObjectRef::Rat(index) => self.rats.get(index).map(|o| o.id),
        }
    }

    /// Reference point used to place a violation marker
    pub fn locate(&self, object: ObjectRef) -> Option<Point> {
        match object {
            ObjectRef::Line { layer, index } => {
                self.line(layer, index).map(|l| l.point1.midpoint(l.point2))
            }
            ObjectRef::Arc { layer, index } => self
                .arc(layer, index)
                .map(|a| a.point_at(a.start_angle + a.delta / 2.0)),
            ObjectRef::Polygon { layer, index } => self
                .polygon(layer, index)
                .and_then(|p| BoundingBox::from_points(&p.points))
                .map(|bbox| bbox.center()),
            ObjectRef::Pin { element, index } => self.pv(PvRef::Pin { element, index }).map(|p| p.center),
            ObjectRef::Via(index) => self.vias.get(index).map(|v| v.center),
            ObjectRef::Pad { element, index } => self
                .pad(PadRef { element, index })
                .map(|p| p.point1.midpoint(p.point2)),
            ObjectRef::Element(index) => self.elements.get(index).map(|e| e.mark),
            ObjectRef::Rat(index) => self.rats.get(index).map(|r| r.point1.midpoint(r.point2)),
        }
    }

    /// Every object in canonical board order: elements with their pins and
    /// pads, vias, per-layer lines/arcs/polygons, rats
    pub fn objects(&self) -> Vec<ObjectRef> {
        let mut objects = Vec::new();
        for (e, element) in self.elements.iter().enumerate() {
            objects.push(ObjectRef::Element(e));
            objects.extend((0..element.pins.len()).map(|index| ObjectRef::Pin { element: e, index }));
            objects.extend((0..element.pads.len()).map(|index| ObjectRef::Pad { element: e, index }));
        }
        objects.extend((0..self.vias.len()).map(ObjectRef::Via));
        for (layer, data) in self.layers.iter().enumerate() {
            objects.extend((0..data.lines.len()).map(|index| ObjectRef::Line { layer, index }));
            objects.extend((0..data.arcs.len()).map(|index| ObjectRef::Arc { layer, index }));
            objects.extend((0..data.polygons.len()).map(|index| ObjectRef::Polygon { layer, index }));
        }
        objects.extend((0..self.rats.len()).map(ObjectRef::Rat));
        objects
    }

    /// Objects carrying every bit of `flag`, canonical order
    pub fn objects_with_flag(&self, flag: ObjectFlags) -> Vec<ObjectRef> {
        self.objects()
            .into_iter()
            .filter(|&object| self.flags(object).is_some_and(|f| f.contains(flag)))
            .collect()
    }

    /// Clear `flag` everywhere. Returns each changed object with its previous flags.
    pub fn clear_flags(&mut self, flag: ObjectFlags) -> Vec<(ObjectRef, ObjectFlags)> {
        let mut changed = Vec::new();
        for object in self.objects() {
            if let Some(slot) = self.flags_mut(object) {
                if slot.intersects(flag) {
                    let before = *slot;
                    slot.remove(flag);
                    changed.push((object, before));
                }
            }
        }
        changed
    }

    /// Snapshot of every object's flags, canonical order
    pub fn flag_snapshot(&self) -> Vec<(ObjectRef, ObjectFlags)> {
        self.objects()
            .into_iter()
            .filter_map(|object| self.flags(object).map(|flags| (object, flags)))
            .collect()
    }

    pub fn counts(&self) -> ObjectCounts {
        let mut pads = [0usize; 2];
        for pad in self.elements.iter().flat_map(|e| e.pads.iter()) {
            pads[pad.side.index()] += 1;
        }
        ObjectCounts {
            lines: self.layers.iter().map(|l| l.lines.len()).collect(),
            arcs: self.layers.iter().map(|l| l.arcs.len()).collect(),
            polygons: self.layers.iter().map(|l| l.polygons.len()).collect(),
            pads,
            pins_vias: self.elements.iter().map(|e| e.pins.len()).sum::<usize>() + self.vias.len(),
            rats: self.rats.len(),
        }
    }

    /// Pad references on `side`, element order
    pub fn pads_on(&self, side: Side) -> impl Iterator<Item = PadRef> + '_ {
        self.elements.iter().enumerate().flat_map(move |(element, e)| {
            e.pads
                .iter()
                .enumerate()
                .filter(move |(_, pad)| pad.side == side)
                .map(move |(index, _)| PadRef { element, index })
        })
    }

    /// Pin and via references, element order then vias
    pub fn pins_and_vias(&self) -> impl Iterator<Item = PvRef> + '_ {
        self.elements
            .iter()
            .enumerate()
            .flat_map(|(element, e)| (0..e.pins.len()).map(move |index| PvRef::Pin { element, index }))
            .chain((0..self.vias.len()).map(PvRef::Via))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{LayerStack, Pin};

    fn board() -> Board {
        Board::new("test", LayerStack::two_layer())
    }

    #[test]
    fn test_ids_are_unique_and_stable() {
        let mut board = board();
        let line = board
            .add_line(0, Line::new(Point::new(0, 0), Point::new(10, 0), 5, 0))
            .unwrap();
        let element = board.add_element(
            Element::new("U1", Point::new(0, 0))
                .with_pin(Pin::new("1", Point::new(0, 0), 100, 10, 50))
                .with_pin(Pin::new("2", Point::new(200, 0), 100, 10, 50)),
        );
        let pin = board.pin_ref(0, 1).unwrap();
        let ids = [board.object_id(line), board.object_id(element), board.object_id(pin)];
        assert_eq!(ids, [Some(1), Some(2), Some(4)]);
    }

    #[test]
    fn test_polygon_rejected_on_silk() {
        let mut board = board();
        let err = board.add_polygon(2, Polygon::rectangle(0, 0, 10, 10)).unwrap_err();
        assert_eq!(err, BoardError::NotCopper(2));
    }

    #[test]
    fn test_clear_flags_reports_changes() {
        let mut board = board();
        let a = board.add_line(0, Line::new(Point::new(0, 0), Point::new(1, 0), 1, 0)).unwrap();
        let b = board.add_line(0, Line::new(Point::new(5, 0), Point::new(6, 0), 1, 0)).unwrap();
        board.set_flags(a, ObjectFlags::FOUND | ObjectFlags::SQUARE);
        let changed = board.clear_flags(ObjectFlags::FOUND);
        assert_eq!(changed, vec![(a, ObjectFlags::FOUND | ObjectFlags::SQUARE)]);
        assert_eq!(board.flags(a), Some(ObjectFlags::SQUARE));
        assert_eq!(board.flags(b), Some(ObjectFlags::NONE));
    }

    #[test]
    fn test_clearing_polygon_isolates_clear_lines_only() {
        let poly = LayerRole::Polygon { clearing: true };
        assert!(poly.isolated_from(LayerRole::Trace { clears: true }));
        assert!(LayerRole::Pad { clears: true }.isolated_from(poly));
        assert!(!poly.isolated_from(LayerRole::Trace { clears: false }));
        assert!(!poly.isolated_from(LayerRole::Polygon { clearing: true }));
    }
}
