//! Core board object types
//!
//! Points, bounding boxes, flag bitsets and the copper/silk objects that make
//! up a board. Coordinates are integer nanometres.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

/// Board coordinate in nanometres
pub type Coord = i64;

/// A 2D board point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: Coord,
    pub y: Coord,
}

impl Point {
    pub const fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2, (self.y + other.y) / 2)
    }
}

/// Axis-aligned bounding box, inclusive on all sides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x1: Coord,
    pub y1: Coord,
    pub x2: Coord,
    pub y2: Coord,
}

impl BoundingBox {
    pub fn new(x1: Coord, y1: Coord, x2: Coord, y2: Coord) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    /// Box around a single point grown by `radius` on every side
    pub fn around(center: Point, radius: Coord) -> Self {
        Self::new(
            center.x - radius,
            center.y - radius,
            center.x + radius,
            center.y + radius,
        )
    }

    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let mut bbox = Self::around(*first, 0);
        for p in &points[1..] {
            bbox.x1 = bbox.x1.min(p.x);
            bbox.y1 = bbox.y1.min(p.y);
            bbox.x2 = bbox.x2.max(p.x);
            bbox.y2 = bbox.y2.max(p.y);
        }
        Some(bbox)
    }

    /// Grow (or, for negative `amount`, shrink) the box on every side.
    /// A shrink never inverts the box; it collapses onto the centre instead.
    pub fn bloated(&self, amount: Coord) -> Self {
        let center = self.center();
        let x1 = (self.x1 - amount).min(center.x);
        let y1 = (self.y1 - amount).min(center.y);
        let x2 = (self.x2 + amount).max(center.x);
        let y2 = (self.y2 + amount).max(center.y);
        Self { x1, y1, x2, y2 }
    }

    pub fn union(&self, other: &BoundingBox) -> Self {
        Self {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.x1 <= other.x2 && other.x1 <= self.x2 && self.y1 <= other.y2 && other.y1 <= self.y2
    }

    pub fn center(&self) -> Point {
        Point::new((self.x1 + self.x2) / 2, (self.y1 + self.y2) / 2)
    }
}

/// Object flag bitset
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ObjectFlags(u32);

impl ObjectFlags {
    pub const NONE: ObjectFlags = ObjectFlags(0);
    /// Member of the current connection scan
    pub const FOUND: ObjectFlags = ObjectFlags(1 << 0);
    /// Selected / highlighted; also the DRC "already accounted for" marker
    pub const SELECTED: ObjectFlags = ObjectFlags(1 << 1);
    /// Net has already been design-rule checked
    pub const DRC: ObjectFlags = ObjectFlags(1 << 2);
    /// Unplated hole: never conducts
    pub const HOLE: ObjectFlags = ObjectFlags(1 << 3);
    pub const SQUARE: ObjectFlags = ObjectFlags(1 << 4);
    pub const OCTAGON: ObjectFlags = ObjectFlags(1 << 5);
    /// Polygon cuts clearance around objects that request it
    pub const CLEAR_POLY: ObjectFlags = ObjectFlags(1 << 6);
    /// Line/arc requests a clearance cut-out from clearing polygons
    pub const CLEAR_LINE: ObjectFlags = ObjectFlags(1 << 7);
    /// Thermal relief present on at least one layer
    pub const THERM: ObjectFlags = ObjectFlags(1 << 8);
    /// Hole found too close to copper
    pub const WARN: ObjectFlags = ObjectFlags(1 << 9);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// All bits of `other` are set
    pub const fn contains(self, other: ObjectFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Any bit of `other` is set
    pub const fn intersects(self, other: ObjectFlags) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: ObjectFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: ObjectFlags) {
        self.0 &= !other.0;
    }
}

impl BitOr for ObjectFlags {
    type Output = ObjectFlags;
    fn bitor(self, rhs: ObjectFlags) -> ObjectFlags {
        ObjectFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for ObjectFlags {
    fn bitor_assign(&mut self, rhs: ObjectFlags) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ObjectFlags {
    type Output = ObjectFlags;
    fn bitand(self, rhs: ObjectFlags) -> ObjectFlags {
        ObjectFlags(self.0 & rhs.0)
    }
}

impl Not for ObjectFlags {
    type Output = ObjectFlags;
    fn not(self) -> ObjectFlags {
        ObjectFlags(!self.0)
    }
}

impl fmt::Debug for ObjectFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: &[(ObjectFlags, &str)] = &[
            (ObjectFlags::FOUND, "FOUND"),
            (ObjectFlags::SELECTED, "SELECTED"),
            (ObjectFlags::DRC, "DRC"),
            (ObjectFlags::HOLE, "HOLE"),
            (ObjectFlags::SQUARE, "SQUARE"),
            (ObjectFlags::OCTAGON, "OCTAGON"),
            (ObjectFlags::CLEAR_POLY, "CLEAR_POLY"),
            (ObjectFlags::CLEAR_LINE, "CLEAR_LINE"),
            (ObjectFlags::THERM, "THERM"),
            (ObjectFlags::WARN, "WARN"),
        ];
        let names: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "ObjectFlags({})", names.join(" | "))
    }
}

/// Board side a pad sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Top,
    Bottom,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Top, Side::Bottom];

    pub const fn index(self) -> usize {
        match self {
            Side::Top => 0,
            Side::Bottom => 1,
        }
    }
}

/// Inclusive range of copper layer indices a buried via connects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSpan {
    pub from: usize,
    pub to: usize,
}

impl LayerSpan {
    pub fn new(a: usize, b: usize) -> Self {
        Self { from: a.min(b), to: a.max(b) }
    }

    pub fn contains(&self, layer: usize) -> bool {
        (self.from..=self.to).contains(&layer)
    }

    pub fn overlaps(&self, other: &LayerSpan) -> bool {
        self.from <= other.to && other.from <= self.to
    }
}

/// Kind tag for any board object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Line,
    Arc,
    Polygon,
    Pin,
    Via,
    Pad,
    Element,
    Rat,
}

/// Identity of a board object, enough to look it up again and locate it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectRef {
    Line { layer: usize, index: usize },
    Arc { layer: usize, index: usize },
    Polygon { layer: usize, index: usize },
    Pin { element: usize, index: usize },
    Via(usize),
    Pad { element: usize, index: usize },
    Element(usize),
    Rat(usize),
}

impl ObjectRef {
    pub fn kind(&self) -> ObjectKind {
        match self {
            ObjectRef::Line { .. } => ObjectKind::Line,
            ObjectRef::Arc { .. } => ObjectKind::Arc,
            ObjectRef::Polygon { .. } => ObjectKind::Polygon,
            ObjectRef::Pin { .. } => ObjectKind::Pin,
            ObjectRef::Via(_) => ObjectKind::Via,
            ObjectRef::Pad { .. } => ObjectKind::Pad,
            ObjectRef::Element(_) => ObjectKind::Element,
            ObjectRef::Rat(_) => ObjectKind::Rat,
        }
    }

    /// Copper layer of a line, arc or polygon
    pub fn layer(&self) -> Option<usize> {
        match *self {
            ObjectRef::Line { layer, .. }
            | ObjectRef::Arc { layer, .. }
            | ObjectRef::Polygon { layer, .. } => Some(layer),
            _ => None,
        }
    }
}

/// Pin or via reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PvRef {
    Pin { element: usize, index: usize },
    Via(usize),
}

impl From<PvRef> for ObjectRef {
    fn from(pv: PvRef) -> Self {
        match pv {
            PvRef::Pin { element, index } => ObjectRef::Pin { element, index },
            PvRef::Via(index) => ObjectRef::Via(index),
        }
    }
}

impl PvRef {
    pub fn from_object(object: ObjectRef) -> Option<Self> {
        match object {
            ObjectRef::Pin { element, index } => Some(PvRef::Pin { element, index }),
            ObjectRef::Via(index) => Some(PvRef::Via(index)),
            _ => None,
        }
    }
}

/// Pad reference (pads always belong to an element)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PadRef {
    pub element: usize,
    pub index: usize,
}

impl From<PadRef> for ObjectRef {
    fn from(pad: PadRef) -> Self {
        ObjectRef::Pad { element: pad.element, index: pad.index }
    }
}

/// Copper or silk trace segment
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub id: u64,
    pub point1: Point,
    pub point2: Point,
    pub thickness: Coord,
    pub clearance: Coord,
    pub flags: ObjectFlags,
}

impl Line {
    pub fn new(point1: Point, point2: Point, thickness: Coord, clearance: Coord) -> Self {
        Self { id: 0, point1, point2, thickness, clearance, flags: ObjectFlags::NONE }
    }

    pub fn with_flags(mut self, flags: ObjectFlags) -> Self {
        self.flags |= flags;
        self
    }
}

/// Circular arc trace. Angles are in degrees, counter-clockwise from +x.
#[derive(Debug, Clone, PartialEq)]
pub struct Arc {
    pub id: u64,
    pub center: Point,
    pub radius: Coord,
    pub start_angle: f64,
    pub delta: f64,
    pub thickness: Coord,
    pub clearance: Coord,
    pub flags: ObjectFlags,
}

impl Arc {
    pub fn new(
        center: Point,
        radius: Coord,
        start_angle: f64,
        delta: f64,
        thickness: Coord,
        clearance: Coord,
    ) -> Self {
        Self {
            id: 0,
            center,
            radius,
            start_angle,
            delta,
            thickness,
            clearance,
            flags: ObjectFlags::NONE,
        }
    }

    pub fn with_flags(mut self, flags: ObjectFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn point_at(&self, degrees: f64) -> Point {
        let radians = degrees.to_radians();
        let r = self.radius as f64;
        Point::new(
            self.center.x + (r * radians.cos()).round() as Coord,
            self.center.y + (r * radians.sin()).round() as Coord,
        )
    }

    pub fn endpoints(&self) -> (Point, Point) {
        (self.point_at(self.start_angle), self.point_at(self.start_angle + self.delta))
    }
}

/// Filled copper area
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub id: u64,
    pub points: std::sync::Arc<[Point]>,
    pub flags: ObjectFlags,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Self { id: 0, points: points.into(), flags: ObjectFlags::NONE }
    }

    pub fn with_flags(mut self, flags: ObjectFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn rectangle(x1: Coord, y1: Coord, x2: Coord, y2: Coord) -> Self {
        Self::new(vec![
            Point::new(x1, y1),
            Point::new(x2, y1),
            Point::new(x2, y2),
            Point::new(x1, y2),
        ])
    }
}

/// Bit mask of copper layers (bit n = layer n)
pub type LayerMask = u64;

/// Through-hole element pin
#[derive(Debug, Clone, PartialEq)]
pub struct Pin {
    pub id: u64,
    pub number: String,
    pub center: Point,
    pub thickness: Coord,
    pub clearance: Coord,
    pub drill: Coord,
    pub flags: ObjectFlags,
    /// Layers on which the pin is thermally tied into clearing polygons
    pub thermals: LayerMask,
}

impl Pin {
    pub fn new(number: impl Into<String>, center: Point, thickness: Coord, clearance: Coord, drill: Coord) -> Self {
        Self {
            id: 0,
            number: number.into(),
            center,
            thickness,
            clearance,
            drill,
            flags: ObjectFlags::NONE,
            thermals: 0,
        }
    }

    pub fn with_flags(mut self, flags: ObjectFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_thermal(mut self, layer: usize) -> Self {
        self.thermals |= 1 << layer;
        self.flags |= ObjectFlags::THERM;
        self
    }
}

/// Via, optionally buried between two copper layers
#[derive(Debug, Clone, PartialEq)]
pub struct Via {
    pub id: u64,
    pub center: Point,
    pub thickness: Coord,
    pub clearance: Coord,
    pub drill: Coord,
    pub flags: ObjectFlags,
    pub thermals: LayerMask,
    /// `None` for a through via
    pub span: Option<LayerSpan>,
}

impl Via {
    pub fn new(center: Point, thickness: Coord, clearance: Coord, drill: Coord) -> Self {
        Self {
            id: 0,
            center,
            thickness,
            clearance,
            drill,
            flags: ObjectFlags::NONE,
            thermals: 0,
            span: None,
        }
    }

    pub fn with_flags(mut self, flags: ObjectFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_thermal(mut self, layer: usize) -> Self {
        self.thermals |= 1 << layer;
        self.flags |= ObjectFlags::THERM;
        self
    }

    pub fn buried(mut self, span: LayerSpan) -> Self {
        self.span = Some(span);
        self
    }
}

/// Surface-mount pad
#[derive(Debug, Clone, PartialEq)]
pub struct Pad {
    pub id: u64,
    pub number: String,
    pub point1: Point,
    pub point2: Point,
    pub thickness: Coord,
    pub clearance: Coord,
    pub side: Side,
    pub flags: ObjectFlags,
}

impl Pad {
    pub fn new(
        number: impl Into<String>,
        point1: Point,
        point2: Point,
        thickness: Coord,
        clearance: Coord,
        side: Side,
    ) -> Self {
        Self {
            id: 0,
            number: number.into(),
            point1,
            point2,
            thickness,
            clearance,
            side,
            flags: ObjectFlags::NONE,
        }
    }

    pub fn with_flags(mut self, flags: ObjectFlags) -> Self {
        self.flags |= flags;
        self
    }
}

/// Silkscreen outline segment owned by an element
#[derive(Debug, Clone, PartialEq)]
pub struct ElementLine {
    pub point1: Point,
    pub point2: Point,
    pub thickness: Coord,
}

/// Component footprint: owns pins, pads and its silk outline.
/// Not searched for connectivity itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub id: u64,
    pub name: String,
    pub mark: Point,
    pub pins: Vec<Pin>,
    pub pads: Vec<Pad>,
    pub silk: Vec<ElementLine>,
    pub flags: ObjectFlags,
}

impl Element {
    pub fn new(name: impl Into<String>, mark: Point) -> Self {
        Self {
            id: 0,
            name: name.into(),
            mark,
            pins: Vec::new(),
            pads: Vec::new(),
            silk: Vec::new(),
            flags: ObjectFlags::NONE,
        }
    }

    pub fn with_pin(mut self, pin: Pin) -> Self {
        self.pins.push(pin);
        self
    }

    pub fn with_pad(mut self, pad: Pad) -> Self {
        self.pads.push(pad);
        self
    }

    pub fn with_silk_line(mut self, point1: Point, point2: Point, thickness: Coord) -> Self {
        self.silk.push(ElementLine { point1, point2, thickness });
        self
    }
}

/// Unrouted connection required by the netlist
#[derive(Debug, Clone, PartialEq)]
pub struct Rat {
    pub id: u64,
    pub point1: Point,
    pub point2: Point,
    pub group1: usize,
    pub group2: usize,
    pub flags: ObjectFlags,
}

impl Rat {
    pub fn new(point1: Point, group1: usize, point2: Point, group2: usize) -> Self {
        Self { id: 0, point1, point2, group1, group2, flags: ObjectFlags::NONE }
    }

    pub fn ends(&self) -> [(Point, usize); 2] {
        [(self.point1, self.group1), (self.point2, self.group2)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_contains_and_intersects() {
        let flags = ObjectFlags::FOUND | ObjectFlags::DRC;
        assert!(flags.contains(ObjectFlags::FOUND));
        assert!(!flags.contains(ObjectFlags::FOUND | ObjectFlags::SELECTED));
        assert!(flags.intersects(ObjectFlags::SELECTED | ObjectFlags::DRC));
        assert!(!flags.intersects(ObjectFlags::WARN));
    }

    #[test]
    fn test_bbox_shrink_never_inverts() {
        let bbox = BoundingBox::new(0, 0, 100, 40);
        let shrunk = bbox.bloated(-50);
        assert!(shrunk.x1 <= shrunk.x2);
        assert!(shrunk.y1 <= shrunk.y2);
        assert_eq!(shrunk.center(), bbox.center());
    }

    #[test]
    fn test_layer_span_overlap() {
        let a = LayerSpan::new(2, 0);
        assert_eq!(a, LayerSpan { from: 0, to: 2 });
        assert!(a.overlaps(&LayerSpan::new(2, 3)));
        assert!(!a.overlaps(&LayerSpan::new(3, 4)));
    }
}
