//! Board objects as geometric shapes
//!
//! Every copper object reduces to one of three forms:
//! - `Round`: a centreline core (point, segment or arc) swept by a radius
//! - `Rigid`: a convex outline (square and octagonal pins, square pads)
//! - `Area`: a filled polygon

use super::data::PvView;
use super::distance::{ArcPath, Vec2};
use super::types::{Arc, BoundingBox, Coord, Line, ObjectFlags, Pad, Point, Polygon, Rat};
use std::f64::consts::{FRAC_PI_8, PI};

/// Centreline of a round shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Core {
    Point(Vec2),
    Segment(Vec2, Vec2),
    Arc(ArcPath),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Round { core: Core, radius: f64 },
    Rigid { outline: Vec<Vec2> },
    Area { points: std::sync::Arc<[Point]> },
}

fn vec2(p: Point) -> Vec2 {
    [p.x as f64, p.y as f64]
}

fn half(thickness: Coord) -> f64 {
    thickness.max(0) as f64 / 2.0
}

impl Shape {
    /// Zero-width probe at a point, used for rat ends
    pub fn point(p: Point) -> Self {
        Shape::Round { core: Core::Point(vec2(p)), radius: 0.0 }
    }

    pub fn of_line(line: &Line) -> Self {
        Shape::Round {
            core: Core::Segment(vec2(line.point1), vec2(line.point2)),
            radius: half(line.thickness),
        }
    }

    pub fn of_arc(arc: &Arc) -> Self {
        Shape::Round {
            core: Core::Arc(ArcPath {
                center: vec2(arc.center),
                radius: arc.radius as f64,
                start: arc.start_angle.to_radians(),
                delta: arc.delta.to_radians(),
            }),
            radius: half(arc.thickness),
        }
    }

    pub fn of_polygon(polygon: &Polygon) -> Self {
        Shape::Area { points: polygon.points.clone() }
    }

    /// Square pads are rectangles extending half the thickness past each end
    pub fn of_pad(pad: &Pad) -> Self {
        let (a, b) = (vec2(pad.point1), vec2(pad.point2));
        let h = half(pad.thickness);
        if !pad.flags.contains(ObjectFlags::SQUARE) {
            return Shape::Round { core: Core::Segment(a, b), radius: h };
        }
        let d = [b[0] - a[0], b[1] - a[1]];
        let len = (d[0] * d[0] + d[1] * d[1]).sqrt();
        let (u, n) = if len < 1e-9 {
            ([h, 0.0], [0.0, h])
        } else {
            let u = [d[0] / len * h, d[1] / len * h];
            (u, [-u[1], u[0]])
        };
        let outline = vec![
            [a[0] - u[0] - n[0], a[1] - u[1] - n[1]],
            [b[0] + u[0] - n[0], b[1] + u[1] - n[1]],
            [b[0] + u[0] + n[0], b[1] + u[1] + n[1]],
            [a[0] - u[0] + n[0], a[1] - u[1] + n[1]],
        ];
        Shape::Rigid { outline }
    }

    pub fn of_pv(pv: &PvView) -> Self {
        let c = vec2(pv.center);
        let h = half(pv.thickness);
        if pv.flags.contains(ObjectFlags::SQUARE) {
            let outline = vec![
                [c[0] - h, c[1] - h],
                [c[0] + h, c[1] - h],
                [c[0] + h, c[1] + h],
                [c[0] - h, c[1] + h],
            ];
            return Shape::Rigid { outline };
        }
        if pv.flags.contains(ObjectFlags::OCTAGON) {
            // Flats at distance h from the centre
            let r = h / FRAC_PI_8.cos();
            let outline = (0..8)
                .map(|k| {
                    let angle = FRAC_PI_8 + k as f64 * PI / 4.0;
                    [c[0] + r * angle.cos(), c[1] + r * angle.sin()]
                })
                .collect();
            return Shape::Rigid { outline };
        }
        Shape::Round { core: Core::Point(c), radius: h }
    }

    pub fn of_rat(rat: &Rat) -> Self {
        Shape::Round {
            core: Core::Segment(vec2(rat.point1), vec2(rat.point2)),
            radius: 0.0,
        }
    }

    /// Polygon vertices as `f64` pairs
    pub fn area_points(points: &[Point]) -> Vec<Vec2> {
        points.iter().map(|&p| vec2(p)).collect()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let (min, max) = match self {
            Shape::Round { core, radius } => {
                let (min, max) = core_extent(core);
                ([min[0] - radius, min[1] - radius], [max[0] + radius, max[1] + radius])
            }
            Shape::Rigid { outline } => extent(outline.iter().copied()),
            Shape::Area { points } => extent(points.iter().map(|&p| vec2(p))),
        };
        BoundingBox::new(
            min[0].floor() as Coord,
            min[1].floor() as Coord,
            max[0].ceil() as Coord,
            max[1].ceil() as Coord,
        )
    }
}

fn extent(points: impl Iterator<Item = Vec2>) -> (Vec2, Vec2) {
    let mut min = [f64::MAX, f64::MAX];
    let mut max = [f64::MIN, f64::MIN];
    for p in points {
        min = [min[0].min(p[0]), min[1].min(p[1])];
        max = [max[0].max(p[0]), max[1].max(p[1])];
    }
    if min[0] > max[0] {
        return ([0.0, 0.0], [0.0, 0.0]);
    }
    (min, max)
}

fn core_extent(core: &Core) -> (Vec2, Vec2) {
    match core {
        Core::Point(p) => (*p, *p),
        Core::Segment(a, b) => extent([*a, *b].into_iter()),
        Core::Arc(arc) => {
            let [e1, e2] = arc.endpoints();
            let extremes = (0..4)
                .map(|k| k as f64 * PI / 2.0)
                .filter(|&angle| arc.sweeps(angle))
                .map(|angle| arc.point_at(angle));
            extent([e1, e2].into_iter().chain(extremes))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Side;

    #[test]
    fn test_line_bbox_includes_thickness() {
        let line = Line::new(Point::new(0, 0), Point::new(100, 0), 20, 0);
        assert_eq!(Shape::of_line(&line).bounding_box(), BoundingBox::new(-10, -10, 110, 10));
    }

    #[test]
    fn test_quarter_arc_bbox() {
        let arc = Arc::new(Point::new(0, 0), 100, 0.0, 90.0, 10, 0);
        let bbox = Shape::of_arc(&arc).bounding_box();
        assert_eq!(bbox, BoundingBox::new(-5, -5, 105, 105));
    }

    #[test]
    fn test_square_pad_extends_past_ends() {
        let pad = Pad::new("1", Point::new(0, 0), Point::new(100, 0), 40, 0, Side::Top)
            .with_flags(ObjectFlags::SQUARE);
        assert_eq!(Shape::of_pad(&pad).bounding_box(), BoundingBox::new(-20, -20, 120, 20));
    }
}
