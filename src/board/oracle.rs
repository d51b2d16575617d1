//! Pairwise touch predicate
//!
//! `touches(a, b, d)` answers whether two shapes overlap once the gap
//! allowance `d` is applied: positive `d` bloats, negative `d` shrinks.
//! Round shapes absorb `d` into their radius. Rigid outlines are offset along
//! their edge normals. Filled areas never change size.

use super::distance::{
    arc_arc_distance, arc_polygon_distance, distance, inradius, offset_convex, point_arc_distance,
    point_polygon_distance, point_segment_distance, polygon_polygon_distance,
    segment_arc_distance, segment_distance, segment_polygon_distance, Vec2, EPSILON,
};
use super::shapes::{Core, Shape};
use super::types::Coord;

/// Geometry predicate consulted by the connectivity engine
pub trait GeometryOracle: Sync {
    /// Symmetric in `a`/`b`; a larger `clearance` never turns `true` into `false`
    fn touches(&self, a: &Shape, b: &Shape, clearance: Coord) -> bool;
}

/// Exact copper geometry: circular arcs, convex rigid outlines, simple polygons
#[derive(Debug, Clone, Copy, Default)]
pub struct CopperGeometry;

impl GeometryOracle for CopperGeometry {
    fn touches(&self, a: &Shape, b: &Shape, clearance: Coord) -> bool {
        let d = clearance as f64;
        match (a, b) {
            (Shape::Round { core: ca, radius: ra }, Shape::Round { core: cb, radius: rb }) => {
                core_distance(ca, cb) <= (ra + rb + d).max(0.0) + EPSILON
            }
            (Shape::Round { core, radius }, Shape::Rigid { outline })
            | (Shape::Rigid { outline }, Shape::Round { core, radius }) => {
                core_region_distance(core, outline) <= (radius + d).max(0.0) + EPSILON
            }
            (Shape::Round { core, radius }, Shape::Area { points })
            | (Shape::Area { points }, Shape::Round { core, radius }) => {
                let area = Shape::area_points(points);
                core_region_distance(core, &area) <= (radius + d).max(0.0) + EPSILON
            }
            (Shape::Rigid { outline: oa }, Shape::Rigid { outline: ob }) => {
                let ea = offset_rigid(oa, d / 2.0);
                let eb = offset_rigid(ob, d / 2.0);
                polygon_polygon_distance(&ea, &eb) <= EPSILON
            }
            (Shape::Rigid { outline }, Shape::Area { points })
            | (Shape::Area { points }, Shape::Rigid { outline }) => {
                let area = Shape::area_points(points);
                polygon_polygon_distance(&offset_rigid(outline, d), &area) <= EPSILON
            }
            (Shape::Area { points: pa }, Shape::Area { points: pb }) => {
                let gap = polygon_polygon_distance(&Shape::area_points(pa), &Shape::area_points(pb));
                gap <= d.max(0.0) + EPSILON
            }
        }
    }
}

/// Offset a rigid outline, never shrinking it past its inscribed circle
fn offset_rigid(outline: &[Vec2], amount: f64) -> Vec<Vec2> {
    let amount = amount.max(-inradius(outline) * 0.999);
    offset_convex(outline, amount)
}

fn core_distance(a: &Core, b: &Core) -> f64 {
    match (a, b) {
        (Core::Point(p), Core::Point(q)) => distance(*p, *q),
        (Core::Point(p), Core::Segment(s1, s2)) | (Core::Segment(s1, s2), Core::Point(p)) => {
            point_segment_distance(*p, *s1, *s2).0
        }
        (Core::Point(p), Core::Arc(arc)) | (Core::Arc(arc), Core::Point(p)) => {
            point_arc_distance(*p, arc)
        }
        (Core::Segment(a1, a2), Core::Segment(b1, b2)) => segment_distance(*a1, *a2, *b1, *b2),
        (Core::Segment(s1, s2), Core::Arc(arc)) | (Core::Arc(arc), Core::Segment(s1, s2)) => {
            segment_arc_distance(*s1, *s2, arc)
        }
        (Core::Arc(a), Core::Arc(b)) => arc_arc_distance(a, b),
    }
}

fn core_region_distance(core: &Core, region: &[Vec2]) -> f64 {
    match core {
        Core::Point(p) => point_polygon_distance(*p, region),
        Core::Segment(a, b) => segment_polygon_distance(*a, *b, region),
        Core::Arc(arc) => arc_polygon_distance(arc, region),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Arc, Line, Point, Polygon};

    fn line(x1: Coord, y1: Coord, x2: Coord, y2: Coord, thickness: Coord) -> Shape {
        Shape::of_line(&Line::new(Point::new(x1, y1), Point::new(x2, y2), thickness, 0))
    }

    fn square(x: f64, y: f64, half: f64) -> Shape {
        Shape::Rigid {
            outline: vec![[x - half, y - half], [x + half, y - half], [x + half, y + half], [x - half, y + half]],
        }
    }

    #[test]
    fn test_parallel_lines_bloat() {
        let a = line(0, 0, 1000, 0, 100);
        let b = line(0, 200, 1000, 200, 100);
        assert!(!CopperGeometry.touches(&a, &b, 0));
        assert!(!CopperGeometry.touches(&a, &b, 99));
        assert!(CopperGeometry.touches(&a, &b, 100));
        assert!(CopperGeometry.touches(&b, &a, 100));
    }

    #[test]
    fn test_shrink_breaks_shallow_overlap() {
        let a = line(0, 0, 1000, 0, 100);
        let b = line(0, 90, 1000, 90, 100);
        assert!(CopperGeometry.touches(&a, &b, 0));
        assert!(!CopperGeometry.touches(&a, &b, -20));
    }

    #[test]
    fn test_line_inside_polygon() {
        let poly = Shape::of_polygon(&Polygon::rectangle(0, 0, 1000, 1000));
        let inside = line(100, 500, 900, 500, 10);
        let outside = line(1100, 500, 1900, 500, 10);
        assert!(CopperGeometry.touches(&inside, &poly, 0));
        assert!(CopperGeometry.touches(&poly, &inside, 0));
        assert!(!CopperGeometry.touches(&outside, &poly, 0));
        assert!(CopperGeometry.touches(&outside, &poly, 95));
    }

    #[test]
    fn test_arc_meets_line_end() {
        let arc = Shape::of_arc(&Arc::new(Point::new(0, 0), 500, 0.0, 90.0, 20, 0));
        let touching = line(500, 0, 500, -400, 20);
        let apart = line(-600, 0, -900, 0, 20);
        assert!(CopperGeometry.touches(&arc, &touching, 0));
        assert!(!CopperGeometry.touches(&arc, &apart, 0));
    }

    #[test]
    fn test_square_pins_corner_gap() {
        let a = square(0.0, 0.0, 50.0);
        let b = square(120.0, 0.0, 50.0);
        assert!(!CopperGeometry.touches(&a, &b, 0));
        assert!(CopperGeometry.touches(&a, &b, 20));
        assert!(!CopperGeometry.touches(&a, &b, -1000));
    }

    #[test]
    fn test_polygons_never_shrink() {
        let a = Shape::of_polygon(&Polygon::rectangle(0, 0, 100, 100));
        let b = Shape::of_polygon(&Polygon::rectangle(50, 50, 150, 150));
        let c = Shape::of_polygon(&Polygon::rectangle(130, 0, 200, 100));
        assert!(CopperGeometry.touches(&a, &b, -500));
        assert!(!CopperGeometry.touches(&a, &c, 0));
        assert!(CopperGeometry.touches(&a, &c, 30));
    }
}
