//! Distance calculations between shape cores
//!
//! Points, segments, circular arcs and simple polygons. All math is `f64`
//! on nanometre coordinates; a distance of zero means the two overlap.

use std::f64::consts::TAU;

pub type Vec2 = [f64; 2];

/// Tolerance absorbed by every touch comparison
pub const EPSILON: f64 = 1e-3;

/// Circular arc centreline. Angles in radians; `delta` may be negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcPath {
    pub center: Vec2,
    pub radius: f64,
    pub start: f64,
    pub delta: f64,
}

impl ArcPath {
    pub fn point_at(&self, angle: f64) -> Vec2 {
        [
            self.center[0] + self.radius * angle.cos(),
            self.center[1] + self.radius * angle.sin(),
        ]
    }

    pub fn endpoints(&self) -> [Vec2; 2] {
        [self.point_at(self.start), self.point_at(self.start + self.delta)]
    }

    /// Whether the direction `angle` falls inside the sweep
    pub fn sweeps(&self, angle: f64) -> bool {
        if self.delta.abs() >= TAU {
            return true;
        }
        let (lo, span) = if self.delta >= 0.0 {
            (self.start, self.delta)
        } else {
            (self.start + self.delta, -self.delta)
        };
        (angle - lo).rem_euclid(TAU) <= span + 1e-12
    }
}

pub fn length(v: Vec2) -> f64 {
    (v[0] * v[0] + v[1] * v[1]).sqrt()
}

pub fn distance(a: Vec2, b: Vec2) -> f64 {
    length([b[0] - a[0], b[1] - a[1]])
}

fn cross(o: Vec2, a: Vec2, b: Vec2) -> f64 {
    (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
}

/// Point-to-segment minimum distance and the closest point on the segment
pub fn point_segment_distance(p: Vec2, a: Vec2, b: Vec2) -> (f64, Vec2) {
    let ab = [b[0] - a[0], b[1] - a[1]];
    let ap = [p[0] - a[0], p[1] - a[1]];
    let ab_len2 = ab[0] * ab[0] + ab[1] * ab[1];

    if ab_len2 < 1e-12 {
        return (distance(p, a), a);
    }

    let t = ((ap[0] * ab[0] + ap[1] * ab[1]) / ab_len2).clamp(0.0, 1.0);
    let closest = [a[0] + t * ab[0], a[1] + t * ab[1]];
    (distance(p, closest), closest)
}

/// Proper or touching intersection of two segments
pub fn segments_intersect(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> bool {
    let d1 = cross(b1, b2, a1);
    let d2 = cross(b1, b2, a2);
    let d3 = cross(a1, a2, b1);
    let d4 = cross(a1, a2, b2);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    // Collinear and endpoint contacts fall out of the endpoint distances
    false
}

/// Segment-to-segment minimum distance
pub fn segment_distance(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> f64 {
    if segments_intersect(a1, a2, b1, b2) {
        return 0.0;
    }
    [
        point_segment_distance(a1, b1, b2).0,
        point_segment_distance(a2, b1, b2).0,
        point_segment_distance(b1, a1, a2).0,
        point_segment_distance(b2, a1, a2).0,
    ]
    .into_iter()
    .fold(f64::MAX, f64::min)
}

/// Point-to-arc minimum distance
pub fn point_arc_distance(p: Vec2, arc: &ArcPath) -> f64 {
    let v = [p[0] - arc.center[0], p[1] - arc.center[1]];
    let d = length(v);
    if d > 1e-9 && arc.sweeps(v[1].atan2(v[0])) {
        return (d - arc.radius).abs();
    }
    if d <= 1e-9 && arc.delta != 0.0 {
        return arc.radius;
    }
    let [e1, e2] = arc.endpoints();
    distance(p, e1).min(distance(p, e2))
}

/// Points where the segment crosses the arc's full circle
fn segment_circle_hits(a: Vec2, b: Vec2, center: Vec2, radius: f64) -> Vec<Vec2> {
    let d = [b[0] - a[0], b[1] - a[1]];
    let f = [a[0] - center[0], a[1] - center[1]];
    let qa = d[0] * d[0] + d[1] * d[1];
    if qa < 1e-12 {
        return Vec::new();
    }
    let qb = 2.0 * (f[0] * d[0] + f[1] * d[1]);
    let qc = f[0] * f[0] + f[1] * f[1] - radius * radius;
    let disc = qb * qb - 4.0 * qa * qc;
    if disc < 0.0 {
        return Vec::new();
    }
    let root = disc.sqrt();
    [(-qb - root) / (2.0 * qa), (-qb + root) / (2.0 * qa)]
        .into_iter()
        .filter(|t| (0.0..=1.0).contains(t))
        .map(|t| [a[0] + t * d[0], a[1] + t * d[1]])
        .collect()
}

fn on_arc(p: Vec2, arc: &ArcPath) -> bool {
    let v = [p[0] - arc.center[0], p[1] - arc.center[1]];
    arc.sweeps(v[1].atan2(v[0]))
}

/// Segment-to-arc minimum distance
pub fn segment_arc_distance(a: Vec2, b: Vec2, arc: &ArcPath) -> f64 {
    if segment_circle_hits(a, b, arc.center, arc.radius)
        .into_iter()
        .any(|hit| on_arc(hit, arc))
    {
        return 0.0;
    }
    let [e1, e2] = arc.endpoints();
    let (_, foot) = point_segment_distance(arc.center, a, b);
    [
        point_arc_distance(a, arc),
        point_arc_distance(b, arc),
        point_arc_distance(foot, arc),
        point_segment_distance(e1, a, b).0,
        point_segment_distance(e2, a, b).0,
    ]
    .into_iter()
    .fold(f64::MAX, f64::min)
}

/// Arc-to-arc minimum distance
pub fn arc_arc_distance(a: &ArcPath, b: &ArcPath) -> f64 {
    let mut best = f64::MAX;
    for end in a.endpoints() {
        best = best.min(point_arc_distance(end, b));
    }
    for end in b.endpoints() {
        best = best.min(point_arc_distance(end, a));
    }

    let axis = [b.center[0] - a.center[0], b.center[1] - a.center[1]];
    let spacing = length(axis);
    if spacing < 1e-9 {
        // Concentric: the radial gap applies wherever the sweeps overlap
        let [a1, _] = a.endpoints();
        let [b1, _] = b.endpoints();
        if on_arc(b1, a) || on_arc(a1, b) {
            best = best.min((a.radius - b.radius).abs());
        }
        return best;
    }

    // Circle crossings
    if spacing <= a.radius + b.radius && spacing >= (a.radius - b.radius).abs() {
        let along = (a.radius * a.radius - b.radius * b.radius + spacing * spacing) / (2.0 * spacing);
        let h = (a.radius * a.radius - along * along).max(0.0).sqrt();
        let u = [axis[0] / spacing, axis[1] / spacing];
        let base = [a.center[0] + along * u[0], a.center[1] + along * u[1]];
        for sign in [-1.0, 1.0] {
            let hit = [base[0] - sign * h * u[1], base[1] + sign * h * u[0]];
            if on_arc(hit, a) && on_arc(hit, b) {
                return 0.0;
            }
        }
    }

    // Interior extremes lie on the line through both centres
    let u = [axis[0] / spacing, axis[1] / spacing];
    for sign in [-1.0, 1.0] {
        let p = [a.center[0] + sign * a.radius * u[0], a.center[1] + sign * a.radius * u[1]];
        if on_arc(p, a) {
            best = best.min(point_arc_distance(p, b));
        }
    }
    best
}

/// Even-odd point-in-polygon test; boundary points count as inside
pub fn point_in_polygon(p: Vec2, polygon: &[Vec2]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (polygon[i], polygon[j]);
        if point_segment_distance(p, a, b).0 < 1e-9 {
            return true;
        }
        if (a[1] > p[1]) != (b[1] > p[1]) {
            let x = a[0] + (p[1] - a[1]) * (b[0] - a[0]) / (b[1] - a[1]);
            if p[0] < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn edges(polygon: &[Vec2]) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
    let n = polygon.len();
    (0..n).map(move |i| (polygon[i], polygon[(i + 1) % n]))
}

pub fn point_polygon_distance(p: Vec2, polygon: &[Vec2]) -> f64 {
    if point_in_polygon(p, polygon) {
        return 0.0;
    }
    edges(polygon)
        .map(|(a, b)| point_segment_distance(p, a, b).0)
        .fold(f64::MAX, f64::min)
}

pub fn segment_polygon_distance(a: Vec2, b: Vec2, polygon: &[Vec2]) -> f64 {
    if point_in_polygon(a, polygon) || point_in_polygon(b, polygon) {
        return 0.0;
    }
    edges(polygon)
        .map(|(p, q)| segment_distance(a, b, p, q))
        .fold(f64::MAX, f64::min)
}

pub fn arc_polygon_distance(arc: &ArcPath, polygon: &[Vec2]) -> f64 {
    if arc.endpoints().into_iter().any(|e| point_in_polygon(e, polygon)) {
        return 0.0;
    }
    edges(polygon)
        .map(|(p, q)| segment_arc_distance(p, q, arc))
        .fold(f64::MAX, f64::min)
}

pub fn polygon_polygon_distance(a: &[Vec2], b: &[Vec2]) -> f64 {
    if a.iter().any(|&p| point_in_polygon(p, b)) || b.iter().any(|&p| point_in_polygon(p, a)) {
        return 0.0;
    }
    edges(a)
        .flat_map(|(p, q)| edges(b).map(move |(r, s)| segment_distance(p, q, r, s)))
        .fold(f64::MAX, f64::min)
}

/// Offset a convex outline outward by `amount` (inward when negative)
pub fn offset_convex(outline: &[Vec2], amount: f64) -> Vec<Vec2> {
    let n = outline.len();
    if n < 3 || amount == 0.0 {
        return outline.to_vec();
    }
    let ccw = signed_area(outline) >= 0.0;
    let normal = |a: Vec2, b: Vec2| {
        let e = [b[0] - a[0], b[1] - a[1]];
        let len = length(e).max(1e-12);
        if ccw {
            [e[1] / len, -e[0] / len]
        } else {
            [-e[1] / len, e[0] / len]
        }
    };
    (0..n)
        .map(|i| {
            let prev = outline[(i + n - 1) % n];
            let cur = outline[i];
            let next = outline[(i + 1) % n];
            let n1 = normal(prev, cur);
            let n2 = normal(cur, next);
            let k = amount / (1.0 + n1[0] * n2[0] + n1[1] * n2[1]).max(1e-6);
            [cur[0] + k * (n1[0] + n2[0]), cur[1] + k * (n1[1] + n2[1])]
        })
        .collect()
}

/// Largest distance a convex outline can be shrunk by before collapsing
pub fn inradius(outline: &[Vec2]) -> f64 {
    if outline.is_empty() {
        return 0.0;
    }
    let n = outline.len() as f64;
    let centroid = outline
        .iter()
        .fold([0.0, 0.0], |acc, p| [acc[0] + p[0] / n, acc[1] + p[1] / n]);
    edges(outline)
        .map(|(a, b)| point_segment_distance(centroid, a, b).0)
        .fold(f64::MAX, f64::min)
}

fn signed_area(polygon: &[Vec2]) -> f64 {
    edges(polygon)
        .map(|(a, b)| a[0] * b[1] - b[0] * a[1])
        .sum::<f64>()
        / 2.0
}
