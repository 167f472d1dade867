//! Arena-backed polygon rings
//!
//! A ring is a closed sequence of vertices stored in a per-ring arena and
//! linked by `next`/`prev` indices. The segment leaving a vertex is either
//! straight or a circular arc (`ArcSeg`). Traversal chases indices from
//! `start` until it comes back around, so reversing a ring or dropping a
//! vertex is a relink rather than a reallocation.
//!
//! An outer ring may carry a chain of hole rings. Ownership is plain Rust
//! ownership: a ring lives in exactly one list at a time and moving it
//! between lists is a move.

use super::types::{Extents, Point};
use bitflags::bitflags;
use geo_types::{Coord, LineString};
use rstar::{RTree, RTreeObject, AABB};
use std::f64::consts::{PI, TAU};

/// Default chord tolerance when flattening arcs
pub const DEFAULT_ARC_TOLERANCE: f64 = 0.001;

bitflags! {
    /// Per-ring markers carried through the void pipeline
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RingFlags: u8 {
        /// Hole that was present on the shape before this pass
        const EXISTING_VOID = 1;
        /// Void that touches neither the outline nor another void
        const STAND_ALONE = 1 << 1;
        /// Thermal relief piece
        const THERMAL = 1 << 2;
        /// Dummy void forcing a self-intersecting outline through the boolean
        const DUMMY = 1 << 3;
    }
}

/// Winding direction of a ring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

impl Direction {
    pub fn flipped(self) -> Self {
        match self {
            Direction::Clockwise => Direction::CounterClockwise,
            Direction::CounterClockwise => Direction::Clockwise,
        }
    }
}

/// Circular arc for the segment leaving a vertex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcSeg {
    pub center: Point,
    pub clockwise: bool,
}

impl ArcSeg {
    fn flipped(self) -> Self {
        ArcSeg { center: self.center, clockwise: !self.clockwise }
    }

    /// Sweep angle in (0, 2π] going from `from` to `to`
    pub fn sweep(&self, from: Point, to: Point) -> f64 {
        let a0 = (from.y - self.center.y).atan2(from.x - self.center.x);
        let a1 = (to.y - self.center.y).atan2(to.x - self.center.x);
        let raw = if self.clockwise { a0 - a1 } else { a1 - a0 };
        let sweep = raw.rem_euclid(TAU);
        if sweep < 1e-12 { TAU } else { sweep }
    }
}

#[derive(Debug, Clone)]
struct Vertex {
    point: Point,
    arc: Option<ArcSeg>,
    next: usize,
    prev: usize,
    live: bool,
}

/// Closed polygon ring with optional arc segments and a hole chain
#[derive(Debug, Clone)]
pub struct Ring {
    verts: Vec<Vertex>,
    start: usize,
    len: usize,
    direction: Direction,
    pub flags: RingFlags,
    pub holes: Vec<Ring>,
}

/// Iterator over `(point, arc)` pairs in ring order
pub struct VertexIter<'a> {
    ring: &'a Ring,
    cursor: usize,
    remaining: usize,
}

impl<'a> Iterator for VertexIter<'a> {
    type Item = (Point, Option<ArcSeg>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let v = &self.ring.verts[self.cursor];
        self.cursor = v.next;
        self.remaining -= 1;
        Some((v.point, v.arc))
    }
}

impl Ring {
    /// Build from vertices with optional arcs. Consecutive duplicates and a
    /// closing duplicate are dropped. Returns `None` when fewer than three
    /// distinct vertices remain and no arc makes the ring non-degenerate.
    pub fn from_segments(segments: &[(Point, Option<ArcSeg>)]) -> Option<Ring> {
        let mut cleaned: Vec<(Point, Option<ArcSeg>)> = Vec::with_capacity(segments.len());
        for &(p, arc) in segments {
            if !p.is_finite() {
                return None;
            }
            match cleaned.last_mut() {
                Some(last) if last.0 == p => {
                    if last.1.is_none() {
                        last.1 = arc;
                    }
                }
                _ => cleaned.push((p, arc)),
            }
        }
        while cleaned.len() > 1 && cleaned.first().map(|f| f.0) == cleaned.last().map(|l| l.0) {
            if let Some((_, arc)) = cleaned.pop() {
                if let (Some(last), Some(a)) = (cleaned.last_mut(), arc) {
                    if last.1.is_none() {
                        last.1 = Some(a);
                    }
                }
            }
        }
        let has_arc = cleaned.iter().any(|s| s.1.is_some());
        if cleaned.len() < 3 && !(has_arc && cleaned.len() == 2) {
            return None;
        }

        let n = cleaned.len();
        let verts = cleaned
            .into_iter()
            .enumerate()
            .map(|(i, (point, arc))| Vertex {
                point,
                arc,
                next: (i + 1) % n,
                prev: (i + n - 1) % n,
                live: true,
            })
            .collect();
        let mut ring = Ring {
            verts,
            start: 0,
            len: n,
            direction: Direction::CounterClockwise,
            flags: RingFlags::empty(),
            holes: Vec::new(),
        };
        ring.direction = if ring.signed_area() < 0.0 {
            Direction::Clockwise
        } else {
            Direction::CounterClockwise
        };
        Some(ring)
    }

    pub fn from_points(points: &[Point]) -> Option<Ring> {
        let segs: Vec<_> = points.iter().map(|p| (*p, None)).collect();
        Ring::from_segments(&segs)
    }

    /// Counter-clockwise axis-aligned rectangle
    pub fn rectangle(ext: &Extents) -> Option<Ring> {
        Ring::from_points(&ext.corners())
    }

    /// Counter-clockwise full circle built from two half-circle arcs
    pub fn circle(center: Point, radius: f64) -> Option<Ring> {
        if !(radius > 0.0) {
            return None;
        }
        let arc = Some(ArcSeg { center, clockwise: false });
        Ring::from_segments(&[
            (Point::new(center.x + radius, center.y), arc),
            (Point::new(center.x - radius, center.y), arc),
        ])
    }

    /// Counter-clockwise rectangle with arc corners of `radius`.
    /// A zero radius degenerates to a plain rectangle.
    pub fn rounded_rect(ext: &Extents, radius: f64) -> Option<Ring> {
        let r = radius.min(ext.width() * 0.5).min(ext.height() * 0.5).max(0.0);
        if r <= 0.0 {
            return Ring::rectangle(ext);
        }
        let (x0, y0, x1, y1) = (ext.min_x, ext.min_y, ext.max_x, ext.max_y);
        let ccw = |c: Point| Some(ArcSeg { center: c, clockwise: false });
        let segs = [
            (Point::new(x0 + r, y0), None),
            (Point::new(x1 - r, y0), ccw(Point::new(x1 - r, y0 + r))),
            (Point::new(x1, y0 + r), None),
            (Point::new(x1, y1 - r), ccw(Point::new(x1 - r, y1 - r))),
            (Point::new(x1 - r, y1), None),
            (Point::new(x0 + r, y1), ccw(Point::new(x0 + r, y1 - r))),
            (Point::new(x0, y1 - r), None),
            (Point::new(x0, y0 + r), ccw(Point::new(x0 + r, y0 + r))),
        ];
        Ring::from_segments(&segs)
    }

    /// Number of live vertices
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn has_arcs(&self) -> bool {
        self.iter().any(|(_, arc)| arc.is_some())
    }

    pub fn iter(&self) -> VertexIter<'_> {
        VertexIter { ring: self, cursor: self.start, remaining: self.len }
    }

    pub fn points(&self) -> Vec<Point> {
        self.iter().map(|(p, _)| p).collect()
    }

    /// Iterate `(from, to, arc)` for every segment
    pub fn segments(&self) -> impl Iterator<Item = (Point, Point, Option<ArcSeg>)> + '_ {
        let mut cursor = self.start;
        (0..self.len).map(move |_| {
            let v = &self.verts[cursor];
            let to = self.verts[v.next].point;
            cursor = v.next;
            (v.point, to, v.arc)
        })
    }

    /// Signed area with exact arc contribution; positive for counter-clockwise
    pub fn signed_area(&self) -> f64 {
        let mut area = 0.0;
        for (a, b, arc) in self.segments() {
            area += (a.x * b.y - b.x * a.y) * 0.5;
            if let Some(arc) = arc {
                let r = a.distance(&arc.center);
                let sweep = arc.sweep(a, b);
                let segment = 0.5 * r * r * (sweep - sweep.sin());
                area += if arc.clockwise { -segment } else { segment };
            }
        }
        area
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Outer area minus the area of the hole chain
    pub fn net_area(&self) -> f64 {
        self.area() - self.holes.iter().map(Ring::area).sum::<f64>()
    }

    /// Reverse traversal order by swapping links. Arcs move to the other end
    /// of their segment and flip orientation.
    pub fn reverse(&mut self) {
        let moved: Vec<(usize, Option<ArcSeg>)> = self
            .verts
            .iter()
            .filter(|v| v.live)
            .map(|v| (v.next, v.arc.map(ArcSeg::flipped)))
            .collect();
        for v in self.verts.iter_mut().filter(|v| v.live) {
            std::mem::swap(&mut v.next, &mut v.prev);
            v.arc = None;
        }
        for (target, arc) in moved {
            self.verts[target].arc = arc;
        }
        self.direction = self.direction.flipped();
    }

    /// Reverse if needed so the ring winds in `dir`
    pub fn set_direction(&mut self, dir: Direction) {
        if self.direction != dir {
            self.reverse();
        }
    }

    /// Unlink a vertex. The segment entering it inherits nothing; callers
    /// only drop vertices between straight segments.
    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.verts[idx].prev, self.verts[idx].next);
        self.verts[prev].next = next;
        self.verts[next].prev = prev;
        self.verts[idx].live = false;
        if self.start == idx {
            self.start = next;
        }
        self.len -= 1;
    }

    /// Drop vertices lying on the straight line between their neighbours
    pub fn remove_collinear(&mut self, eps: f64) {
        if self.len <= 3 {
            return;
        }
        let mut cursor = self.start;
        let mut stable = 0;
        while stable < self.len && self.len > 3 {
            let v = &self.verts[cursor];
            let prev = &self.verts[v.prev];
            let next = &self.verts[v.next];
            let straight = v.arc.is_none() && prev.arc.is_none();
            let cross = (v.point.x - prev.point.x) * (next.point.y - prev.point.y)
                - (v.point.y - prev.point.y) * (next.point.x - prev.point.x);
            let span = prev.point.distance(&next.point).max(f64::EPSILON);
            let next_idx = v.next;
            if straight && (cross / span).abs() <= eps {
                let prev_idx = v.prev;
                self.unlink(cursor);
                cursor = prev_idx;
                stable = 0;
            } else {
                cursor = next_idx;
                stable += 1;
            }
        }
    }

    /// Exact extents including arc bulges
    pub fn extents(&self) -> Extents {
        let mut ext = Extents::EMPTY;
        for (a, b, arc) in self.segments() {
            ext.include_point(a);
            if let Some(arc) = arc {
                let r = a.distance(&arc.center);
                let start = (a.y - arc.center.y).atan2(a.x - arc.center.x);
                let sweep = arc.sweep(a, b);
                for k in 0..4 {
                    let axis = k as f64 * PI * 0.5;
                    let offset = if arc.clockwise { start - axis } else { axis - start };
                    if offset.rem_euclid(TAU) <= sweep {
                        ext.include_point(Point::new(
                            arc.center.x + r * axis.cos(),
                            arc.center.y + r * axis.sin(),
                        ));
                    }
                }
            }
        }
        ext
    }

    /// Centre and radius if this ring is exactly one full circle
    pub fn as_circle(&self) -> Option<(Point, f64)> {
        let mut center = None;
        let mut radius = 0.0;
        let mut sweep = 0.0;
        for (a, b, arc) in self.segments() {
            let arc = arc?;
            let r = a.distance(&arc.center);
            match center {
                None => {
                    center = Some(arc.center);
                    radius = r;
                }
                Some(c) if c == arc.center && (r - radius).abs() <= 1e-9 * radius.max(1.0) => {}
                Some(_) => return None,
            }
            sweep += arc.sweep(a, b);
        }
        let center = center?;
        ((sweep - TAU).abs() < 1e-6).then_some((center, radius))
    }

    /// Flatten arcs into chords no further than `tolerance` from the true curve
    pub fn flatten(&self, tolerance: f64) -> Vec<Point> {
        let mut out = Vec::with_capacity(self.len * 2);
        for (a, b, arc) in self.segments() {
            out.push(a);
            if let Some(arc) = arc {
                let r = a.distance(&arc.center);
                let sweep = arc.sweep(a, b);
                let n = arc_steps(r, sweep, tolerance);
                let start = (a.y - arc.center.y).atan2(a.x - arc.center.x);
                let dir = if arc.clockwise { -1.0 } else { 1.0 };
                for i in 1..n {
                    let t = start + dir * sweep * i as f64 / n as f64;
                    out.push(Point::new(arc.center.x + r * t.cos(), arc.center.y + r * t.sin()));
                }
            }
        }
        out
    }

    /// Closed geo line string of the flattened ring
    pub fn to_line_string(&self, tolerance: f64) -> LineString<f64> {
        let mut coords: Vec<Coord<f64>> = self
            .flatten(tolerance)
            .into_iter()
            .map(|p| Coord { x: p.x, y: p.y })
            .collect();
        if let Some(first) = coords.first().copied() {
            coords.push(first);
        }
        LineString::new(coords)
    }

    pub fn from_line_string(ls: &LineString<f64>) -> Option<Ring> {
        let points: Vec<Point> = ls.0.iter().map(|c| Point::new(c.x, c.y)).collect();
        Ring::from_points(&points)
    }

    /// Even-odd point test on the flattened outline (holes ignored)
    pub fn contains_point(&self, p: Point, tolerance: f64) -> bool {
        let pts = self.flatten(tolerance);
        let mut inside = false;
        let n = pts.len();
        let mut j = n.wrapping_sub(1);
        for i in 0..n {
            let (a, b) = (pts[i], pts[j]);
            if (a.y > p.y) != (b.y > p.y) {
                let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// True when the point is inside the outline and outside every hole
    pub fn contains_point_with_holes(&self, p: Point, tolerance: f64) -> bool {
        self.contains_point(p, tolerance)
            && !self.holes.iter().any(|h| h.contains_point(p, tolerance))
    }

    /// Snap vertices and arc centres to the database grid
    pub fn snap(&mut self, grid: f64) {
        for v in self.verts.iter_mut().filter(|v| v.live) {
            v.point = v.point.snapped(grid);
            if let Some(arc) = v.arc.as_mut() {
                arc.center = arc.center.snapped(grid);
            }
        }
        for hole in &mut self.holes {
            hole.snap(grid);
        }
    }

    /// Rotate every vertex and arc centre about `origin`
    pub fn rotate(&mut self, origin: Point, degrees: f64) {
        if degrees == 0.0 {
            return;
        }
        for v in self.verts.iter_mut().filter(|v| v.live) {
            v.point = v.point.rotated(origin, degrees);
            if let Some(arc) = v.arc.as_mut() {
                arc.center = arc.center.rotated(origin, degrees);
            }
        }
        for hole in &mut self.holes {
            hole.rotate(origin, degrees);
        }
    }

    /// Compare outline geometry irrespective of start vertex and winding
    pub fn same_outline(&self, other: &Ring, eps: f64) -> bool {
        let mut a = self.clone();
        let mut b = other.clone();
        a.set_direction(Direction::CounterClockwise);
        b.set_direction(Direction::CounterClockwise);
        a.remove_collinear(eps);
        b.remove_collinear(eps);
        if a.len() != b.len() || a.has_arcs() != b.has_arcs() {
            return false;
        }
        let pa = a.points();
        let pb = b.points();
        let Some(offset) = pb.iter().position(|p| p.distance(&pa[0]) <= eps) else {
            return false;
        };
        pa.iter()
            .enumerate()
            .all(|(i, p)| p.distance(&pb[(i + offset) % pb.len()]) <= eps)
    }

    /// True when any two non-adjacent segments of the flattened ring cross
    pub fn is_self_intersecting(&self, tolerance: f64) -> bool {
        let pts = self.flatten(tolerance);
        let n = pts.len();
        if n < 4 {
            return false;
        }
        let segs: Vec<EdgeEntry> = (0..n)
            .map(|i| EdgeEntry::new(i, pts[i], pts[(i + 1) % n]))
            .collect();
        let tree = RTree::bulk_load(segs.clone());
        for s in &segs {
            for other in tree.locate_in_envelope_intersecting(&s.envelope()) {
                if other.index <= s.index {
                    continue;
                }
                let adjacent = other.index == s.index + 1 || (s.index == 0 && other.index == n - 1);
                if adjacent {
                    continue;
                }
                if segments_cross(s.a, s.b, other.a, other.b) {
                    return true;
                }
            }
        }
        false
    }
}

/// Number of chords for an arc so the sagitta stays under `tolerance`.
/// Always even so the arc midpoint is emitted.
pub fn arc_steps(radius: f64, sweep: f64, tolerance: f64) -> usize {
    let tol = tolerance.max(1e-9);
    let max_step = if tol >= radius { PI * 0.5 } else { 2.0 * (1.0 - tol / radius).acos() };
    let n = (sweep / max_step.max(1e-6)).ceil().max(2.0) as usize;
    (n + 1) & !1
}

#[derive(Debug, Clone)]
struct EdgeEntry {
    index: usize,
    a: Point,
    b: Point,
}

impl EdgeEntry {
    fn new(index: usize, a: Point, b: Point) -> Self {
        Self { index, a, b }
    }
}

impl RTreeObject for EdgeEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.a.x, self.a.y], [self.b.x, self.b.y])
    }
}

fn orient(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Proper or touching intersection of two segments
pub fn segments_cross(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    let d1 = orient(b1, b2, a1);
    let d2 = orient(b1, b2, a2);
    let d3 = orient(a1, a2, b1);
    let d4 = orient(a1, a2, b2);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    let on = |p: Point, q: Point, r: Point| {
        r.x >= p.x.min(q.x) && r.x <= p.x.max(q.x) && r.y >= p.y.min(q.y) && r.y <= p.y.max(q.y)
    };
    (d1 == 0.0 && on(b1, b2, a1))
        || (d2 == 0.0 && on(b1, b2, a2))
        || (d3 == 0.0 && on(a1, a2, b1))
        || (d4 == 0.0 && on(a1, a2, b2))
}
