//! Edge index over a shape outline for inside/outside classification
//!
//! Holes are ignored: only outer rings are indexed. A box that overlaps no
//! edge box lies wholly inside or wholly outside, so one sample point
//! settles which.

use crate::fill::geometry::{segments_cross, Extents, Point, PolySet, Ring};
use crate::fill::index::RangeTree;

/// Where a box sits relative to the outline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Outside,
    Inside,
    /// Overlaps at least one outline edge box
    Crossing,
}

pub struct OutlineIndex {
    /// (ring, edge) per outline segment
    tree: RangeTree<(u32, u32)>,
    rings: Vec<Vec<Point>>,
    ring_extents: Vec<Extents>,
}

impl OutlineIndex {
    pub fn build(shape: &PolySet, tolerance: f64) -> Self {
        let rings: Vec<Vec<Point>> = shape.rings.iter().map(|r| r.flatten(tolerance)).collect();
        let ring_extents = rings.iter().map(|pts| Extents::from_points(pts)).collect();
        let mut edges = Vec::new();
        for (ri, pts) in rings.iter().enumerate() {
            for ei in 0..pts.len() {
                let a = pts[ei];
                let b = pts[(ei + 1) % pts.len()];
                edges.push((Extents::new(a.x, a.y, b.x, b.y), (ri as u32, ei as u32)));
            }
        }
        Self { tree: RangeTree::from_items(edges), rings, ring_extents }
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    pub fn extents(&self) -> Extents {
        self.tree.bbox()
    }

    fn edge(&self, tag: (u32, u32)) -> (Point, Point) {
        let pts = &self.rings[tag.0 as usize];
        let i = tag.1 as usize;
        (pts[i], pts[(i + 1) % pts.len()])
    }

    /// Point strictly inside some outer ring (even-odd)
    pub fn contains_point(&self, p: Point) -> bool {
        self.rings.iter().zip(&self.ring_extents).any(|(pts, ext)| {
            if !ext.contains_point(p) {
                return false;
            }
            let mut inside = false;
            let mut j = pts.len() - 1;
            for i in 0..pts.len() {
                let (a, b) = (pts[i], pts[j]);
                if (a.y > p.y) != (b.y > p.y) && p.x < a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y) {
                    inside = !inside;
                }
                j = i;
            }
            inside
        })
    }

    pub fn classify(&self, ext: &Extents, sample: Point) -> Placement {
        if self.tree.any_overlap(*ext) {
            Placement::Crossing
        } else if self.contains_point(sample) {
            Placement::Inside
        } else {
            Placement::Outside
        }
    }

    /// Precise test: does any edge of `ring` touch or cross the outline
    pub fn touches(&self, ring: &Ring, tolerance: f64) -> bool {
        let pts = ring.flatten(tolerance);
        let n = pts.len();
        (0..n).any(|i| {
            let (a, b) = (pts[i], pts[(i + 1) % n]);
            self.tree
                .query(Extents::new(a.x, a.y, b.x, b.y))
                .any(|item| {
                    let (c, d) = self.edge(item.tag);
                    segments_cross(a, b, c, d)
                })
        })
    }

    /// Ring lies entirely outside every outer ring and encloses none of them
    pub fn ring_outside(&self, ring: &Ring, tolerance: f64) -> bool {
        let ext = ring.extents();
        let sample = ring.iter().next().map(|(p, _)| p).unwrap_or_else(|| ext.center());
        match self.classify(&ext, sample) {
            Placement::Outside => true,
            Placement::Inside => false,
            Placement::Crossing => {
                !self.touches(ring, tolerance)
                    && !self.contains_point(sample)
                    && !self.rings.iter().any(|pts| pts.first().is_some_and(|p| ring.contains_point(*p, tolerance)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> OutlineIndex {
        let square = Ring::rectangle(&Extents::new(0.0, 0.0, 100.0, 100.0)).unwrap();
        OutlineIndex::build(&PolySet::from_ring(square), 0.01)
    }

    #[test]
    fn test_classify_inside_outside_crossing() {
        let idx = index();
        let inner = Extents::new(40.0, 40.0, 60.0, 60.0);
        assert_eq!(idx.classify(&inner, inner.center()), Placement::Inside);
        let outer = Extents::new(140.0, 40.0, 160.0, 60.0);
        assert_eq!(idx.classify(&outer, outer.center()), Placement::Outside);
        let edge = Extents::new(95.0, 40.0, 105.0, 60.0);
        assert_eq!(idx.classify(&edge, edge.center()), Placement::Crossing);
    }

    #[test]
    fn test_ring_outside_with_overlapping_box() {
        // Circle beyond the corner: its box overlaps edge boxes but the ring does not
        let idx = index();
        let c = Ring::circle(Point::new(104.0, 104.0), 5.0).unwrap();
        assert!(idx.ring_outside(&c, 0.01));
        let straddling = Ring::circle(Point::new(100.0, 50.0), 5.0).unwrap();
        assert!(!idx.ring_outside(&straddling, 0.01));
        let inside = Ring::circle(Point::new(50.0, 50.0), 5.0).unwrap();
        assert!(!idx.ring_outside(&inside, 0.01));
        let enclosing = Ring::circle(Point::new(50.0, 50.0), 200.0).unwrap();
        assert!(!idx.ring_outside(&enclosing, 0.01));
    }
}
