//! Void consolidation
//!
//! Reduces the raw void list before it reaches the boolean engine: voids
//! inside other voids, voids outside the shape and exact duplicates are
//! dropped, and voids that touch nothing are flagged stand-alone so they
//! can be attached as holes without a boolean.
//!
//! Void-in-void stripping only runs when no void carries islands. A void
//! with an island (say a clearance around another fill that has its own
//! cutout) may legitimately contain a smaller void inside that island.

use super::context::InstanceContext;
use super::error::VoidResult;
use super::outline::OutlineIndex;
use crate::fill::geometry::{Direction, PolySet, Ring, RingFlags};
use crate::fill::index::RangeTree;
use geo::{Contains, Intersects};
use geo_types::Polygon;
use tracing::debug;

pub fn consolidate_voids(
    mut voids: Vec<Ring>,
    shape: &PolySet,
    do_clean: bool,
    ctx: &mut InstanceContext<'_>,
) -> VoidResult<Vec<Ring>> {
    let tol = ctx.params.arc_tolerance;
    for v in &mut voids {
        v.set_direction(Direction::CounterClockwise);
        for island in &mut v.holes {
            island.set_direction(Direction::Clockwise);
        }
    }

    if voids.iter().all(|v| v.holes.is_empty()) {
        voids = strip_nested(voids, ctx)?;
    }

    let outline = OutlineIndex::build(&shape.outline_only(), tol);
    let before = voids.len();
    let mut kept = Vec::with_capacity(voids.len());
    for (i, v) in voids.into_iter().enumerate() {
        ctx.checkpoint(i + 1)?;
        if !outline.ring_outside(&v, tol) {
            kept.push(v);
        }
    }
    ctx.stats.voids_stripped += before - kept.len();

    let mut voids = dedupe(kept, ctx);

    if do_clean || voids.len() != 1 {
        mark_stand_alone(&mut voids, &outline, ctx)?;
    }
    debug!(
        "[Autovoid] Consolidated to {} voids ({} stand-alone, {} stripped)",
        voids.len(),
        ctx.stats.stand_alone,
        ctx.stats.voids_stripped
    );
    Ok(voids)
}

fn polygons(voids: &[Ring], tolerance: f64) -> Vec<Polygon<f64>> {
    voids
        .iter()
        .map(|v| Polygon::new(v.to_line_string(tolerance), v.holes.iter().map(|h| h.to_line_string(tolerance)).collect()))
        .collect()
}

fn extent_tree(voids: &[Ring]) -> RangeTree<usize> {
    RangeTree::from_items(voids.iter().enumerate().map(|(i, v)| (v.extents(), i)))
}

/// Drop voids wholly covered by another void. Of two identical voids the
/// earlier one survives and takes the other's flags.
fn strip_nested(mut voids: Vec<Ring>, ctx: &mut InstanceContext<'_>) -> VoidResult<Vec<Ring>> {
    let tol = ctx.params.arc_tolerance;
    let eps = ctx.params.grid;
    let tree = extent_tree(&voids);
    let polys = polygons(&voids, tol);
    let mut covered = vec![false; voids.len()];

    for i in 0..voids.len() {
        ctx.checkpoint(i + 1)?;
        let ext = voids[i].extents();
        let mut identical = false;
        let cover = tree
            .query(ext)
            .find(|item| {
                let j = item.tag;
                if j == i || covered[j] || !item.bbox.contains(&ext) {
                    return false;
                }
                if voids[i].same_outline(&voids[j], eps) {
                    identical = j < i;
                    return identical;
                }
                polys[j].contains(&polys[i])
            })
            .map(|item| item.tag);
        if let Some(j) = cover {
            covered[i] = true;
            if identical {
                let flags = voids[i].flags;
                voids[j].flags |= flags;
            }
        }
    }

    let before = voids.len();
    let kept: Vec<Ring> = voids.into_iter().zip(covered).filter(|(_, c)| !c).map(|(v, _)| v).collect();
    ctx.stats.voids_stripped += before - kept.len();
    Ok(kept)
}

/// Remove exact duplicates, keeping the first and merging flags into it
fn dedupe(voids: Vec<Ring>, ctx: &mut InstanceContext<'_>) -> Vec<Ring> {
    let eps = ctx.params.grid;
    let tree = extent_tree(&voids);
    let mut keep_as: Vec<Option<usize>> = vec![None; voids.len()];
    for i in 0..voids.len() {
        let ext = voids[i].extents();
        let duplicate_of = tree
            .query(ext)
            .map(|item| item.tag)
            .filter(|&j| j < i && keep_as[j].is_none())
            .find(|&j| voids[j].holes.len() == voids[i].holes.len() && voids[j].same_outline(&voids[i], eps));
        keep_as[i] = duplicate_of;
    }

    let mut merged_flags: Vec<RingFlags> = voids.iter().map(|v| v.flags).collect();
    for (i, target) in keep_as.iter().enumerate() {
        if let Some(j) = target {
            merged_flags[*j] |= voids[i].flags;
        }
    }
    let before = voids.len();
    let out: Vec<Ring> = voids
        .into_iter()
        .enumerate()
        .filter(|(i, _)| keep_as[*i].is_none())
        .map(|(i, mut v)| {
            v.flags = merged_flags[i];
            v
        })
        .collect();
    ctx.stats.duplicates_removed += before - out.len();
    out
}

/// Flag voids lying inside the outline that neither touch it nor meet
/// another void
fn mark_stand_alone(voids: &mut [Ring], outline: &OutlineIndex, ctx: &mut InstanceContext<'_>) -> VoidResult<()> {
    let tol = ctx.params.arc_tolerance;
    let tree = extent_tree(voids);
    let polys = polygons(voids, tol);
    let mut alone = vec![false; voids.len()];
    for (i, v) in voids.iter().enumerate() {
        ctx.checkpoint(i + 1)?;
        let ext = v.extents();
        let sample = v.iter().next().map(|(p, _)| p).unwrap_or_else(|| ext.center());
        if !v.holes.is_empty() || !outline.contains_point(sample) || outline.touches(v, tol) {
            continue;
        }
        let meets_other = tree
            .query(ext)
            .any(|item| item.tag != i && polys[item.tag].intersects(&polys[i]));
        alone[i] = !meets_other;
    }
    for (v, a) in voids.iter_mut().zip(alone) {
        if a {
            v.flags |= RingFlags::STAND_ALONE;
            ctx.stats.stand_alone += 1;
        }
    }
    Ok(())
}
