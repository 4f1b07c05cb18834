#![forbid(unsafe_code)]

//! Spatial navigation: arrow-key focus movement over free 2D layouts.
//!
//! # Algorithm
//!
//! 1. Keep candidates whose center lies strictly ahead of the source center
//!    in the direction of motion.
//! 2. Keep candidates whose beam (projection on the perpendicular axis)
//!    overlaps the source's beam.
//! 3. Score each candidate: `13 × distance² + misalignment²`, where
//!    `distance` is the gap between the facing edges and `misalignment` is
//!    the perpendicular offset from the reference coordinate.
//! 4. At equal distance, a candidate whose beam contains the source's beam
//!    beats a partial overlap. Otherwise the lowest score wins, and item
//!    order breaks exact ties.
//!
//! # Sticky coordinate
//!
//! The reference coordinate is the source center unless a sticky value is
//! supplied. The caller stores [`SpatialMove::sticky`] and passes it back on
//! the next move along the same axis, so a path through items of uneven
//! size keeps to its column or row. A move on the other axis starts fresh.
//!
//! # Invariants
//!
//! - All arithmetic is integer; centers are doubled to avoid division.
//! - The result is deterministic for a given layout and item order.
//! - If no candidate qualifies, the result is `None`.

use keyzone_core::{Axis, ItemId, Rect};

use super::{Candidate, Direction};

/// Outcome of a spatial move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpatialMove {
    /// Item receiving focus.
    pub target: ItemId,
    /// Doubled perpendicular coordinate to remember for the next move on
    /// the same axis.
    pub sticky: i64,
}

#[derive(Debug, Clone, Copy)]
struct Scored {
    index: usize,
    distance: i64,
    score: i128,
    contains: bool,
}

impl Scored {
    fn beats(&self, other: &Scored) -> bool {
        if self.distance == other.distance && self.contains != other.contains {
            return self.contains;
        }
        if self.score != other.score {
            return self.score < other.score;
        }
        self.index < other.index
    }
}

/// Find the best spatial target from `source` in `direction`.
///
/// `sticky` is the doubled perpendicular coordinate remembered from the
/// previous move on this axis, if any.
#[must_use]
pub fn navigate(
    source: &Candidate,
    candidates: &[Candidate],
    direction: Direction,
    sticky: Option<i64>,
) -> Option<SpatialMove> {
    let axis = direction.axis()?;
    let perp = axis.perpendicular();
    let src = &source.rect;
    let src_beam = src.beam(axis);
    let reference = sticky.unwrap_or_else(|| src.span(perp).center2());
    let src_center = src.span(axis).center2();

    let mut best: Option<Scored> = None;

    for (index, candidate) in candidates.iter().enumerate() {
        if candidate.id == source.id {
            continue;
        }
        let rect = &candidate.rect;
        let center = rect.span(axis).center2();
        let ahead = if direction.is_forward() {
            center > src_center
        } else {
            center < src_center
        };
        if !ahead {
            continue;
        }

        let beam = rect.beam(axis);
        if !beam.overlaps(&src_beam) {
            continue;
        }

        let distance = 2 * edge_gap(src, rect, direction).max(0);
        let misalignment = (rect.span(perp).center2() - reference).abs();
        let scored = Scored {
            index,
            distance,
            score: 13 * i128::from(distance).pow(2) + i128::from(misalignment).pow(2),
            contains: beam.contains(&src_beam),
        };

        if best.is_none_or(|b| scored.beats(&b)) {
            best = Some(scored);
        }
    }

    best.map(|b| SpatialMove {
        target: candidates[b.index].id.clone(),
        sticky: reference,
    })
}

/// Gap between the source's leading edge and the candidate's facing edge.
fn edge_gap(src: &Rect, candidate: &Rect, direction: Direction) -> i64 {
    match direction {
        Direction::Down => i64::from(candidate.top()) - i64::from(src.bottom()),
        Direction::Up => i64::from(src.top()) - i64::from(candidate.bottom()),
        Direction::Right => i64::from(candidate.left()) - i64::from(src.right()),
        Direction::Left => i64::from(src.left()) - i64::from(candidate.right()),
        Direction::Home | Direction::End => 0,
    }
}

/// Which sticky slot a move on `axis` reads and writes: vertical moves
/// remember x, horizontal moves remember y.
#[must_use]
pub const fn sticky_slot(axis: Axis) -> Axis {
    axis.perpendicular()
}
