#![forbid(unsafe_code)]

//! Corner navigation over irregular tiled grids.
//!
//! Tiles of a treemap or a nested board rarely line up into a regular
//! grid. This strategy builds one from the tiles themselves:
//!
//! 1. Columns are the intervals between the sorted unique left/right edges
//!    of every tile; rows likewise from top/bottom edges.
//! 2. Each tile covers the inclusive range of cells between its edges.
//! 3. A move scans outward from the source tile's edge, one column (or row)
//!    at a time. At each step every cell across the source's perpendicular
//!    span is checked, and the first cell occupied by another tile wins.
//!
//! Only tiles at the same nesting depth as the source take part.

use keyzone_core::{Axis, ItemId};

use super::{Candidate, Direction};

/// Virtual grid over a set of tiles.
#[derive(Debug, Clone)]
pub struct CellGrid {
    cols: Vec<i32>,
    rows: Vec<i32>,
    /// Per tile: inclusive (col_start, col_end, row_start, row_end).
    spans: Vec<(usize, usize, usize, usize)>,
    /// Per cell (row-major): tile indices covering it, in item order.
    cells: Vec<Vec<usize>>,
}

impl CellGrid {
    /// Build the grid for `tiles`. Empty tiles are ignored.
    #[must_use]
    pub fn build(tiles: &[Candidate]) -> Self {
        let mut cols: Vec<i32> = Vec::with_capacity(tiles.len() * 2);
        let mut rows: Vec<i32> = Vec::with_capacity(tiles.len() * 2);
        for t in tiles.iter().filter(|t| !t.rect.is_empty()) {
            cols.extend([t.rect.left(), t.rect.right()]);
            rows.extend([t.rect.top(), t.rect.bottom()]);
        }
        cols.sort_unstable();
        cols.dedup();
        rows.sort_unstable();
        rows.dedup();

        let ncols = cols.len().saturating_sub(1);
        let nrows = rows.len().saturating_sub(1);
        let mut cells = vec![Vec::new(); ncols * nrows];
        let mut spans = Vec::with_capacity(tiles.len());

        for (index, t) in tiles.iter().enumerate() {
            let span = if t.rect.is_empty() {
                None
            } else {
                cell_range(&cols, t.rect.left(), t.rect.right())
                    .zip(cell_range(&rows, t.rect.top(), t.rect.bottom()))
            };
            let Some(((c0, c1), (r0, r1))) = span else {
                spans.push((usize::MAX, 0, usize::MAX, 0));
                continue;
            };
            for r in r0..=r1 {
                for c in c0..=c1 {
                    cells[r * ncols + c].push(index);
                }
            }
            spans.push((c0, c1, r0, r1));
        }

        Self {
            cols,
            rows,
            spans,
            cells,
        }
    }

    /// Number of columns.
    #[must_use]
    pub fn columns(&self) -> usize {
        self.cols.len().saturating_sub(1)
    }

    /// Number of rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    /// Inclusive cell range `(col_start, col_end, row_start, row_end)` of a
    /// tile, `None` for an empty tile.
    #[must_use]
    pub fn span(&self, index: usize) -> Option<(usize, usize, usize, usize)> {
        self.spans.get(index).copied().filter(|s| s.0 != usize::MAX)
    }

    fn at(&self, col: usize, row: usize) -> &[usize] {
        &self.cells[row * self.columns() + col]
    }

    /// First tile other than `from` met when scanning in `direction`.
    #[must_use]
    pub fn scan(&self, from: usize, direction: Direction) -> Option<usize> {
        let (c0, c1, r0, r1) = self.span(from)?;
        let axis = direction.axis()?;
        let forward = direction.is_forward();

        let (lo, hi, limit) = match axis {
            Axis::Horizontal => (r0, r1, self.columns()),
            Axis::Vertical => (c0, c1, self.rows()),
        };
        let steps: Box<dyn Iterator<Item = usize>> = match (axis, forward) {
            (Axis::Horizontal, true) => Box::new(c1 + 1..limit),
            (Axis::Horizontal, false) => Box::new((0..c0).rev()),
            (Axis::Vertical, true) => Box::new(r1 + 1..limit),
            (Axis::Vertical, false) => Box::new((0..r0).rev()),
        };

        for step in steps {
            for across in lo..=hi {
                let (col, row) = match axis {
                    Axis::Horizontal => (step, across),
                    Axis::Vertical => (across, step),
                };
                if let Some(&hit) = self.at(col, row).iter().find(|&&i| i != from) {
                    return Some(hit);
                }
            }
        }
        None
    }
}

/// Inclusive cell indices covered by `[start, end)` given sorted edges.
fn cell_range(edges: &[i32], start: i32, end: i32) -> Option<(usize, usize)> {
    let first = edges.binary_search(&start).ok()?;
    let stop = edges.binary_search(&end).ok()?;
    (stop > first).then(|| (first, stop - 1))
}

/// Resolve a corner move from `source` among `candidates`.
///
/// Candidates at a different nesting depth than the source are excluded.
#[must_use]
pub fn navigate(source: &Candidate, candidates: &[Candidate], direction: Direction) -> Option<ItemId> {
    let peers: Vec<Candidate> = candidates
        .iter()
        .filter(|c| c.depth == source.depth && c.id != source.id)
        .cloned()
        .chain(std::iter::once(source.clone()))
        .collect();
    let from = peers.len() - 1;
    let grid = CellGrid::build(&peers);
    grid.scan(from, direction).map(|i| peers[i].id.clone())
}
