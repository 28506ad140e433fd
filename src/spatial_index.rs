//! Neighbor lookup for segment growth.
//!
//! Both finders report the same candidates in the same (row-major) order, so
//! switching between them never changes segment membership or boundaries.

use crate::grid::Coordinate;
use crate::segmentation::NeighborSearch;
use std::collections::HashMap;

pub(crate) enum NeighborFinder {
    Scan,
    Bucketed(BucketIndex),
}

impl NeighborFinder {
    pub(crate) fn new(search: NeighborSearch, cells: &[Coordinate], max_jump: u32) -> Self {
        match search {
            NeighborSearch::Scan => Self::Scan,
            NeighborSearch::Bucketed => Self::Bucketed(BucketIndex::build(cells, max_jump)),
        }
    }

    /// Pushes the index of every unassigned cell within `max_jump` of
    /// `cells[center]` onto `out`, in ascending index order.
    pub(crate) fn collect(
        &mut self,
        cells: &[Coordinate],
        center: usize,
        max_jump: u32,
        assigned: &[bool],
        out: &mut Vec<usize>,
    ) {
        match self {
            Self::Scan => {
                let origin = cells[center];
                for (idx, cell) in cells.iter().enumerate() {
                    if !assigned[idx] && origin.manhattan(*cell) <= max_jump {
                        out.push(idx);
                    }
                }
            }
            Self::Bucketed(index) => index.collect(cells, center, max_jump, assigned, out),
        }
    }
}

/// Square buckets of side `max(max_jump, 1)`. Any cell within `max_jump`
/// of a point lies in the 3x3 bucket block around that point's bucket.
pub(crate) struct BucketIndex {
    size: u32,
    buckets: HashMap<u64, Vec<usize>>,
}

#[inline]
fn bucket_key(bucket_row: u32, bucket_col: u32) -> u64 {
    ((bucket_row as u64) << 32) | bucket_col as u64
}

impl BucketIndex {
    pub(crate) fn build(cells: &[Coordinate], max_jump: u32) -> Self {
        let size = max_jump.max(1);
        let mut buckets = HashMap::<u64, Vec<usize>>::new();
        for (idx, cell) in cells.iter().enumerate() {
            buckets
                .entry(bucket_key(cell.row / size, cell.col / size))
                .or_default()
                .push(idx);
        }
        Self { size, buckets }
    }

    fn collect(
        &mut self,
        cells: &[Coordinate],
        center: usize,
        max_jump: u32,
        assigned: &[bool],
        out: &mut Vec<usize>,
    ) {
        let origin = cells[center];
        let bucket_row = origin.row / self.size;
        let bucket_col = origin.col / self.size;
        let start = out.len();

        for row in bucket_row.saturating_sub(1)..=bucket_row.saturating_add(1) {
            for col in bucket_col.saturating_sub(1)..=bucket_col.saturating_add(1) {
                let Some(bucket) = self.buckets.get_mut(&bucket_key(row, col)) else {
                    continue;
                };
                // Assigned cells never come back, so drop them as we go.
                bucket.retain(|idx| !assigned[*idx]);
                for idx in bucket.iter() {
                    if origin.manhattan(cells[*idx]) <= max_jump {
                        out.push(*idx);
                    }
                }
            }
        }

        out[start..].sort_unstable();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(rows: u32, cols: u32) -> Vec<Coordinate> {
        let mut cells = Vec::new();
        for row in 0..rows {
            for col in 0..cols {
                cells.push(Coordinate::new(row, col));
            }
        }
        cells
    }

    #[test]
    fn bucketed_lookup_matches_full_scan() {
        let cells = block(9, 11);
        let mut assigned = vec![false; cells.len()];
        for idx in (0..cells.len()).step_by(3) {
            assigned[idx] = true;
        }

        for max_jump in [0, 1, 2, 3, 7] {
            let mut scan = NeighborFinder::new(NeighborSearch::Scan, &cells, max_jump);
            let mut bucketed = NeighborFinder::new(NeighborSearch::Bucketed, &cells, max_jump);
            for center in 0..cells.len() {
                let mut expected = Vec::new();
                let mut actual = Vec::new();
                scan.collect(&cells, center, max_jump, &assigned, &mut expected);
                bucketed.collect(&cells, center, max_jump, &assigned, &mut actual);
                assert_eq!(expected, actual, "max_jump={max_jump} center={center}");
            }
        }
    }

    #[test]
    fn zero_jump_finds_nothing_but_an_unassigned_self() {
        let cells = block(3, 3);
        let mut assigned = vec![false; cells.len()];
        assigned[4] = true;
        let mut finder = NeighborFinder::new(NeighborSearch::Bucketed, &cells, 0);
        let mut out = Vec::new();
        finder.collect(&cells, 4, 0, &assigned, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn buckets_forget_assigned_cells() {
        let cells = block(2, 2);
        let mut index = BucketIndex::build(&cells, 5);
        let assigned = vec![true, false, true, false];
        let mut out = Vec::new();
        index.collect(&cells, 0, 5, &assigned, &mut out);
        assert_eq!(out, vec![1, 3]);
        let remaining: usize = index.buckets.values().map(Vec::len).sum();
        assert_eq!(remaining, 2);
    }
}
