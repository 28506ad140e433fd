//! Stitch-path segmentation.
//!
//! Splits each color of a pattern into bounded clusters a stitcher can work
//! through in one pass. Growth is breadth-first: every still-unassigned cell
//! of the same color within `max_jump` (Manhattan) of a frontier cell joins
//! the segment, until the segment holds `max_stitches` cells.

use crate::error::{PlanError, ValidationError};
use crate::grid::{color_groups, Coordinate, Grid};
use crate::spatial_index::NeighborFinder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const DEFAULT_MAX_STITCHES: u32 = 150;
pub const DEFAULT_MAX_JUMP: u32 = 5;

#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NeighborSearch {
    /// Compare the popped cell against every unassigned cell of its color.
    Scan,
    /// Same result as `Scan`, using a bucket index to skip distant cells.
    #[default]
    Bucketed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SegmentationConfig {
    pub max_stitches: u32,
    pub max_jump: u32,
    /// Reject ragged grids instead of treating missing cells as empty.
    pub require_rectangular: bool,
    pub neighbor_search: NeighborSearch,
}

impl SegmentationConfig {
    pub fn new(max_stitches: u32, max_jump: u32) -> Self {
        Self {
            max_stitches,
            max_jump,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_stitches == 0 {
            return Err(ValidationError::LimitOutOfRange {
                name: "max_stitches",
                expectation: "a positive integer",
                value: 0,
            });
        }
        Ok(())
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            max_stitches: DEFAULT_MAX_STITCHES,
            max_jump: DEFAULT_MAX_JUMP,
            require_rectangular: false,
            neighbor_search: NeighborSearch::default(),
        }
    }
}

/// One continuous run of stitching in a single color.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Segment {
    pub color: String,
    pub path: Vec<Coordinate>,
}

/// Segments every populated cell of `grid`.
///
/// Colors appear in first-occurrence order of a row-major scan; within a
/// color, segments appear in discovery order.
pub fn segment_grid(grid: &Grid, config: &SegmentationConfig) -> Result<Vec<Segment>, PlanError> {
    config.validate()?;
    if config.require_rectangular {
        grid.ensure_rectangular()?;
    }

    let mut segments = Vec::<Segment>::new();
    for group in color_groups(grid) {
        let paths = segment_color_group(&group.cells, config).map_err(|err| {
            log::error!("Segmenting color {} failed: {}", group.color, err);
            err
        })?;

        log::debug!(
            "Color {}: {} cells in {} segments",
            group.color,
            group.cells.len(),
            paths.len()
        );

        segments.extend(paths.into_iter().map(|path| Segment {
            color: group.color.clone(),
            path,
        }));
    }

    Ok(segments)
}

/// Segments one color group. `cells` must be distinct and in row-major order.
pub fn segment_color_group(
    cells: &[Coordinate],
    config: &SegmentationConfig,
) -> Result<Vec<Vec<Coordinate>>, PlanError> {
    config.validate()?;

    let mut segmenter = GroupSegmenter::new(cells, config);
    let mut paths = Vec::new();
    while let Some(seed) = segmenter.next_seed() {
        paths.push(segmenter.grow(seed)?);
    }

    let covered: usize = paths.iter().map(Vec::len).sum();
    if covered != cells.len() || segmenter.assigned_count != cells.len() {
        return Err(PlanError::Computation(format!(
            "{} of {} cells assigned, {} placed in segments",
            segmenter.assigned_count,
            cells.len(),
            covered
        )));
    }

    Ok(paths)
}

/// Segments independent patterns in parallel, one task per pattern.
/// Results come back in input order.
pub fn segment_many(
    grids: &[Grid],
    config: &SegmentationConfig,
) -> Vec<Result<Vec<Segment>, PlanError>> {
    grids
        .par_iter()
        .map(|grid| segment_grid(grid, config))
        .collect()
}

struct GroupSegmenter<'a> {
    cells: &'a [Coordinate],
    max_stitches: usize,
    max_jump: u32,
    assigned: Vec<bool>,
    assigned_count: usize,
    next_unassigned: usize,
    finder: NeighborFinder,
    frontier: VecDeque<usize>,
    candidates: Vec<usize>,
}

impl<'a> GroupSegmenter<'a> {
    fn new(cells: &'a [Coordinate], config: &SegmentationConfig) -> Self {
        Self {
            cells,
            max_stitches: config.max_stitches as usize,
            max_jump: config.max_jump,
            assigned: vec![false; cells.len()],
            assigned_count: 0,
            next_unassigned: 0,
            finder: NeighborFinder::new(config.neighbor_search, cells, config.max_jump),
            frontier: VecDeque::new(),
            candidates: Vec::new(),
        }
    }

    /// First unassigned cell in row-major order.
    fn next_seed(&mut self) -> Option<usize> {
        while self.next_unassigned < self.cells.len() && self.assigned[self.next_unassigned] {
            self.next_unassigned += 1;
        }
        (self.next_unassigned < self.cells.len()).then_some(self.next_unassigned)
    }

    fn claim(&mut self, idx: usize) -> Result<(), PlanError> {
        if self.assigned[idx] {
            let cell = self.cells[idx];
            return Err(PlanError::Computation(format!(
                "cell ({}, {}) assigned twice",
                cell.row, cell.col
            )));
        }
        self.assigned[idx] = true;
        self.assigned_count += 1;
        Ok(())
    }

    fn grow(&mut self, seed: usize) -> Result<Vec<Coordinate>, PlanError> {
        self.claim(seed)?;
        let mut path = vec![self.cells[seed]];
        self.frontier.clear();
        self.frontier.push_back(seed);

        while path.len() < self.max_stitches {
            let Some(current) = self.frontier.pop_front() else {
                break;
            };

            let mut candidates = std::mem::take(&mut self.candidates);
            candidates.clear();
            self.finder.collect(
                self.cells,
                current,
                self.max_jump,
                &self.assigned,
                &mut candidates,
            );

            for idx in candidates.iter().copied() {
                self.claim(idx)?;
                path.push(self.cells[idx]);
                self.frontier.push_back(idx);
                if path.len() >= self.max_stitches {
                    break;
                }
            }
            self.candidates = candidates;
        }

        Ok(path)
    }
}
