pub mod error;
pub mod estimate;
pub mod grid;
pub mod handler;
pub mod path_store;
pub mod segmentation;

mod cli;
mod spatial_index;

use estimate::{estimate_pattern, PatternEstimate};
use grid::Grid;
use path_store::{segment_and_store, PathStore, SaveSummary};
use segmentation::{segment_grid, segment_many, Segment, SegmentationConfig};
use std::time::Instant;

pub use cli::run;

/// Split a pattern into stitching segments.
///
/// Every populated cell lands in exactly one segment; no segment holds more
/// than `config.max_stitches` cells, and every cell after the first lies
/// within `config.max_jump` (Manhattan) of some earlier cell of its segment.
/// Path order is breadth-first discovery order, so neighbors in the path
/// may be further apart than `max_jump`.
pub fn plan_segments(grid: &Grid, config: &SegmentationConfig) -> Result<Vec<Segment>, String> {
    log::info!(
        "Planning segments: {} rows, {} stitches, max_stitches={}, max_jump={}",
        grid.row_count(),
        grid.populated_count(),
        config.max_stitches,
        config.max_jump
    );

    let started = Instant::now();
    let segments = segment_grid(grid, config).map_err(|err| err.to_string())?;

    log::info!(
        "Planned {} segments in {}ms",
        segments.len(),
        started.elapsed().as_millis()
    );

    Ok(segments)
}

/// Plan several independent patterns across all CPU cores.
pub fn plan_segments_batch(
    grids: &[Grid],
    config: &SegmentationConfig,
) -> Vec<Result<Vec<Segment>, String>> {
    log::info!("Planning {} patterns in parallel", grids.len());

    segment_many(grids, config)
        .into_iter()
        .map(|result| result.map_err(|err| err.to_string()))
        .collect()
}

/// Plan a pattern and replace the project's stored paths with the result.
pub fn save_planned_segments(
    store: &dyn PathStore,
    project_id: &str,
    grid: &Grid,
    config: &SegmentationConfig,
) -> Result<SaveSummary, String> {
    log::info!("Planning and saving segments for project {}", project_id);

    let summary = segment_and_store(store, project_id, grid, config)?;

    log::info!("{} for project {}", summary.message, project_id);
    Ok(summary)
}

/// Estimate stitching hours for each skill level.
pub fn estimate_pattern_time(grid: &Grid, confetti_level: u32) -> Result<PatternEstimate, String> {
    estimate_pattern(grid, confetti_level).map_err(|err| err.to_string())
}
