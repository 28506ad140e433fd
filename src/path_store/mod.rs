//! Persistence for planned stitch paths.
//!
//! The segmentation engine never touches storage; callers hand a store to
//! [`segment_and_store`] when they want the result kept.

pub mod models;
pub mod store;

use crate::grid::Grid;
use crate::segmentation::{segment_grid, SegmentationConfig};
use serde::Serialize;

pub use models::{records_for, ManifestEntry, PathRecord};
pub use store::{validate_project_id, FilePathStore, MemoryPathStore, PathStore};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SaveSummary {
    pub project_id: String,
    pub segment_count: usize,
    pub message: String,
}

/// Segments `grid` and replaces the project's stored paths with the result.
pub fn segment_and_store(
    store: &dyn PathStore,
    project_id: &str,
    grid: &Grid,
    config: &SegmentationConfig,
) -> Result<SaveSummary, String> {
    validate_project_id(project_id)?;
    let segments = segment_grid(grid, config).map_err(|err| err.to_string())?;
    let records = records_for(project_id, &segments);
    store.save_paths(project_id, &records)?;

    Ok(SaveSummary {
        project_id: project_id.to_string(),
        segment_count: records.len(),
        message: format!("Saved {} segments", records.len()),
    })
}
