use crate::grid::Coordinate;
use crate::segmentation::Segment;
use serde::{Deserialize, Serialize};

/// Stored form of one segment: column indices in `path_xs`, row indices in
/// `path_ys`, both in stitching order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PathRecord {
    #[serde(rename = "projectID")]
    pub project_id: String,
    pub segment_id: String,
    pub color: String,
    pub path_xs: Vec<u32>,
    pub path_ys: Vec<u32>,
}

impl PathRecord {
    pub fn from_segment(project_id: &str, index: usize, segment: &Segment) -> Self {
        Self {
            project_id: project_id.to_string(),
            segment_id: index.to_string(),
            color: segment.color.clone(),
            path_xs: segment.path.iter().map(|c| c.col).collect(),
            path_ys: segment.path.iter().map(|c| c.row).collect(),
        }
    }

    pub fn to_segment(&self) -> Result<Segment, String> {
        if self.path_xs.len() != self.path_ys.len() {
            return Err(format!(
                "Segment {} of project {} has {} xs but {} ys",
                self.segment_id,
                self.project_id,
                self.path_xs.len(),
                self.path_ys.len()
            ));
        }
        let path = self
            .path_ys
            .iter()
            .zip(&self.path_xs)
            .map(|(row, col)| Coordinate::new(*row, *col))
            .collect();
        Ok(Segment {
            color: self.color.clone(),
            path,
        })
    }
}

pub fn records_for(project_id: &str, segments: &[Segment]) -> Vec<PathRecord> {
    segments
        .iter()
        .enumerate()
        .map(|(index, segment)| PathRecord::from_segment(project_id, index, segment))
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPaths {
    pub project_id: String,
    pub last_modified: String,
    pub paths: Vec<PathRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub project_id: String,
    pub segment_count: usize,
    pub last_modified: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathsManifest {
    pub version: u8,
    pub projects: Vec<ManifestEntry>,
}

impl Default for PathsManifest {
    fn default() -> Self {
        Self {
            version: 1,
            projects: Vec::new(),
        }
    }
}
