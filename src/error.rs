use thiserror::Error;

/// Malformed input. Reported before any segmentation work starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Malformed request: {0}")]
    MalformedRequest(String),
    #[error("Request is missing a grid")]
    MissingGrid,
    #[error("Grid must be an array of rows, got {0}")]
    GridNotArray(&'static str),
    #[error("Row {row} must be an array of color labels, got {found}")]
    RowNotArray { row: usize, found: &'static str },
    #[error("Cell at row {row}, column {column} must be a color label or null, got {found}")]
    CellNotLabel {
        row: usize,
        column: usize,
        found: &'static str,
    },
    #[error("Row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("{name} must be {expectation}, got {value}")]
    LimitOutOfRange {
        name: &'static str,
        expectation: &'static str,
        value: i64,
    },
    #[error("Confetti level must be between 1 and 10, got {0}")]
    ConfettiOutOfRange(u32),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Internal invariant violation. A defect, never worth retrying.
    #[error("Segmentation invariant violated: {0}")]
    Computation(String),
}

impl PlanError {
    pub fn is_validation(&self) -> bool {
        matches!(self, PlanError::Validation(_))
    }
}

/// Short JSON type name used in validation messages.
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
