use crate::error::{json_kind, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A grid cell position. Serialized as `[row, column]`.
///
/// The derived ordering is row-major, which is the order color groups list
/// their cells in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(u32, u32)", into = "(u32, u32)")]
pub struct Coordinate {
    pub row: u32,
    pub col: u32,
}

impl Coordinate {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    pub fn manhattan(self, other: Coordinate) -> u32 {
        self.row
            .abs_diff(other.row)
            .saturating_add(self.col.abs_diff(other.col))
    }
}

impl From<(u32, u32)> for Coordinate {
    fn from((row, col): (u32, u32)) -> Self {
        Self { row, col }
    }
}

impl From<Coordinate> for (u32, u32) {
    fn from(coord: Coordinate) -> Self {
        (coord.row, coord.col)
    }
}

/// Immutable matrix of color labels. `None` and `""` both mean "no stitch".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<Vec<Option<String>>>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<Option<String>>>) -> Self {
        Self { rows }
    }

    /// Builds a grid from string labels, treating `""` as an empty cell.
    pub fn from_labels<S: AsRef<str>>(rows: &[Vec<S>]) -> Self {
        let rows = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|label| {
                        let label = label.as_ref();
                        (!label.is_empty()).then(|| label.to_string())
                    })
                    .collect()
            })
            .collect();
        Self::new(rows)
    }

    /// Validates an untyped JSON grid, reporting the first offending row or cell.
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        let raw_rows = value
            .as_array()
            .ok_or_else(|| ValidationError::GridNotArray(json_kind(value)))?;

        let mut rows = Vec::with_capacity(raw_rows.len());
        for (row_idx, raw_row) in raw_rows.iter().enumerate() {
            let Some(raw_cells) = raw_row.as_array() else {
                return Err(ValidationError::RowNotArray {
                    row: row_idx,
                    found: json_kind(raw_row),
                });
            };

            let mut cells = Vec::with_capacity(raw_cells.len());
            for (col_idx, raw_cell) in raw_cells.iter().enumerate() {
                let cell = match raw_cell {
                    Value::Null => None,
                    Value::String(label) if label.is_empty() => None,
                    Value::String(label) => Some(label.clone()),
                    other => {
                        return Err(ValidationError::CellNotLabel {
                            row: row_idx,
                            column: col_idx,
                            found: json_kind(other),
                        })
                    }
                };
                cells.push(cell);
            }
            rows.push(cells);
        }

        Ok(Self::new(rows))
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Length of the longest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.populated_count() == 0
    }

    /// Fails on the first row whose length differs from row 0.
    pub fn ensure_rectangular(&self) -> Result<(), ValidationError> {
        let Some(expected) = self.rows.first().map(Vec::len) else {
            return Ok(());
        };
        for (row, cells) in self.rows.iter().enumerate().skip(1) {
            if cells.len() != expected {
                return Err(ValidationError::RaggedRow {
                    row,
                    expected,
                    found: cells.len(),
                });
            }
        }
        Ok(())
    }

    /// Label at `coord`, or `None` for empty and out-of-range cells.
    pub fn color_at(&self, coord: Coordinate) -> Option<&str> {
        self.rows
            .get(coord.row as usize)?
            .get(coord.col as usize)?
            .as_deref()
            .filter(|label| !label.is_empty())
    }

    pub fn populated_count(&self) -> usize {
        self.populated_cells().count()
    }

    /// Populated cells in row-major order.
    pub fn populated_cells(&self) -> impl Iterator<Item = (Coordinate, &str)> + '_ {
        self.rows.iter().enumerate().flat_map(|(r, row)| {
            row.iter().enumerate().filter_map(move |(c, cell)| {
                let label = cell.as_deref().filter(|label| !label.is_empty())?;
                Some((Coordinate::new(r as u32, c as u32), label))
            })
        })
    }
}

/// Every coordinate sharing one color label, in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorGroup {
    pub color: String,
    pub cells: Vec<Coordinate>,
}

/// Partitions populated cells by label, ordered by first occurrence.
pub fn color_groups(grid: &Grid) -> Vec<ColorGroup> {
    let mut group_by_color: HashMap<&str, usize> = HashMap::new();
    let mut groups = Vec::<ColorGroup>::new();

    for (coord, label) in grid.populated_cells() {
        let idx = if let Some(idx) = group_by_color.get(label) {
            *idx
        } else {
            let idx = groups.len();
            group_by_color.insert(label, idx);
            groups.push(ColorGroup {
                color: label.to_string(),
                cells: Vec::new(),
            });
            idx
        };
        groups[idx].cells.push(coord);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coordinates_serialize_as_row_column_pairs() {
        let coord = Coordinate::new(3, 7);
        assert_eq!(serde_json::to_value(coord).unwrap(), json!([3, 7]));
        let parsed: Coordinate = serde_json::from_value(json!([1, 2])).unwrap();
        assert_eq!(parsed, Coordinate::new(1, 2));
    }

    #[test]
    fn manhattan_distance_is_symmetric() {
        let a = Coordinate::new(0, 4);
        let b = Coordinate::new(3, 1);
        assert_eq!(a.manhattan(b), 6);
        assert_eq!(b.manhattan(a), 6);
        assert_eq!(a.manhattan(a), 0);
    }

    #[test]
    fn color_groups_follow_first_occurrence_order() {
        let grid = Grid::from_labels(&[
            vec!["blue", "red", ""],
            vec!["red", "green", "blue"],
        ]);
        let groups = color_groups(&grid);

        let colors = groups.iter().map(|g| g.color.as_str()).collect::<Vec<_>>();
        assert_eq!(colors, vec!["blue", "red", "green"]);
        assert_eq!(
            groups[0].cells,
            vec![Coordinate::new(0, 0), Coordinate::new(1, 2)]
        );
        assert_eq!(
            groups[1].cells,
            vec![Coordinate::new(0, 1), Coordinate::new(1, 0)]
        );
    }

    #[test]
    fn from_json_rejects_null_rows_with_their_index() {
        let err = Grid::from_json(&json!([["red", "red"], null])).unwrap_err();
        assert_eq!(
            err,
            ValidationError::RowNotArray {
                row: 1,
                found: "null"
            }
        );
    }

    #[test]
    fn from_json_rejects_non_label_cells() {
        let err = Grid::from_json(&json!([["red"], ["red", 4]])).unwrap_err();
        assert_eq!(
            err,
            ValidationError::CellNotLabel {
                row: 1,
                column: 1,
                found: "a number"
            }
        );
    }

    #[test]
    fn from_json_rejects_non_array_grid() {
        let err = Grid::from_json(&json!("red")).unwrap_err();
        assert_eq!(err, ValidationError::GridNotArray("a string"));
    }

    #[test]
    fn ragged_rows_leave_missing_cells_absent() {
        let grid = Grid::from_json(&json!([["red", null, "red"], ["red"], []])).unwrap();
        assert_eq!(grid.row_count(), 3);
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.populated_count(), 3);
        assert_eq!(grid.color_at(Coordinate::new(1, 2)), None);
        assert_eq!(grid.color_at(Coordinate::new(0, 1)), None);
        assert_eq!(grid.color_at(Coordinate::new(0, 2)), Some("red"));
        assert_eq!(
            grid.ensure_rectangular(),
            Err(ValidationError::RaggedRow {
                row: 1,
                expected: 3,
                found: 1
            })
        );
    }

    #[test]
    fn empty_grid_has_no_groups() {
        let grid = Grid::default();
        assert!(grid.is_empty());
        assert!(color_groups(&grid).is_empty());
        assert!(grid.ensure_rectangular().is_ok());
    }
}
