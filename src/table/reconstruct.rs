//! Greedy row/cell clustering of OCR words into a table.
//!
//! This is a heuristic, not a table parser. It assumes near axis-aligned
//! text: words are grouped into rows by the vertical distance between
//! consecutive word tops, then split into cells wherever the horizontal gap
//! between neighbouring boxes is wide. Skewed or rotated photos can merge two
//! rows into one or split a row in two, and results are sensitive to the
//! thresholds, which is why both are configurable.

use serde::{Deserialize, Serialize};

use super::words::WordRecord;

/// Clustering distances, in the same pixel units as the OCR boxes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableThresholds {
    /// Maximum top-edge difference between consecutive words of one row.
    pub row_threshold: i32,
    /// Horizontal gap above which a new cell starts.
    pub cell_threshold: i32,
}

impl Default for TableThresholds {
    fn default() -> Self {
        Self {
            row_threshold: 30,
            cell_threshold: 30,
        }
    }
}

/// Rows top-to-bottom, cells left-to-right. Rows may differ in length.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Table {
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cell_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    /// Plain-text rendering, one row per line with ` | ` between cells.
    pub fn to_text(&self) -> String {
        self.rows
            .iter()
            .map(|row| row.join(" | "))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Clusters words into rows and cells.
pub fn reconstruct(words: &[WordRecord], thresholds: &TableThresholds) -> Table {
    let rows = group_rows(words, thresholds.row_threshold);
    let rows = rows
        .into_iter()
        .map(|row| split_cells(row, thresholds.cell_threshold))
        .collect();
    Table::new(rows)
}

/// Single top-to-bottom sweep. A word joins the current row while its top
/// stays within `row_threshold` of the previously placed word.
fn group_rows(words: &[WordRecord], row_threshold: i32) -> Vec<Vec<&WordRecord>> {
    let mut sorted: Vec<&WordRecord> = words.iter().collect();
    sorted.sort_by(|a, b| {
        (a.bbox.min_y(), a.bbox.min_x(), &a.text).cmp(&(b.bbox.min_y(), b.bbox.min_x(), &b.text))
    });

    let mut rows = Vec::new();
    let mut current: Vec<&WordRecord> = Vec::new();
    let mut previous_y: Option<i32> = None;

    for word in sorted {
        let y = word.bbox.min_y();
        if let Some(prev) = previous_y {
            if (i64::from(y) - i64::from(prev)).abs() >= i64::from(row_threshold) {
                rows.push(std::mem::take(&mut current));
            }
        }
        current.push(word);
        previous_y = Some(y);
    }

    if !current.is_empty() {
        rows.push(current);
    }

    rows
}

/// Left-to-right sweep over one row, joining words of a cell with spaces.
fn split_cells(mut row: Vec<&WordRecord>, cell_threshold: i32) -> Vec<String> {
    row.sort_by(|a, b| {
        (a.bbox.min_x(), a.bbox.min_y(), &a.text).cmp(&(b.bbox.min_x(), b.bbox.min_y(), &b.text))
    });

    let mut cells = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut last_right: Option<i32> = None;

    for word in row {
        if let Some(right) = last_right {
            if i64::from(word.bbox.min_x()) - i64::from(right) > i64::from(cell_threshold) {
                cells.push(current.join(" "));
                current.clear();
            }
        }
        current.push(&word.text);
        // Overlapping boxes must not pull the edge back to the left
        last_right = Some(last_right.map_or(word.bbox.max_x(), |r| r.max(word.bbox.max_x())));
    }

    if !current.is_empty() {
        cells.push(current.join(" "));
    }

    cells
}
