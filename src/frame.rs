//! In-memory table model shared by the normalizer, merge engine, and
//! validation engine.
//!
//! A [`Frame`] holds an ordered column list plus rows of loosely typed
//! cells. The fill-once helpers implement the invariant that a fallback or
//! derived value may only land in a column that is wholly absent or blank
//! ([`Frame::fill_column`]) or, per row, in a cell that is currently blank
//! ([`Frame::fill_cell_if_blank`]).

use std::collections::HashMap;

use crate::data::{Cell, Value, is_blank};

static EMPTY_CELL: Cell = None;

#[derive(Debug, Clone, Default)]
pub struct Frame {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<Cell>>,
}

impl Frame {
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        let mut frame = Frame::default();
        for column in columns {
            frame.ensure_column(column.as_ref());
        }
        frame
    }

    /// A frame with no columns yet and `count` empty rows; columns added
    /// later via [`Frame::ensure_column`] pad every row with nulls.
    pub fn with_blank_rows(count: usize) -> Self {
        let mut frame = Frame::default();
        frame.rows = vec![Vec::new(); count];
        frame
    }

    /// Builds a frame from raw CSV records: blank cells become `None`,
    /// everything else starts life as text.
    pub fn from_records(headers: &[String], records: &[Vec<String>]) -> Self {
        let mut frame = Frame::new(headers);
        for record in records {
            let cells = headers
                .iter()
                .enumerate()
                .map(|(idx, _)| raw_cell(record.get(idx).map(String::as_str).unwrap_or("")))
                .collect();
            frame.rows.push(cells);
        }
        frame
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Appends the column if missing, padding existing rows with nulls.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.index.get(name) {
            return *idx;
        }
        let idx = self.columns.len();
        self.columns.push(name.to_string());
        self.index.insert(name.to_string(), idx);
        for row in &mut self.rows {
            row.push(None);
        }
        idx
    }

    pub fn push_row(&mut self, mut cells: Vec<Cell>) {
        cells.resize(self.columns.len(), None);
        self.rows.push(cells);
    }

    pub fn get(&self, row: usize, column: &str) -> &Cell {
        match self.column_index(column) {
            Some(idx) => self.rows.get(row).and_then(|r| r.get(idx)).unwrap_or(&EMPTY_CELL),
            None => &EMPTY_CELL,
        }
    }

    pub fn set(&mut self, row: usize, column: &str, value: Cell) {
        let idx = self.ensure_column(column);
        if let Some(cells) = self.rows.get_mut(row) {
            cells[idx] = value;
        }
    }

    /// True when the column is absent or blank in every row, i.e. a
    /// fallback value is still allowed to claim it.
    pub fn column_is_vacant(&self, name: &str) -> bool {
        match self.column_index(name) {
            None => true,
            Some(idx) => self.rows.iter().all(|row| is_blank(&row[idx])),
        }
    }

    /// Writes a full column of values only while the column is vacant.
    /// Returns whether the fill was applied.
    pub fn fill_column(&mut self, name: &str, values: Vec<Cell>) -> bool {
        if !self.column_is_vacant(name) {
            return false;
        }
        let idx = self.ensure_column(name);
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[idx] = value;
        }
        true
    }

    /// Per-row variant of the fill-once rule: only a currently blank cell
    /// accepts the value.
    pub fn fill_cell_if_blank(&mut self, row: usize, column: &str, value: Cell) {
        let idx = self.ensure_column(column);
        if let Some(cells) = self.rows.get_mut(row)
            && is_blank(&cells[idx])
        {
            cells[idx] = value;
        }
    }

    /// Concatenates another frame below this one, unioning columns by name.
    /// Row order is preserved: all of `self`, then all of `other`.
    pub fn append(&mut self, other: Frame) {
        let mut positions = Vec::with_capacity(other.columns.len());
        for column in &other.columns {
            positions.push(self.ensure_column(column));
        }
        let width = self.columns.len();
        for row in other.rows {
            let mut cells = vec![None; width];
            for (src_idx, value) in row.into_iter().enumerate() {
                cells[positions[src_idx]] = value;
            }
            self.rows.push(cells);
        }
    }

    /// Restricts and reorders columns to the given schema, creating any
    /// absent schema columns as nulls and dropping columns outside it.
    pub fn conform(&mut self, schema: &[String]) {
        for column in schema {
            self.ensure_column(column);
        }
        let order: Vec<usize> = schema
            .iter()
            .map(|column| self.index[column])
            .collect();
        self.rows = self
            .rows
            .iter()
            .map(|row| order.iter().map(|idx| row[*idx].clone()).collect())
            .collect();
        self.columns = schema.to_vec();
        self.index = self
            .columns
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();
    }

    /// Rendered row used when writing CSV output.
    pub fn display_row(&self, row: usize) -> Vec<String> {
        self.rows
            .get(row)
            .map(|cells| {
                cells
                    .iter()
                    .map(|cell| cell.as_ref().map(Value::as_display).unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Clones a column's cells; absent columns read as all-null.
    pub fn column_cells(&self, name: &str) -> Vec<Cell> {
        match self.column_index(name) {
            Some(idx) => self.rows.iter().map(|row| row[idx].clone()).collect(),
            None => vec![None; self.rows.len()],
        }
    }

    /// Count of non-blank cells in a column, for fill diagnostics.
    pub fn populated_count(&self, column: &str) -> usize {
        match self.column_index(column) {
            None => 0,
            Some(idx) => self
                .rows
                .iter()
                .filter(|row| !is_blank(&row[idx]))
                .count(),
        }
    }
}

fn raw_cell(raw: &str) -> Cell {
    if raw.trim().is_empty() {
        None
    } else {
        Some(Value::Text(raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Cell {
        Some(Value::Text(value.to_string()))
    }

    #[test]
    fn from_records_turns_blank_cells_into_nulls() {
        let headers = vec!["A".to_string(), "B".to_string()];
        let frame = Frame::from_records(&headers, &[vec!["x".into(), "  ".into()]]);
        assert_eq!(frame.get(0, "A"), &text("x"));
        assert!(frame.get(0, "B").is_none());
    }

    #[test]
    fn fill_column_respects_existing_data() {
        let headers = vec!["BEND".to_string()];
        let mut frame = Frame::from_records(&headers, &[vec!["1.5".into()]]);
        assert!(!frame.fill_column("BEND", vec![text("2.0")]));
        assert_eq!(frame.get(0, "BEND"), &text("1.5"));

        assert!(frame.fill_column("BEND_HSG", vec![text("1.5")]));
        assert_eq!(frame.get(0, "BEND_HSG"), &text("1.5"));
    }

    #[test]
    fn fill_column_claims_a_column_that_is_blank_everywhere() {
        let headers = vec!["STATE".to_string()];
        let mut frame = Frame::from_records(&headers, &[vec!["".into()], vec!["  ".into()]]);
        assert!(frame.fill_column("STATE", vec![text("TX"), None]));
        assert_eq!(frame.get(0, "STATE"), &text("TX"));
        assert!(frame.get(1, "STATE").is_none());
    }

    #[test]
    fn fill_cell_if_blank_is_per_row() {
        let headers = vec!["STATE".to_string()];
        let mut frame =
            Frame::from_records(&headers, &[vec!["NM".into()], vec!["".into()]]);
        frame.fill_cell_if_blank(0, "STATE", text("TX"));
        frame.fill_cell_if_blank(1, "STATE", text("TX"));
        assert_eq!(frame.get(0, "STATE"), &text("NM"));
        assert_eq!(frame.get(1, "STATE"), &text("TX"));
    }

    #[test]
    fn append_unions_columns_and_preserves_order() {
        let mut left = Frame::from_records(
            &["A".to_string(), "B".to_string()],
            &[vec!["1".into(), "2".into()]],
        );
        let right = Frame::from_records(
            &["B".to_string(), "C".to_string()],
            &[vec!["3".into(), "4".into()]],
        );
        left.append(right);
        assert_eq!(left.columns(), &["A", "B", "C"]);
        assert_eq!(left.row_count(), 2);
        assert!(left.get(1, "A").is_none());
        assert_eq!(left.get(1, "B"), &text("3"));
        assert_eq!(left.get(1, "C"), &text("4"));
    }

    #[test]
    fn conform_orders_and_drops_extras() {
        let mut frame = Frame::from_records(
            &["EXTRA".to_string(), "B".to_string()],
            &[vec!["x".into(), "2".into()]],
        );
        frame.conform(&["A".to_string(), "B".to_string()]);
        assert_eq!(frame.columns(), &["A", "B"]);
        assert!(frame.get(0, "A").is_none());
        assert_eq!(frame.get(0, "B"), &text("2"));
        assert!(!frame.has_column("EXTRA"));
    }
}
