use std::collections::HashSet;
use std::fmt;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::TableError;

/// One untyped cell value. Numbers keep their source text so that
/// re-serialization never changes precision or formatting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Empty,
    Number { value: f64, raw: String },
    Text(String),
}

impl Cell {
    pub fn from_raw(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Cell::Empty;
        }
        match trimmed.parse::<f64>() {
            Ok(parsed) if parsed.is_finite() => Cell::Number {
                value: parsed,
                raw: trimmed.to_string(),
            },
            _ => Cell::Text(trimmed.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Cell::Number { .. })
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Source text of the cell; `None` for empty cells.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Empty => None,
            Cell::Number { raw, .. } => Some(raw),
            Cell::Text(text) => Some(text),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str().unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn distinct_values(&self) -> usize {
        self.cells
            .iter()
            .filter_map(Cell::as_str)
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|cell| !cell.is_empty()).count()
    }

    /// At least one non-empty value occurs more than once.
    pub fn has_repeated_values(&self) -> bool {
        self.distinct_values() < self.filled_count()
    }

    /// More than half of the non-empty cells are numbers.
    pub fn is_predominantly_numeric(&self) -> bool {
        let mut filled = 0usize;
        let mut numeric = 0usize;
        for cell in &self.cells {
            if cell.is_empty() {
                continue;
            }
            filled += 1;
            if cell.is_number() {
                numeric += 1;
            }
        }
        filled > 0 && numeric * 2 > filled
    }
}

/// Rectangular table of named columns. Column names are unique and every
/// column has the same number of cells.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawTable {
    columns: Vec<Column>,
    row_count: usize,
}

impl RawTable {
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        let row_count = columns.first().map(|col| col.cells.len()).unwrap_or(0);
        for column in &columns {
            if column.cells.len() != row_count {
                return Err(TableError::RaggedColumn {
                    column: column.name.clone(),
                    expected: row_count,
                    found: column.cells.len(),
                });
            }
        }
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(TableError::DuplicateColumn(column.name.clone()));
            }
        }
        Ok(Self { columns, row_count })
    }

    /// Builds a table from a header and string rows. Blank header names are
    /// replaced by `column_N` and repeated names are suffixed `_2`, `_3`, ...
    pub fn from_rows<H, R, S>(headers: H, rows: R) -> Result<Self, TableError>
    where
        H: IntoIterator<Item = S>,
        R: IntoIterator<Item = Vec<S>>,
        S: AsRef<str>,
    {
        let names = unique_names(headers.into_iter().map(|h| h.as_ref().to_string()));
        let width = names.len();
        let mut cells: Vec<Vec<Cell>> = vec![Vec::new(); width];

        for (row_index, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(TableError::RaggedRow {
                    row_index,
                    expected: width,
                    found: row.len(),
                });
            }
            for (idx, value) in row.iter().enumerate() {
                cells[idx].push(Cell::from_raw(value.as_ref()));
            }
        }

        let columns = names
            .into_iter()
            .zip(cells)
            .map(|(name, cells)| Column { name, cells })
            .collect();
        Self::new(columns)
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|col| col.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|col| col.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|col| col.name == name)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&Cell> {
        self.columns.get(column).and_then(|col| col.cells.get(row))
    }

    pub fn row(&self, row: usize) -> Vec<Cell> {
        self.columns
            .iter()
            .map(|col| col.cells.get(row).cloned().unwrap_or(Cell::Empty))
            .collect()
    }

    /// Returns a copy of the table with one column renamed.
    pub fn rename_column(mut self, from: &str, to: &str) -> Result<Self, TableError> {
        if from == to {
            return Ok(self);
        }
        if self.column(to).is_some() {
            return Err(TableError::DuplicateColumn(to.to_string()));
        }
        let column = self
            .columns
            .iter_mut()
            .find(|col| col.name == from)
            .ok_or_else(|| TableError::UnknownColumn(from.to_string()))?;
        column.name = to.to_string();
        Ok(self)
    }

    /// All columns as nullable string series, in table order.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let columns: Vec<polars::prelude::Column> = self
            .columns
            .iter()
            .map(|col| {
                let values: Vec<Option<&str>> = col.cells.iter().map(Cell::as_str).collect();
                Series::new(col.name.as_str().into(), values).into()
            })
            .collect();
        DataFrame::new(columns)
    }
}

/// Result of a successful decode: the table plus which parser produced it.
#[derive(Debug, Clone)]
pub struct DecodedTable {
    pub table: RawTable,
    pub parser: &'static str,
    pub skipped_rows: usize,
}

fn unique_names(headers: impl Iterator<Item = String>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for (idx, header) in headers.enumerate() {
        let base = if header.trim().is_empty() {
            format!("column_{}", idx + 1)
        } else {
            header
        };
        let mut candidate = base.clone();
        let mut suffix = 2;
        while names.contains(&candidate) {
            candidate = format!("{base}_{suffix}");
            suffix += 1;
        }
        names.push(candidate);
    }
    names
}
