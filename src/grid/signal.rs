//! Electrode-grid signal container

use std::fmt;
use std::ops::Range;

use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::config::constants::grid;
use crate::error::{EmgErrorBuilder, EmgResult};

/// Identifier of one electrode column
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnKey(String);

impl ColumnKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key in the `col<N>` convention
    pub fn indexed(index: usize) -> Self {
        Self(format!("{}{}", grid::COLUMN_KEY_PREFIX, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ColumnKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for ColumnKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// One electrode column: a `[sample, row]` table
#[derive(Debug, Clone, PartialEq)]
pub struct GridColumn {
    pub key: ColumnKey,
    pub data: Array2<f64>,
}

impl GridColumn {
    pub fn new(key: impl Into<ColumnKey>, data: Array2<f64>) -> Self {
        Self { key: key.into(), data }
    }

    pub fn n_rows(&self) -> usize {
        self.data.ncols()
    }

    /// Samples of one row (channel)
    pub fn channel(&self, row: usize) -> ArrayView1<'_, f64> {
        self.data.column(row)
    }

    /// True when a channel carries no numeric value at all
    ///
    /// Such channels mark unused electrode positions.
    pub fn is_empty_channel(&self, row: usize) -> bool {
        self.channel(row).iter().all(|v| v.is_nan())
    }
}

/// Multi-column electrode grid
///
/// All columns share the same sample count. Row labels are contiguous and
/// start at `first_row`, which is 0 for raw signals and grows by one for
/// each differential step.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSignal {
    columns: Vec<GridColumn>,
    n_samples: usize,
    first_row: usize,
}

impl GridSignal {
    /// Build a raw (monopolar) grid
    pub fn new(columns: Vec<GridColumn>) -> EmgResult<Self> {
        Self::with_first_row(columns, 0)
    }

    /// Build a grid whose row labels start at `first_row`
    pub fn with_first_row(columns: Vec<GridColumn>, first_row: usize) -> EmgResult<Self> {
        let n_samples = columns.first().map(|c| c.data.nrows()).unwrap_or(0);

        for column in &columns {
            if column.data.nrows() != n_samples {
                return Err(EmgErrorBuilder::new("grid", "new")
                    .info("column", column.key.as_str())
                    .mismatch(
                        "grid signal",
                        "all columns must share the same sample count",
                        n_samples,
                        column.data.nrows(),
                    ));
            }
        }

        for (pos, column) in columns.iter().enumerate() {
            if columns[..pos].iter().any(|c| c.key == column.key) {
                return Err(EmgErrorBuilder::new("grid", "new")
                    .invalid_data("grid signal", &format!("duplicate column key '{}'", column.key)));
            }
        }

        Ok(Self { columns, n_samples, first_row })
    }

    /// Grid from `[sample, row]` tables keyed `col0`, `col1`, ...
    pub fn from_arrays(arrays: Vec<Array2<f64>>) -> EmgResult<Self> {
        let columns = arrays
            .into_iter()
            .enumerate()
            .map(|(i, data)| GridColumn::new(ColumnKey::indexed(i), data))
            .collect();
        Self::new(columns)
    }

    pub fn columns(&self) -> &[GridColumn] {
        &self.columns
    }

    pub fn column(&self, key: &ColumnKey) -> Option<&GridColumn> {
        self.columns.iter().find(|c| &c.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &ColumnKey> + '_ {
        self.columns.iter().map(|c| &c.key)
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn first_row(&self) -> usize {
        self.first_row
    }

    /// Row labels of a column
    pub fn row_labels(&self, column: &GridColumn) -> Range<usize> {
        self.first_row..self.first_row + column.n_rows()
    }

    /// View of one column table
    pub fn view(&self, key: &ColumnKey) -> Option<ArrayView2<'_, f64>> {
        self.column(key).map(|c| c.data.view())
    }
}
