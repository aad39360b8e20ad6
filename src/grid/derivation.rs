//! Spatial derivatives along the rows of each electrode column

use std::fmt;
use std::str::FromStr;

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::constants::grid;
use crate::error::{EmgError, EmgErrorBuilder, EmgResult};
use crate::grid::signal::{GridColumn, GridSignal};

/// Spatial filter applied before template extraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Derivation {
    /// Raw monopolar signal
    Mono,
    /// Single differential along rows
    #[default]
    SingleDifferential,
    /// Double differential along rows
    DoubleDifferential,
}

impl Derivation {
    pub const NAMES: [&'static str; 3] = ["mono", "sd", "dd"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Derivation::Mono => "mono",
            Derivation::SingleDifferential => "sd",
            Derivation::DoubleDifferential => "dd",
        }
    }

    /// Rows each column loses under this derivation
    pub fn rows_removed(&self) -> usize {
        let steps = match self {
            Derivation::Mono => 0,
            Derivation::SingleDifferential => 1,
            Derivation::DoubleDifferential => 2,
        };
        steps * grid::ROWS_PER_DIFFERENTIAL
    }

    /// Apply the derivation, returning a new grid
    pub fn apply(&self, signal: &GridSignal) -> EmgResult<GridSignal> {
        match self {
            Derivation::Mono => Ok(signal.clone()),
            Derivation::SingleDifferential => single_differential(signal),
            Derivation::DoubleDifferential => double_differential(signal),
        }
    }
}

impl fmt::Display for Derivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Derivation {
    type Err = EmgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mono" => Ok(Derivation::Mono),
            "sd" => Ok(Derivation::SingleDifferential),
            "dd" => Ok(Derivation::DoubleDifferential),
            other => Err(EmgErrorBuilder::new("derivation", "parse").configuration(
                "derivation",
                other,
                &format!("derivation can be one of {}", Derivation::NAMES.join(", ")),
            )),
        }
    }
}

impl TryFrom<String> for Derivation {
    type Error = EmgError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Derivation> for String {
    fn from(derivation: Derivation) -> Self {
        derivation.as_str().to_string()
    }
}

/// Single differential: `row[r-1] - row[r]` for every row after the first
///
/// Each column loses its first row. Empty (all-NaN) channels propagate NaN
/// into every derived channel that touches them.
pub fn single_differential(signal: &GridSignal) -> EmgResult<GridSignal> {
    let columns = signal
        .columns()
        .iter()
        .map(|column| {
            let rows = column.n_rows();
            let mut out = Array2::<f64>::zeros((signal.n_samples(), rows.saturating_sub(1)));
            for r in 1..rows {
                let derived = &column.channel(r - 1) - &column.channel(r);
                out.column_mut(r - 1).assign(&derived);
            }
            GridColumn::new(column.key.clone(), out)
        })
        .collect();

    debug!(columns = signal.n_columns(), "computed single differential");
    GridSignal::with_first_row(columns, signal.first_row() + grid::ROWS_PER_DIFFERENTIAL)
}

/// Double differential: `-row[r-2] + 2 row[r-1] - row[r]`
///
/// Each column loses its first two rows.
pub fn double_differential(signal: &GridSignal) -> EmgResult<GridSignal> {
    let columns = signal
        .columns()
        .iter()
        .map(|column| {
            let rows = column.n_rows();
            let mut out = Array2::<f64>::zeros((signal.n_samples(), rows.saturating_sub(2)));
            for r in 2..rows {
                let derived = column.channel(r - 1).mapv(|v| 2.0 * v)
                    - &column.channel(r - 2)
                    - &column.channel(r);
                out.column_mut(r - 2).assign(&derived);
            }
            GridColumn::new(column.key.clone(), out)
        })
        .collect();

    debug!(columns = signal.n_columns(), "computed double differential");
    GridSignal::with_first_row(columns, signal.first_row() + 2 * grid::ROWS_PER_DIFFERENTIAL)
}

/// Number of channels in a grid after derivation
pub fn derived_channel_count(signal: &GridSignal, derivation: Derivation) -> usize {
    signal
        .columns()
        .iter()
        .map(|c| c.data.len_of(Axis(1)).saturating_sub(derivation.rows_removed()))
        .sum()
}
