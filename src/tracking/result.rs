//! Tracking output table

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::error::{EmgErrorBuilder, EmgResult};

/// Review flag of a tracking row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Inclusion {
    #[default]
    Included,
    Excluded,
}

impl Inclusion {
    pub fn toggled(self) -> Self {
        match self {
            Inclusion::Included => Inclusion::Excluded,
            Inclusion::Excluded => Inclusion::Included,
        }
    }
}

impl fmt::Display for Inclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inclusion::Included => write!(f, "Included"),
            Inclusion::Excluded => write!(f, "Excluded"),
        }
    }
}

/// One matched MU pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackingMatch {
    #[serde(rename = "MU_file1")]
    pub mu_first: usize,
    #[serde(rename = "MU_file2")]
    pub mu_second: usize,
    #[serde(rename = "XCC")]
    pub xcc: f64,
    #[serde(rename = "Inclusion", default)]
    pub inclusion: Inclusion,
}

/// Rows of a tracking call plus the warnings raised on the way
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingResult {
    matches: Vec<TrackingMatch>,
    #[serde(skip)]
    diagnostics: Diagnostics,
}

impl TrackingResult {
    pub fn new(matches: Vec<TrackingMatch>, diagnostics: Diagnostics) -> Self {
        Self { matches, diagnostics }
    }

    pub fn matches(&self) -> &[TrackingMatch] {
        &self.matches
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    fn row_mut(&mut self, row: usize, operation: &str) -> EmgResult<&mut TrackingMatch> {
        let len = self.matches.len();
        self.matches.get_mut(row).ok_or_else(|| {
            EmgErrorBuilder::new("tracking_result", operation).mismatch(
                "tracking row",
                "row index out of range",
                format!("< {}", len),
                row,
            )
        })
    }

    /// Mark a row as included or excluded
    pub fn set_inclusion(&mut self, row: usize, inclusion: Inclusion) -> EmgResult<()> {
        self.row_mut(row, "set_inclusion")?.inclusion = inclusion;
        Ok(())
    }

    /// Flip the flag of a row and return the new value
    pub fn toggle_inclusion(&mut self, row: usize) -> EmgResult<Inclusion> {
        let entry = self.row_mut(row, "toggle_inclusion")?;
        entry.inclusion = entry.inclusion.toggled();
        Ok(entry.inclusion)
    }

    /// Rows still included after review
    pub fn included(&self) -> impl Iterator<Item = &TrackingMatch> + '_ {
        self.matches.iter().filter(|m| m.inclusion == Inclusion::Included)
    }

    pub fn into_parts(self) -> (Vec<TrackingMatch>, Diagnostics) {
        (self.matches, self.diagnostics)
    }
}
