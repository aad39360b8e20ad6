//! Non-fatal data-quality diagnostics
//!
//! Warnings are collected in a [`Diagnostics`] value returned next to the
//! primary result. Each push is also logged through `tracing`.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Which recording of a tracking call a warning refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordingSide {
    First,
    Second,
}

impl fmt::Display for RecordingSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordingSide::First => write!(f, "file1"),
            RecordingSide::Second => write!(f, "file2"),
        }
    }
}

/// Data-quality issue that does not stop the computation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataQualityWarning {
    /// The MU has no firings at all
    EmptyMotorUnit { mu: usize },
    /// The requested firing range selects no firing
    NoFiringsInRange { mu: usize, start: usize, end: usize },
    /// Some windows crossed the recording edge and were dropped
    IncompleteWindows { mu: usize, discarded: usize },
    /// Every window crossed the recording edge
    NoCompleteWindows { mu: usize },
    /// The MU template is an inert zero-fill and was left out of tracking
    SkippedTemplate { recording: RecordingSide, mu: usize },
}

impl DataQualityWarning {
    /// MU index the warning is about
    pub fn mu(&self) -> usize {
        match *self {
            DataQualityWarning::EmptyMotorUnit { mu }
            | DataQualityWarning::NoFiringsInRange { mu, .. }
            | DataQualityWarning::IncompleteWindows { mu, .. }
            | DataQualityWarning::NoCompleteWindows { mu }
            | DataQualityWarning::SkippedTemplate { mu, .. } => mu,
        }
    }
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataQualityWarning::EmptyMotorUnit { mu } => write!(f, "MU {} is empty", mu),
            DataQualityWarning::NoFiringsInRange { mu, start, end } => {
                write!(f, "MU {} has no firings in range [{}, {})", mu, start, end)
            }
            DataQualityWarning::IncompleteWindows { mu, discarded } => write!(
                f,
                "MU {}: {} firings too close to the recording edge were discarded",
                mu, discarded
            ),
            DataQualityWarning::NoCompleteWindows { mu } => {
                write!(f, "MU {}: no firing has a complete window", mu)
            }
            DataQualityWarning::SkippedTemplate { recording, mu } => {
                write!(f, "MU {} of {} has an empty template and was skipped", mu, recording)
            }
        }
    }
}

/// Ordered list of warnings raised by one call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    warnings: Vec<DataQualityWarning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: DataQualityWarning) {
        warn!(mu = warning.mu(), "{}", warning);
        self.warnings.push(warning);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
    }

    pub fn warnings(&self) -> &[DataQualityWarning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }
}

impl IntoIterator for Diagnostics {
    type Item = DataQualityWarning;
    type IntoIter = std::vec::IntoIter<DataQualityWarning>;

    fn into_iter(self) -> Self::IntoIter {
        self.warnings.into_iter()
    }
}
