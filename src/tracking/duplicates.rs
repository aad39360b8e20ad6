//! Removal of MUs found in both of two recordings

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::constants::tracking;
use crate::config::TrackingConfig;
use crate::error::{EmgErrorBuilder, EmgResult};
use crate::recording::EmgRecording;
use crate::tracking::engine::{track, TemplateSource};
use crate::tracking::result::TrackingResult;

/// Which copy of a duplicated MU is dropped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateCriterion {
    /// All duplicates leave the recording with more MUs (the first on ties)
    #[default]
    ByMuNumber,
    /// Per pair, the MU with the lower accuracy leaves (the first on ties)
    ByAccuracy,
}

/// Both recordings without duplicates, and the tracking that found them
#[derive(Debug, Clone)]
pub struct DuplicateRemoval {
    pub first: EmgRecording,
    pub second: EmgRecording,
    pub tracking: TrackingResult,
}

/// Tracking options for duplicate detection: stricter threshold
pub fn duplicate_config() -> TrackingConfig {
    TrackingConfig {
        threshold: tracking::DEFAULT_DUPLICATE_THRESHOLD,
        ..TrackingConfig::default()
    }
}

/// Track, then remove every included pair from one side
///
/// Pairs below threshold are always excluded. The inputs are left intact;
/// edited copies are returned.
pub fn remove_duplicates_between(
    first: &EmgRecording,
    second: &EmgRecording,
    config: &TrackingConfig,
    criterion: DuplicateCriterion,
) -> EmgResult<DuplicateRemoval> {
    let config = TrackingConfig {
        exclude_below_threshold: true,
        ..config.clone()
    };
    let result = track(TemplateSource::Computed { first, second }, &config)?;
    remove_duplicates_from_result(first, second, result, criterion)
}

/// Remove duplicates listed in a (possibly reviewed) tracking result
///
/// Only rows still marked as included are used.
pub fn remove_duplicates_from_result(
    first: &EmgRecording,
    second: &EmgRecording,
    result: TrackingResult,
    criterion: DuplicateCriterion,
) -> EmgResult<DuplicateRemoval> {
    let mut remove_first = BTreeSet::new();
    let mut remove_second = BTreeSet::new();

    match criterion {
        DuplicateCriterion::ByMuNumber => {
            if first.num_mus() >= second.num_mus() {
                remove_first.extend(result.included().map(|m| m.mu_first));
            } else {
                remove_second.extend(result.included().map(|m| m.mu_second));
            }
        }
        DuplicateCriterion::ByAccuracy => {
            let (Some(acc_first), Some(acc_second)) = (first.accuracy(), second.accuracy()) else {
                return Err(EmgErrorBuilder::new("duplicates", "remove_duplicates_from_result")
                    .configuration("which", "accuracy", "both recordings need per-MU accuracy"));
            };
            for pair in result.included() {
                let (a, b) = match (acc_first.get(pair.mu_first), acc_second.get(pair.mu_second)) {
                    (Some(&a), Some(&b)) => (a, b),
                    _ => {
                        return Err(EmgErrorBuilder::new("duplicates", "remove_duplicates_from_result")
                            .invalid_data("tracking row", "MU index outside the recording"))
                    }
                };
                if a <= b {
                    remove_first.insert(pair.mu_first);
                } else {
                    remove_second.insert(pair.mu_second);
                }
            }
        }
    }

    let remove_first: Vec<usize> = remove_first.into_iter().collect();
    let remove_second: Vec<usize> = remove_second.into_iter().collect();
    info!(
        from_first = remove_first.len(),
        from_second = remove_second.len(),
        "removing duplicated MUs"
    );

    Ok(DuplicateRemoval {
        first: first.without_mus(&remove_first)?,
        second: second.without_mus(&remove_second)?,
        tracking: result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::firings::FiringTrain;
    use crate::grid::GridSignal;
    use crate::tracking::result::{Inclusion, TrackingMatch};
    use ndarray::Array2;

    fn recording(mus: usize, accuracy: Vec<f64>) -> EmgRecording {
        let grid = GridSignal::from_arrays(vec![Array2::zeros((200, 2))]).unwrap();
        let firings = (0..mus).map(|mu| FiringTrain::new(vec![50 + mu]).unwrap()).collect();
        EmgRecording::new(grid, firings, 1000.0)
            .unwrap()
            .with_accuracy(accuracy)
            .unwrap()
    }

    fn result() -> TrackingResult {
        let rows = vec![
            TrackingMatch { mu_first: 0, mu_second: 1, xcc: 0.95, inclusion: Inclusion::Included },
            TrackingMatch { mu_first: 2, mu_second: 0, xcc: 0.93, inclusion: Inclusion::Included },
            TrackingMatch { mu_first: 1, mu_second: 2, xcc: 0.91, inclusion: Inclusion::Excluded },
        ];
        TrackingResult::new(rows, Diagnostics::new())
    }

    #[test]
    fn test_by_mu_number_removes_from_larger() {
        let first = recording(3, vec![0.9, 0.9, 0.9]);
        let second = recording(4, vec![0.9; 4]);
        let out = remove_duplicates_from_result(&first, &second, result(), DuplicateCriterion::ByMuNumber).unwrap();
        assert_eq!(out.first.num_mus(), 3);
        assert_eq!(out.second.num_mus(), 2);
        assert_eq!(second.num_mus(), 4);
    }

    #[test]
    fn test_by_accuracy_per_pair() {
        let first = recording(3, vec![0.80, 0.99, 0.95]);
        let second = recording(3, vec![0.90, 0.85, 0.70]);
        let out = remove_duplicates_from_result(&first, &second, result(), DuplicateCriterion::ByAccuracy).unwrap();
        // (0, 1): 0.80 <= 0.85 drops first MU 0; (2, 0): 0.95 > 0.90 drops second MU 0
        assert_eq!(out.first.num_mus(), 2);
        assert_eq!(out.second.num_mus(), 2);
        assert_eq!(out.first.accuracy(), Some(&[0.99, 0.95][..]));
    }

    #[test]
    fn test_by_accuracy_requires_accuracy() {
        let grid = GridSignal::from_arrays(vec![Array2::zeros((200, 2))]).unwrap();
        let bare = EmgRecording::new(grid, vec![FiringTrain::empty(); 3], 1000.0).unwrap();
        let other = recording(3, vec![0.9; 3]);
        let err = remove_duplicates_from_result(&bare, &other, result(), DuplicateCriterion::ByAccuracy).unwrap_err();
        assert!(err.is_configuration());
    }
}
