//! Decomposed HD-EMG recording

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::{EmgErrorBuilder, EmgResult};
use crate::firings::FiringTrain;
use crate::grid::GridSignal;
use crate::utils::validation::validate_sampling_rate;

/// Grid signal plus the firing trains of its decomposed MUs
///
/// Recordings are inputs; every editing operation returns a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct EmgRecording {
    grid: GridSignal,
    firings: Vec<FiringTrain>,
    fsamp: f64,
    /// Decomposition accuracy per MU (e.g. SIL), if known
    accuracy: Option<Vec<f64>>,
    /// Inter-electrode distance of the grid, mm
    ied_mm: Option<f64>,
}

impl EmgRecording {
    pub fn new(grid: GridSignal, firings: Vec<FiringTrain>, fsamp: f64) -> EmgResult<Self> {
        validate_sampling_rate(fsamp)?;
        Ok(Self {
            grid,
            firings,
            fsamp,
            accuracy: None,
            ied_mm: None,
        })
    }

    /// Attach a per-MU accuracy score
    pub fn with_accuracy(mut self, accuracy: Vec<f64>) -> EmgResult<Self> {
        if accuracy.len() != self.firings.len() {
            return Err(EmgErrorBuilder::new("recording", "with_accuracy").mismatch(
                "accuracy",
                "one value per MU is required",
                self.firings.len(),
                accuracy.len(),
            ));
        }
        self.accuracy = Some(accuracy);
        Ok(self)
    }

    pub fn with_ied(mut self, ied_mm: f64) -> Self {
        self.ied_mm = Some(ied_mm);
        self
    }

    pub fn grid(&self) -> &GridSignal {
        &self.grid
    }

    pub fn firings(&self) -> &[FiringTrain] {
        &self.firings
    }

    pub fn fsamp(&self) -> f64 {
        self.fsamp
    }

    pub fn accuracy(&self) -> Option<&[f64]> {
        self.accuracy.as_deref()
    }

    pub fn ied_mm(&self) -> Option<f64> {
        self.ied_mm
    }

    pub fn num_mus(&self) -> usize {
        self.firings.len()
    }

    /// Copy of the recording without the listed MUs
    ///
    /// Remaining MUs keep their relative order and are renumbered from 0.
    /// Indices out of range are an error.
    pub fn without_mus(&self, mus: &[usize]) -> EmgResult<Self> {
        let remove: BTreeSet<usize> = mus.iter().copied().collect();
        if let Some(&bad) = remove.iter().find(|&&mu| mu >= self.num_mus()) {
            return Err(EmgErrorBuilder::new("recording", "without_mus").mismatch(
                "MU index",
                "index out of range",
                format!("< {}", self.num_mus()),
                bad,
            ));
        }

        let keep = |mu: &usize| !remove.contains(mu);
        let firings = self
            .firings
            .iter()
            .enumerate()
            .filter(|(mu, _)| keep(mu))
            .map(|(_, train)| train.clone())
            .collect();
        let accuracy = self.accuracy.as_ref().map(|values| {
            values
                .iter()
                .enumerate()
                .filter(|(mu, _)| keep(mu))
                .map(|(_, &value)| value)
                .collect()
        });

        debug!(removed = remove.len(), remaining = self.num_mus() - remove.len(), "deleted MUs");
        Ok(Self {
            grid: self.grid.clone(),
            firings,
            fsamp: self.fsamp,
            accuracy,
            ied_mm: self.ied_mm,
        })
    }

    /// Indices of MUs with no firing at all
    pub fn empty_mus(&self) -> Vec<usize> {
        self.firings
            .iter()
            .enumerate()
            .filter(|(_, train)| train.is_empty())
            .map(|(mu, _)| mu)
            .collect()
    }

    /// Copy of the recording without MUs that never fire
    pub fn without_empty_mus(&self) -> EmgResult<Self> {
        self.without_mus(&self.empty_mus())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn recording() -> EmgRecording {
        let grid = GridSignal::from_arrays(vec![Array2::zeros((100, 2))]).unwrap();
        let firings = vec![
            FiringTrain::new(vec![10, 50]).unwrap(),
            FiringTrain::empty(),
            FiringTrain::new(vec![20]).unwrap(),
        ];
        EmgRecording::new(grid, firings, 2048.0)
            .unwrap()
            .with_accuracy(vec![0.9, 0.5, 0.8])
            .unwrap()
    }

    #[test]
    fn test_without_mus_renumbers() {
        let original = recording();
        let reduced = original.without_mus(&[0]).unwrap();
        assert_eq!(reduced.num_mus(), 2);
        assert_eq!(reduced.firings()[1].as_slice(), &[20]);
        assert_eq!(reduced.accuracy(), Some(&[0.5, 0.8][..]));
        // Original untouched
        assert_eq!(original.num_mus(), 3);
    }

    #[test]
    fn test_without_empty_mus() {
        let reduced = recording().without_empty_mus().unwrap();
        assert_eq!(reduced.num_mus(), 2);
        assert!(reduced.empty_mus().is_empty());
    }

    #[test]
    fn test_out_of_range_mu_rejected() {
        assert!(recording().without_mus(&[7]).is_err());
    }

    #[test]
    fn test_invalid_sampling_rate() {
        let grid = GridSignal::from_arrays(vec![Array2::zeros((10, 1))]).unwrap();
        assert!(EmgRecording::new(grid, Vec::new(), 0.0).is_err());
    }
}
