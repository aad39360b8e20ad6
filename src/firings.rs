//! Motor unit firing trains
//!
//! A firing train is the strictly increasing list of sample indices at which
//! one motor unit discharged. Trains may be empty.

use std::fmt;
use std::ops::Range;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{EmgError, EmgErrorBuilder, EmgResult};

/// Strictly increasing firing instants of one MU, in samples
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct FiringTrain(Vec<usize>);

impl FiringTrain {
    /// Build a train, rejecting unsorted or repeated instants
    pub fn new(samples: Vec<usize>) -> EmgResult<Self> {
        if let Some(pos) = samples.windows(2).position(|w| w[0] >= w[1]) {
            return Err(EmgErrorBuilder::new("firings", "new").mismatch(
                "firing train",
                &format!("firings must be strictly increasing (index {})", pos + 1),
                format!("> {}", samples[pos]),
                samples[pos + 1],
            ));
        }
        Ok(Self(samples))
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Firings selected by `range`, clipped to the train length
    pub fn select(&self, range: &FiringRange) -> &[usize] {
        let span = range.resolve(self.len());
        &self.0[span]
    }
}

impl TryFrom<Vec<usize>> for FiringTrain {
    type Error = EmgError;

    fn try_from(samples: Vec<usize>) -> Result<Self, Self::Error> {
        Self::new(samples)
    }
}

impl From<FiringTrain> for Vec<usize> {
    fn from(train: FiringTrain) -> Self {
        train.0
    }
}

/// Which firings of each MU feed template extraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FiringRangeRepr", into = "FiringRangeRepr")]
pub enum FiringRange {
    /// Every firing of the MU
    #[default]
    All,
    /// Firings with index in `[start, end)`
    Span { start: usize, end: usize },
}

impl FiringRange {
    pub fn span(start: usize, end: usize) -> Self {
        FiringRange::Span { start, end }
    }

    /// Index range into a train of `len` firings
    pub fn resolve(&self, len: usize) -> Range<usize> {
        match *self {
            FiringRange::All => 0..len,
            FiringRange::Span { start, end } => {
                let end = end.min(len);
                start.min(end)..end
            }
        }
    }
}

impl fmt::Display for FiringRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FiringRange::All => write!(f, "all"),
            FiringRange::Span { start, end } => write!(f, "[{}, {})", start, end),
        }
    }
}

/// Serialized form: the keyword `"all"` or a `[start, end]` pair
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum FiringRangeRepr {
    Keyword(String),
    Span([usize; 2]),
}

impl TryFrom<FiringRangeRepr> for FiringRange {
    type Error = EmgError;

    fn try_from(repr: FiringRangeRepr) -> Result<Self, Self::Error> {
        match repr {
            FiringRangeRepr::Keyword(word) if word == "all" => Ok(FiringRange::All),
            FiringRangeRepr::Keyword(word) => Err(EmgErrorBuilder::new("firings", "parse_range")
                .configuration("firings", word, "expected \"all\" or [start, end]")),
            FiringRangeRepr::Span([start, end]) if start <= end => Ok(FiringRange::Span { start, end }),
            FiringRangeRepr::Span([start, end]) => Err(EmgErrorBuilder::new("firings", "parse_range")
                .configuration("firings", format!("[{}, {}]", start, end), "start must not exceed end")),
        }
    }
}

impl From<FiringRange> for FiringRangeRepr {
    fn from(range: FiringRange) -> Self {
        match range {
            FiringRange::All => FiringRangeRepr::Keyword("all".to_string()),
            FiringRange::Span { start, end } => FiringRangeRepr::Span([start, end]),
        }
    }
}

/// Binary `[sample, mu]` matrix with 1 at every firing instant
///
/// Firings beyond `length` are ignored.
pub fn create_binary_firings(length: usize, trains: &[FiringTrain]) -> Array2<u8> {
    let mut binary = Array2::<u8>::zeros((length, trains.len()));
    for (mu, train) in trains.iter().enumerate() {
        for &sample in train.as_slice().iter().take_while(|&&s| s < length) {
            binary[[sample, mu]] = 1;
        }
    }
    binary
}

/// Firing trains recovered from a binary `[sample, mu]` matrix
pub fn firings_from_binary(binary: &Array2<u8>) -> Vec<FiringTrain> {
    binary
        .columns()
        .into_iter()
        .map(|column| {
            // Indices of a column scan are increasing by construction
            FiringTrain(
                column
                    .iter()
                    .enumerate()
                    .filter(|&(_, &value)| value > 0)
                    .map(|(sample, _)| sample)
                    .collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_train_rejects_unsorted() {
        assert!(FiringTrain::new(vec![10, 20, 30]).is_ok());
        assert!(FiringTrain::new(vec![10, 30, 20]).is_err());
        assert!(FiringTrain::new(vec![10, 10]).is_err());
        assert!(FiringTrain::new(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn test_range_resolution_clips() {
        let train = FiringTrain::new(vec![5, 15, 25, 35]).unwrap();
        assert_eq!(train.select(&FiringRange::All), &[5, 15, 25, 35]);
        assert_eq!(train.select(&FiringRange::span(1, 3)), &[15, 25]);
        assert_eq!(train.select(&FiringRange::span(2, 50)), &[25, 35]);
        assert!(train.select(&FiringRange::span(10, 50)).is_empty());
    }

    #[test]
    fn test_range_serde_forms() {
        let all: FiringRange = serde_json::from_str("\"all\"").unwrap();
        assert_eq!(all, FiringRange::All);
        let span: FiringRange = serde_json::from_str("[0, 50]").unwrap();
        assert_eq!(span, FiringRange::span(0, 50));
        assert!(serde_json::from_str::<FiringRange>("\"some\"").is_err());
        assert!(serde_json::from_str::<FiringRange>("[5, 1]").is_err());
        assert_eq!(serde_json::to_string(&FiringRange::span(0, 50)).unwrap(), "[0,50]");
    }

    #[test]
    fn test_binary_conversion() {
        let trains = vec![
            FiringTrain::new(vec![1, 4]).unwrap(),
            FiringTrain::empty(),
            FiringTrain::new(vec![0, 9]).unwrap(),
        ];
        let binary = create_binary_firings(6, &trains);
        assert_eq!(binary.dim(), (6, 3));
        assert_eq!(binary[[4, 0]], 1);
        assert_eq!(binary.column(1).sum(), 0);

        let recovered = firings_from_binary(&binary);
        assert_eq!(recovered[0], trains[0]);
        assert!(recovered[1].is_empty());
        // Firing at 9 lies outside the 6-sample matrix
        assert_eq!(recovered[2].as_slice(), &[0]);
    }
}
