// src/config/tracking_config.rs
//! Tracking and conduction-velocity parameters

use serde::{Deserialize, Serialize};

use crate::config::constants::tracking;
use crate::firings::FiringRange;
use crate::grid::Derivation;
use crate::utils::validation::{
    validate_cv_bounds, validate_final_duration, validate_positive, validate_range,
    validate_threshold, ValidationResult,
};

/// Options recognized by the tracking entry point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Firings that feed template extraction
    #[serde(default)]
    pub firings: FiringRange,

    /// Spatial filter applied before extraction
    #[serde(default)]
    pub derivation: Derivation,

    /// Duration of the compared templates in ms
    #[serde(default = "defaults::timewindow_ms")]
    pub timewindow_ms: f64,

    #[serde(default = "defaults::threshold")]
    pub threshold: f64,

    /// Fraction of the extracted window kept after alignment
    #[serde(default = "defaults::final_duration")]
    pub final_duration: f64,

    #[serde(default = "defaults::enabled")]
    pub exclude_below_threshold: bool,

    /// Resolve candidates to at most one match per MU on each side
    #[serde(default = "defaults::enabled")]
    pub filter: bool,

    /// Run the comparison phase on a worker pool
    #[serde(default = "defaults::enabled")]
    pub multiprocessing: bool,

    /// Upper bound on pool threads, all cores when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_threads: Option<usize>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            firings: FiringRange::All,
            derivation: Derivation::default(),
            timewindow_ms: defaults::timewindow_ms(),
            threshold: defaults::threshold(),
            final_duration: defaults::final_duration(),
            exclude_below_threshold: true,
            filter: true,
            multiprocessing: true,
            num_threads: None,
        }
    }
}

impl TrackingConfig {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_positive(self.timewindow_ms, "timewindow_ms")?;
        validate_threshold(self.threshold)?;
        validate_final_duration(self.final_duration)?;
        if let Some(threads) = self.num_threads {
            validate_range(threads, 1, usize::MAX, "num_threads")?;
        }
        Ok(())
    }

    /// Window used for STA extraction during tracking
    ///
    /// Templates are extracted twice as long as `timewindow_ms` so that the
    /// aligned, trimmed templates still span the requested duration.
    pub fn extraction_window_ms(&self) -> f64 {
        self.timewindow_ms * tracking::EXTRACTION_WINDOW_FACTOR
    }
}

/// Search bounds and solver settings of the MLE velocity estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvConfig {
    /// Lowest velocity searched and reported, m/s
    #[serde(default = "defaults::min_cv")]
    pub min_cv: f64,

    /// Highest velocity searched and reported, m/s
    #[serde(default = "defaults::max_cv")]
    pub max_cv: f64,

    /// Grid step of the coarse delay search, samples
    #[serde(default = "defaults::coarse_step")]
    pub coarse_step: f64,

    #[serde(default = "defaults::max_iterations")]
    pub max_iterations: usize,

    /// Newton iterations stop once the update falls below this, samples
    #[serde(default = "defaults::tolerance")]
    pub tolerance: f64,
}

impl Default for CvConfig {
    fn default() -> Self {
        Self {
            min_cv: defaults::min_cv(),
            max_cv: defaults::max_cv(),
            coarse_step: defaults::coarse_step(),
            max_iterations: defaults::max_iterations(),
            tolerance: defaults::tolerance(),
        }
    }
}

impl CvConfig {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_cv_bounds(self.min_cv, self.max_cv)?;
        validate_positive(self.coarse_step, "coarse_step")?;
        validate_positive(self.tolerance, "tolerance")?;
        validate_range(self.max_iterations, 1, usize::MAX, "max_iterations")?;
        Ok(())
    }
}

/// Default value providers using constants
mod defaults {
    use crate::config::constants::{cv, tracking};

    pub fn timewindow_ms() -> f64 { tracking::DEFAULT_TIMEWINDOW_MS }
    pub fn threshold() -> f64 { tracking::DEFAULT_THRESHOLD }
    pub fn final_duration() -> f64 { tracking::DEFAULT_FINAL_DURATION }
    pub fn enabled() -> bool { true }

    pub fn min_cv() -> f64 { cv::DEFAULT_MIN_CV }
    pub fn max_cv() -> f64 { cv::DEFAULT_MAX_CV }
    pub fn coarse_step() -> f64 { cv::DEFAULT_COARSE_STEP_SAMPLES }
    pub fn max_iterations() -> usize { cv::DEFAULT_MAX_ITERATIONS }
    pub fn tolerance() -> f64 { cv::DEFAULT_TOLERANCE_SAMPLES }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = TrackingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.derivation, Derivation::SingleDifferential);
        assert_eq!(config.extraction_window_ms(), 100.0);
        assert!(CvConfig::default().validate().is_ok());
    }

    #[test]
    fn test_threshold_out_of_range() {
        let config = TrackingConfig { threshold: 1.5, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_threads_rejected() {
        let config = TrackingConfig { num_threads: Some(0), ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: TrackingConfig = toml::from_str(
            r#"
derivation = "dd"
firings = [0, 20]
threshold = 0.9
"#,
        )
        .unwrap();
        assert_eq!(config.derivation, Derivation::DoubleDifferential);
        assert_eq!(config.firings, FiringRange::span(0, 20));
        assert_eq!(config.threshold, 0.9);
        assert_eq!(config.timewindow_ms, 50.0);
        assert!(config.filter);
    }

    #[test]
    fn test_unknown_derivation_fails_to_parse() {
        let parsed = toml::from_str::<TrackingConfig>("derivation = \"xd\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_inverted_cv_bounds_rejected() {
        let config = CvConfig { min_cv: 8.0, max_cv: 2.0, ..Default::default() };
        assert!(config.validate().is_err());
    }
}
