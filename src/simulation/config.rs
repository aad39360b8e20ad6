//! Synthetic recording parameters

use serde::{Deserialize, Serialize};

use crate::config::constants::{cv, units};
use crate::utils::conversion::ms_to_samples;

use crate::utils::validation::{
    validate_positive, validate_range, validate_sampling_rate, ValidationResult,
};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Seed of the random generator; equal seeds give equal recordings
    pub seed: u64,
    pub fsamp: f64,
    pub duration_s: f64,
    pub n_columns: usize,
    pub n_rows: usize,
    pub n_mus: usize,
    /// Inter-electrode distance, mm
    pub ied_mm: f64,
    pub muap: MuapConfig,
    pub firing: FiringConfig,
    pub noise: NoiseConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MuapConfig {
    /// Peak amplitude range of the action potentials, mV
    pub amplitude_range: (f64, f64),
    /// Width range of the biphasic wave, ms
    pub width_range_ms: (f64, f64),
    /// Propagation speed range along the rows, m/s
    pub cv_range: (f64, f64),
    /// Spread of the amplitude across columns, in columns
    pub column_spread: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FiringConfig {
    /// Discharge rate range, Hz
    pub rate_range_hz: (f64, f64),
    /// Inter-spike interval variability as a fraction of the mean interval
    pub isi_jitter: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NoiseConfig {
    /// Standard deviation of the white background noise, mV
    pub std_mv: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            fsamp: 2048.0,
            duration_s: 5.0,
            n_columns: 3,
            n_rows: 8,
            n_mus: 4,
            ied_mm: cv::DEFAULT_INTER_ELECTRODE_DISTANCE_MM,
            muap: MuapConfig::default(),
            firing: FiringConfig::default(),
            noise: NoiseConfig::default(),
        }
    }
}

impl Default for MuapConfig {
    fn default() -> Self {
        Self {
            amplitude_range: (0.2, 1.0),
            width_range_ms: (2.0, 4.0),
            cv_range: (3.0, 5.0),
            column_spread: 1.5,
        }
    }
}

impl Default for FiringConfig {
    fn default() -> Self {
        Self {
            rate_range_hz: (8.0, 15.0),
            isi_jitter: 0.1,
        }
    }
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self { std_mv: 0.01 }
    }
}

fn validate_ordered(range: (f64, f64), field: &str) -> ValidationResult<()> {
    validate_positive(range.0, field)?;
    validate_range(range.1, range.0, f64::MAX, field)
}

impl SimulationConfig {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_sampling_rate(self.fsamp)?;
        validate_positive(self.duration_s, "duration_s")?;
        validate_positive(self.ied_mm, "ied_mm")?;
        validate_range(self.n_columns, 1, usize::MAX, "n_columns")?;
        validate_range(self.n_rows, 1, usize::MAX, "n_rows")?;

        validate_ordered(self.muap.amplitude_range, "muap.amplitude_range")?;
        validate_ordered(self.muap.width_range_ms, "muap.width_range_ms")?;
        validate_ordered(self.muap.cv_range, "muap.cv_range")?;
        validate_positive(self.muap.column_spread, "muap.column_spread")?;

        validate_ordered(self.firing.rate_range_hz, "firing.rate_range_hz")?;
        validate_range(self.firing.isi_jitter, 0.0, 0.9, "firing.isi_jitter")?;
        validate_range(self.noise.std_mv, 0.0, f64::MAX, "noise.std_mv")
    }

    pub fn n_samples(&self) -> usize {
        ms_to_samples(self.duration_s * units::MILLISECONDS_PER_SECOND, self.fsamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.n_samples(), 10240);
    }

    #[test]
    fn test_reversed_range_rejected() {
        let mut config = SimulationConfig::default();
        config.muap.cv_range = (5.0, 3.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = SimulationConfig::default();
        let text = toml::to_string(&config).unwrap();
        let parsed: SimulationConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
