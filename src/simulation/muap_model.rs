//! Propagating action potential of one synthetic MU
//! Location: src/simulation/muap_model.rs

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::config::{MuapConfig, SimulationConfig};
use crate::utils::conversion::velocity_to_delay;

/// e^(1/2): scales the Gaussian derivative to a unit peak
const PEAK_SCALE: f64 = 1.648_721_270_700_128;

/// Biphasic wave travelling down the rows of the grid
///
/// The wave is the first derivative of a Gaussian. It crosses one
/// inter-electrode distance every `row_delay` samples, and its amplitude
/// falls off across columns around `centre_column`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MuapModel {
    pub amplitude: f64,
    /// Gaussian width, samples
    pub sigma: f64,
    /// Propagation speed, m/s
    pub conduction_velocity: f64,
    /// Delay between adjacent rows, samples
    pub row_delay: f64,
    pub centre_column: f64,
    pub column_spread: f64,
}

impl MuapModel {
    /// Draw a MU with parameters inside the configured ranges
    pub fn random<R: Rng + ?Sized>(rng: &mut R, config: &SimulationConfig) -> Self {
        let MuapConfig {
            amplitude_range,
            width_range_ms,
            cv_range,
            column_spread,
        } = &config.muap;

        let conduction_velocity = uniform(rng, *cv_range);
        let width_ms = uniform(rng, *width_range_ms);
        Self {
            amplitude: uniform(rng, *amplitude_range),
            sigma: width_ms * config.fsamp / 1000.0 / 4.0,
            conduction_velocity,
            row_delay: velocity_to_delay(conduction_velocity, config.ied_mm, config.fsamp),
            centre_column: rng.gen_range(0.0..config.n_columns as f64),
            column_spread: *column_spread,
        }
    }

    fn column_gain(&self, column: usize) -> f64 {
        let d = (column as f64 - self.centre_column) / self.column_spread;
        (-0.5 * d * d).exp()
    }

    /// Value at `t` samples after the discharge, on the given electrode
    pub fn value(&self, column: usize, row: usize, t: f64) -> f64 {
        let x = (t - row as f64 * self.row_delay) / self.sigma;
        -self.amplitude * self.column_gain(column) * x * (-0.5 * x * x).exp() * PEAK_SCALE
    }

    /// Samples before and after the discharge over which the wave is non-negligible
    pub fn support(&self, n_rows: usize) -> (usize, usize) {
        let tail = (5.0 * self.sigma).ceil() as usize;
        let travel = (self.row_delay * n_rows.saturating_sub(1) as f64).ceil() as usize;
        (tail, tail + travel)
    }
}

fn uniform<R: Rng + ?Sized>(rng: &mut R, (low, high): (f64, f64)) -> f64 {
    if high > low {
        rng.gen_range(low..high)
    } else {
        low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn model() -> MuapModel {
        MuapModel {
            amplitude: 1.0,
            sigma: 2.0,
            conduction_velocity: 4.0,
            row_delay: 4.0,
            centre_column: 1.0,
            column_spread: 1.0,
        }
    }

    #[test]
    fn test_peak_amplitude() {
        let m = model();
        // Extremes of the wave lie at one sigma from the centre
        assert!((m.value(1, 0, -2.0) - 1.0).abs() < 1e-9);
        assert!((m.value(1, 0, 2.0) + 1.0).abs() < 1e-9);
        assert_eq!(m.value(1, 0, 0.0), 0.0);
    }

    #[test]
    fn test_wave_propagates_by_row_delay() {
        let m = model();
        for t in [-3.0, -1.0, 0.5, 2.0] {
            assert!((m.value(1, 0, t) - m.value(1, 2, t + 8.0)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_random_within_ranges() {
        let config = SimulationConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let m = MuapModel::random(&mut rng, &config);
            assert!(m.conduction_velocity >= 3.0 && m.conduction_velocity < 5.0);
            assert!(m.centre_column < config.n_columns as f64);
            let expected = config.ied_mm * config.fsamp / (1000.0 * m.conduction_velocity);
            assert!((m.row_delay - expected).abs() < 1e-9);
        }
    }
}
