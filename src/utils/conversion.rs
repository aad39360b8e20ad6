//! Conversion utilities for hdemg-core
//!
//! Time/sample conversions used by template extraction and alignment, and
//! the delay to conduction-velocity conversion used by the MLE estimator.

use crate::config::constants::units;

/// Window geometry derived from a duration in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSamples {
    /// Samples on each side of the firing instant
    pub half: usize,
    /// Total window length, always `2 * half`
    pub full: usize,
}

/// Convert a duration in ms to a whole number of samples
pub fn ms_to_samples(duration_ms: f64, fsamp: f64) -> usize {
    let samples = (duration_ms / units::MILLISECONDS_PER_SECOND) * fsamp;
    samples.round().max(0.0) as usize
}

/// Window used around each firing: `half = round(ms / 1000 * fsamp / 2)`
pub fn window_samples(window_ms: f64, fsamp: f64) -> WindowSamples {
    let half = ((window_ms / units::MILLISECONDS_PER_SECOND) * fsamp / 2.0)
        .round()
        .max(0.0) as usize;
    WindowSamples { half, full: half * 2 }
}

/// Number of samples kept after alignment: `round(length * fraction)`
pub fn fraction_of_length(length: usize, fraction: f64) -> usize {
    (length as f64 * fraction).round() as usize
}

/// Conduction velocity in m/s from an inter-channel delay in samples
///
/// The inter-electrode distance is given in mm. The sign of the delay is
/// kept, callers decide whether direction matters.
pub fn delay_to_velocity(delay_samples: f64, ied_mm: f64, fsamp: f64) -> f64 {
    let ied_m = ied_mm / units::MILLIMETERS_PER_METER;
    ied_m / (delay_samples / fsamp)
}

/// Inter-channel delay in samples for a given velocity in m/s
pub fn velocity_to_delay(velocity: f64, ied_mm: f64, fsamp: f64) -> f64 {
    let ied_m = ied_mm / units::MILLIMETERS_PER_METER;
    ied_m / velocity * fsamp
}
