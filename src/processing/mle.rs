//! Maximum-likelihood delay estimation between propagating signals
//!
//! Signals are compared in the frequency domain, where a delay of `theta`
//! samples is the phase factor `exp(-j w theta)`. With white Gaussian noise
//! the ML delay minimizes the mean square error between each channel and
//! the delayed average of the others.
//!
//! Positive delays mean the activity reaches higher channel indices later.

use ndarray::{ArrayView1, ArrayView2};
use rustfft::{num_complex::Complex64, FftPlanner};
use std::f64::consts::PI;
use tracing::{debug, trace};

use crate::config::constants::cv;
use crate::config::CvConfig;
use crate::error::{EmgErrorBuilder, EmgResult, ProcessingStage};
use crate::utils::conversion::{delay_to_velocity, velocity_to_delay};

/// Spectra of a set of channels on a shared frequency grid
struct Spectra {
    /// `[channel][bin]`
    channels: Vec<Vec<Complex64>>,
    /// Angular frequency of each used bin, rad/sample
    omega: Vec<f64>,
}

impl Spectra {
    /// Zero-pad to a power of two at least twice the signal length
    ///
    /// The Nyquist bin is dropped: a fractional delay is not defined there.
    fn new(signals: &[ArrayView1<'_, f64>]) -> Self {
        let length = signals.first().map(|s| s.len()).unwrap_or(0);
        let n_fft = (2 * length).next_power_of_two().max(2);
        let fft = FftPlanner::<f64>::new().plan_fft_forward(n_fft);

        let keep: Vec<usize> = (0..n_fft).filter(|&k| k != n_fft / 2).collect();
        let omega = keep
            .iter()
            .map(|&k| {
                let k = if k > n_fft / 2 { k as f64 - n_fft as f64 } else { k as f64 };
                2.0 * PI * k / n_fft as f64
            })
            .collect();

        let channels = signals
            .iter()
            .map(|signal| {
                let mut buffer = vec![Complex64::new(0.0, 0.0); n_fft];
                for (dst, &src) in buffer.iter_mut().zip(signal.iter()) {
                    *dst = Complex64::new(src, 0.0);
                }
                fft.process(&mut buffer);
                keep.iter().map(|&k| buffer[k]).collect()
            })
            .collect();

        Self { channels, omega }
    }
}

fn check_signals(signals: &[ArrayView1<'_, f64>], operation: &str) -> EmgResult<()> {
    if signals.len() < cv::MIN_CHANNELS {
        return Err(EmgErrorBuilder::new("mle", operation).mismatch(
            "channel set",
            "at least two channels are needed to estimate a delay",
            format!(">= {}", cv::MIN_CHANNELS),
            signals.len(),
        ));
    }
    let length = signals[0].len();
    if let Some((index, signal)) = signals.iter().enumerate().find(|(_, s)| s.len() != length) {
        return Err(EmgErrorBuilder::new("mle", operation)
            .info("channel", index.to_string())
            .mismatch("channel set", "channels must share the same sample count", length, signal.len()));
    }
    if length == 0 {
        return Err(EmgErrorBuilder::new("mle", operation).invalid_data("channel set", "channels are empty"));
    }
    if signals.iter().any(|s| s.iter().any(|v| !v.is_finite())) {
        return Err(EmgErrorBuilder::new("mle", operation)
            .invalid_data("channel set", "channels contain non-finite samples"));
    }
    Ok(())
}

/// Columns of a `[time, channel]` table as views
pub fn channel_views<'a>(signals: &'a ArrayView2<'_, f64>) -> Vec<ArrayView1<'a, f64>> {
    signals.columns().into_iter().collect()
}

/// Coarse ML delay between two channels, in samples
///
/// Delays whose velocity lies in `[min_cv, max_cv]` are scanned in both
/// directions on a grid of `coarse_step` samples.
pub fn find_mle_teta<'a>(
    first: ArrayView1<'a, f64>,
    second: ArrayView1<'a, f64>,
    ied_mm: f64,
    fsamp: f64,
    config: &CvConfig,
) -> EmgResult<f64> {
    check_signals(&[first, second], "find_mle_teta")?;
    let spectra = Spectra::new(&[first, second]);

    // Maximizing the cross-spectrum projection minimizes |X2 - X1 e^{-jwt}|^2
    let cross: Vec<Complex64> = spectra.channels[1]
        .iter()
        .zip(&spectra.channels[0])
        .map(|(x2, x1)| x2 * x1.conj())
        .collect();
    let score = |theta: f64| -> f64 {
        cross
            .iter()
            .zip(&spectra.omega)
            .map(|(c, &w)| (c * Complex64::from_polar(1.0, w * theta)).re)
            .sum()
    };

    let shortest = velocity_to_delay(config.max_cv, ied_mm, fsamp);
    let longest = velocity_to_delay(config.min_cv, ied_mm, fsamp);
    let steps = ((longest - shortest) / config.coarse_step).floor().max(0.0) as usize;

    let mut best = (shortest, f64::NEG_INFINITY);
    for i in 0..=steps {
        let magnitude = shortest + i as f64 * config.coarse_step;
        for theta in [magnitude, -magnitude] {
            let value = score(theta);
            if value > best.1 {
                best = (theta, value);
            }
        }
    }

    trace!(teta = best.0, candidates = 2 * (steps + 1), "coarse delay search");
    Ok(best.0)
}

/// Multichannel mean square error and its first two derivatives at `theta`
fn objective(spectra: &Spectra, theta: f64) -> (f64, f64, f64) {
    let k_total = spectra.channels.len();
    let weight = 1.0 / (k_total as f64 - 1.0);
    let (mut e, mut de, mut d2e) = (0.0, 0.0, 0.0);

    for (bin, &w) in spectra.omega.iter().enumerate() {
        for k in 0..k_total {
            let mut residual = spectra.channels[k][bin];
            let mut first = Complex64::new(0.0, 0.0);
            let mut second = Complex64::new(0.0, 0.0);
            for m in (0..k_total).filter(|&m| m != k) {
                let d = k as f64 - m as f64;
                let delayed = spectra.channels[m][bin] * Complex64::from_polar(1.0, -w * d * theta);
                residual -= delayed * weight;
                first += delayed * Complex64::new(0.0, w * d * weight);
                second += delayed * (w * w * d * d * weight);
            }
            e += residual.norm_sqr();
            de += 2.0 * (residual.conj() * first).re;
            d2e += 2.0 * (first.norm_sqr() + (residual.conj() * second).re);
        }
    }
    (e, de, d2e)
}

/// Joint ML delay over all channels, refined from `initial_teta`
///
/// Newton iterations with step halving on the multichannel error. The
/// delay magnitude stays inside the coarse search interval, so the
/// velocity stays inside `[min_cv, max_cv]`.
/// Returns the signed velocity (m/s) and the delay (samples).
pub fn mle_cv_estimate(
    signals: &[ArrayView1<'_, f64>],
    initial_teta: f64,
    ied_mm: f64,
    fsamp: f64,
    config: &CvConfig,
) -> EmgResult<(f64, f64)> {
    check_signals(signals, "mle_cv_estimate")?;
    config.validate()?;
    let spectra = Spectra::new(signals);

    let shortest = velocity_to_delay(config.max_cv, ied_mm, fsamp);
    let longest = velocity_to_delay(config.min_cv, ied_mm, fsamp);
    let direction = if initial_teta < 0.0 { -1.0 } else { 1.0 };
    let bound = |theta: f64| direction * (direction * theta).max(shortest).min(longest);

    let mut theta = bound(initial_teta);
    let (mut e, mut de, mut d2e) = objective(&spectra, theta);
    let mut iterations = 0;

    while iterations < config.max_iterations {
        iterations += 1;
        let mut step = if d2e > 0.0 {
            -de / d2e
        } else {
            -de.signum() * config.coarse_step
        };

        let mut accepted = None;
        for _ in 0..=cv::MAX_STEP_HALVINGS {
            let target = bound(theta + step);
            let candidate = objective(&spectra, target);
            if candidate.0 <= e {
                accepted = Some((target, candidate));
                break;
            }
            step /= 2.0;
        }

        let Some((target, next)) = accepted else {
            break;
        };
        let moved = target - theta;
        theta = target;
        (e, de, d2e) = next;
        if moved.abs() < config.tolerance {
            break;
        }
    }

    let velocity = delay_to_velocity(theta, ied_mm, fsamp);
    debug!(teta = theta, cv = velocity, iterations, error = e, "refined conduction delay");

    if !velocity.is_finite() {
        return Err(EmgErrorBuilder::new("mle", "mle_cv_estimate")
            .info("teta", theta.to_string())
            .computation(ProcessingStage::ConductionVelocity, "estimated delay gives no finite velocity"));
    }
    Ok((velocity, theta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// Gaussian pulses moving `delay` samples per channel
    fn propagating(channels: usize, delay: f64) -> Array2<f64> {
        Array2::from_shape_fn((128, channels), |(t, k)| {
            let centre = 40.0 + k as f64 * delay;
            (-((t as f64 - centre).powi(2)) / 18.0).exp()
        })
    }

    #[test]
    fn test_coarse_search_finds_delay() {
        let data = propagating(2, 2.5);
        let theta = find_mle_teta(data.column(0), data.column(1), 5.0, 2048.0, &CvConfig::default()).unwrap();
        assert!((theta - 2.5).abs() <= 0.05 + 1e-9);
    }

    #[test]
    fn test_coarse_search_negative_direction() {
        let data = propagating(2, -3.0);
        let theta = find_mle_teta(data.column(0), data.column(1), 5.0, 2048.0, &CvConfig::default()).unwrap();
        assert!((theta + 3.0).abs() <= 0.05 + 1e-9);
    }

    #[test]
    fn test_refinement_over_four_channels() {
        let data = propagating(4, 2.37);
        let view = data.view();
        let signals = channel_views(&view);
        let (velocity, theta) = mle_cv_estimate(&signals, 2.3, 5.0, 2048.0, &CvConfig::default()).unwrap();
        assert!((theta - 2.37).abs() < 1e-3);
        assert!((velocity - 5.0 * 2048.0 / (1000.0 * 2.37)).abs() < 1e-2);
    }

    #[test]
    fn test_refined_velocity_stays_below_max_cv() {
        // One sample per channel at 5 mm and 2048 Hz is 10.24 m/s
        let data = propagating(4, 1.0);
        let view = data.view();
        let signals = channel_views(&view);
        let config = CvConfig::default();
        let (velocity, theta) = mle_cv_estimate(&signals, 1.1, 5.0, 2048.0, &config).unwrap();
        assert!(velocity <= config.max_cv + 1e-9);
        assert!(theta >= velocity_to_delay(config.max_cv, 5.0, 2048.0) - 1e-12);
    }

    #[test]
    fn test_refinement_keeps_direction_inside_bounds() {
        let data = propagating(4, -1.0);
        let view = data.view();
        let signals = channel_views(&view);
        let config = CvConfig::default();
        let (velocity, _) = mle_cv_estimate(&signals, -1.1, 5.0, 2048.0, &config).unwrap();
        assert!(velocity < 0.0);
        assert!(velocity.abs() <= config.max_cv + 1e-9);
    }

    #[test]
    fn test_rejects_bad_channel_sets() {
        let data = propagating(2, 2.0);
        let config = CvConfig::default();
        assert!(mle_cv_estimate(&[data.column(0)], 2.0, 5.0, 2048.0, &config).is_err());

        let short = ndarray::Array1::<f64>::zeros(10);
        assert!(find_mle_teta(data.column(0), short.view(), 5.0, 2048.0, &config).is_err());
    }
}
