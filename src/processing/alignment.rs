//! Common-lag alignment of two MUAP templates
//!
//! The whole grid is shifted by one lag; channels are never aligned one by
//! one.

use ndarray::{s, Array2};
use tracing::trace;

use crate::error::{EmgErrorBuilder, EmgResult};
use crate::processing::template::{FlatTemplate, Template};
use crate::processing::xcorr::{norm_xcorr_2d, same_mode_lags, CorrelationMode};
use crate::utils::conversion::fraction_of_length;
use crate::utils::validation::validate_final_duration;

/// Two templates trimmed to a shared window
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPair {
    pub first: Template,
    pub second: Template,
    /// Lag applied, in samples; negative when the first template leads
    pub lag: isize,
}

/// First arg-max row of every column
fn peak_rows(correlation: &Array2<f64>) -> Vec<usize> {
    correlation
        .columns()
        .into_iter()
        .map(|column| {
            column
                .iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
                .0
        })
        .collect()
}

/// Median lag, rounded half away from zero
fn median_lag(mut lags: Vec<isize>) -> isize {
    lags.sort_unstable();
    let n = lags.len();
    let median = if n % 2 == 1 {
        lags[n / 2] as f64
    } else {
        (lags[n / 2 - 1] + lags[n / 2]) as f64 / 2.0
    };
    median.round() as isize
}

/// Align two same-geometry templates and trim both to
/// `round(length * final_duration)` samples
///
/// The lag is the median over channels of the per-channel best lag of the
/// 2D normalized correlation, clamped so that
/// `|lag| <= min(final / 2, length - final)`. Placeholder channels are left
/// out of the correlation but keep their position in the output.
pub fn align_by_xcorr(first: &Template, second: &Template, final_duration: f64) -> EmgResult<AlignedPair> {
    validate_final_duration(final_duration)?;

    if !first.same_geometry(second) || first.n_samples() != second.n_samples() {
        return Err(EmgErrorBuilder::new("alignment", "align_by_xcorr").mismatch(
            "template pair",
            "templates must share columns, rows and window length",
            format!("{} channels x {} samples", first.n_channels(), first.n_samples()),
            format!("{} channels x {} samples", second.n_channels(), second.n_samples()),
        ));
    }

    let length = first.n_samples();
    let final_samples = fraction_of_length(length, final_duration);
    if final_samples == 0 {
        return Err(EmgErrorBuilder::new("alignment", "align_by_xcorr").configuration(
            "final_duration",
            final_duration,
            &format!("keeps no sample of a {}-sample template", length),
        ));
    }

    let flat_first = first.flatten();
    let flat_second = second.flatten();
    let correlation = norm_xcorr_2d(
        flat_first.valid_channels().view(),
        flat_second.valid_channels().view(),
        CorrelationMode::Same,
    )?;

    let lags = same_mode_lags(length, length);
    let raw_lag = median_lag(peak_rows(&correlation).into_iter().map(|row| lags[row]).collect());
    let max_lag = (final_samples / 2).min(length - final_samples) as isize;
    let lag = raw_lag.clamp(-max_lag, max_lag);

    trace!(raw_lag, lag, final_samples, "alignment lag");

    let shift = lag.unsigned_abs();
    let kept = length - shift;
    let (start_first, start_second) = if lag > 0 { (shift, 0) } else { (0, shift) };
    let trim = (kept - final_samples) / 2;

    let cut = |flat: &FlatTemplate, start: usize| -> EmgResult<Template> {
        let from = start + trim;
        let data = flat.data.slice(s![from..from + final_samples, ..]).to_owned();
        Ok(flat.with_data(data)?.repack())
    };

    Ok(AlignedPair {
        first: cut(&flat_first, start_first)?,
        second: cut(&flat_second, start_second)?,
        lag,
    })
}
