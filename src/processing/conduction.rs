//! Conduction velocity of a MU from adjacent-channel templates

use std::ops::Range;

use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::constants::cv;
use crate::config::CvConfig;
use crate::error::{EmgErrorBuilder, EmgResult};
use crate::grid::ColumnKey;
use crate::processing::mle::{channel_views, find_mle_teta, mle_cv_estimate};
use crate::processing::template::Template;
use crate::processing::xcorr::norm_xcorr;
use crate::utils::validation::{validate_min_len, validate_positive, validate_sampling_rate};

/// Conduction velocity in m/s from channels ordered along the fibres
///
/// The coarse delay comes from the two most central channels, then all
/// channels refine it jointly. Only the magnitude is returned.
pub fn estimate_conduction_velocity(
    signals: &[ArrayView1<'_, f64>],
    ied_mm: f64,
    fsamp: f64,
    config: &CvConfig,
) -> EmgResult<f64> {
    validate_min_len(signals, cv::MIN_CHANNELS, "signals")?;
    validate_positive(ied_mm, "ied_mm")?;
    validate_sampling_rate(fsamp)?;
    config.validate()?;

    let length = signals[0].len();
    if let Some(bad) = signals.iter().find(|s| s.len() != length) {
        return Err(EmgErrorBuilder::new("conduction", "estimate_conduction_velocity").mismatch(
            "channel set",
            "channels must share the same sample count",
            length,
            bad.len(),
        ));
    }

    let mid = (signals.len() - 1) / 2;
    let teta = find_mle_teta(signals[mid], signals[mid + 1], ied_mm, fsamp, config)?;
    let (velocity, teta) = mle_cv_estimate(signals, teta, ied_mm, fsamp, config)?;

    debug!(channels = signals.len(), teta, cv = velocity.abs(), "conduction velocity");
    Ok(velocity.abs())
}

/// [`estimate_conduction_velocity`] over the columns of a `[time, channel]` table
pub fn estimate_conduction_velocity_table(
    signals: ArrayView2<'_, f64>,
    ied_mm: f64,
    fsamp: f64,
    config: &CvConfig,
) -> EmgResult<f64> {
    let channels = channel_views(&signals);
    estimate_conduction_velocity(&channels, ied_mm, fsamp, config)
}

/// Propagation summary of one MU over a run of channels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CvReport {
    /// Conduction velocity, m/s
    pub cv: f64,
    /// Mean RMS of the channels
    pub rms: f64,
    /// Mean similarity of adjacent channel pairs
    pub xcc: f64,
}

fn rms(signal: ArrayView1<'_, f64>) -> f64 {
    (signal.iter().map(|v| v * v).sum::<f64>() / signal.len() as f64).sqrt()
}

/// CV, amplitude and shape consistency over `rows` of one template column
///
/// `rows` indexes the rows of the column table (zero-based), usually taken
/// from a double-differential STA.
pub fn analyze_conduction(
    template: &Template,
    column: &ColumnKey,
    rows: Range<usize>,
    ied_mm: f64,
    fsamp: f64,
    config: &CvConfig,
) -> EmgResult<CvReport> {
    let table = template.column(column).ok_or_else(|| {
        EmgErrorBuilder::new("conduction", "analyze_conduction")
            .invalid_data("template", &format!("no column '{}'", column))
    })?;

    if rows.end > table.n_rows() || rows.len() < cv::MIN_CHANNELS {
        return Err(EmgErrorBuilder::new("conduction", "analyze_conduction")
            .info("column", column.as_str())
            .mismatch(
                "channel span",
                "span must hold at least two rows of the column",
                format!("[a, b) with b <= {} and b - a >= {}", table.n_rows(), cv::MIN_CHANNELS),
                format!("[{}, {})", rows.start, rows.end),
            ));
    }
    if let Some(row) = rows.clone().find(|&r| table.is_placeholder(r)) {
        return Err(EmgErrorBuilder::new("conduction", "analyze_conduction")
            .info("row", row.to_string())
            .invalid_data("channel span", "span contains an empty channel"));
    }

    let signals: Vec<ArrayView1<'_, f64>> = rows.clone().map(|r| table.channel(r)).collect();
    let cv = estimate_conduction_velocity(&signals, ied_mm, fsamp, config)?;

    let rms = signals.iter().map(|s| rms(*s)).sum::<f64>() / signals.len() as f64;
    let pairs = signals
        .windows(2)
        .map(|pair| norm_xcorr(pair[0], pair[1]))
        .collect::<EmgResult<Vec<f64>>>()?;
    let xcc = pairs.iter().sum::<f64>() / pairs.len() as f64;

    Ok(CvReport { cv, rms, xcc })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn propagating(channels: usize, delay: f64) -> Array2<f64> {
        Array2::from_shape_fn((128, channels), |(t, k)| {
            let centre = 50.0 + k as f64 * delay;
            (-((t as f64 - centre).powi(2)) / 18.0).exp()
        })
    }

    #[test]
    fn test_velocity_from_known_delay() {
        let data = propagating(4, 2.5);
        let cv = estimate_conduction_velocity_table(data.view(), 5.0, 2048.0, &CvConfig::default()).unwrap();
        assert!((cv - 4.096).abs() < 1e-2);
    }

    #[test]
    fn test_reversed_order_stays_positive() {
        let data = propagating(3, -2.5);
        let cv = estimate_conduction_velocity_table(data.view(), 5.0, 2048.0, &CvConfig::default()).unwrap();
        assert!(cv > 0.0);
        assert!((cv - 4.096).abs() < 1e-2);
    }

    #[test]
    fn test_single_channel_is_validation_error() {
        let data = propagating(1, 2.5);
        let err = estimate_conduction_velocity_table(data.view(), 5.0, 2048.0, &CvConfig::default()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_inconsistent_lengths_rejected() {
        let a = ndarray::Array1::<f64>::zeros(64);
        let b = ndarray::Array1::<f64>::zeros(60);
        let signals = [a.view(), b.view()];
        assert!(estimate_conduction_velocity(&signals, 5.0, 2048.0, &CvConfig::default()).is_err());
    }

    #[test]
    fn test_report_over_column_span() {
        let template = Template::from_tables(vec![(ColumnKey::indexed(0), propagating(5, 2.0))]);
        let report = analyze_conduction(
            &template,
            &ColumnKey::indexed(0),
            1..4,
            5.0,
            2048.0,
            &CvConfig::default(),
        )
        .unwrap();
        assert!((report.cv - 5.12).abs() < 1e-2);
        assert!(report.xcc > 0.99);
        assert!(report.rms > 0.0);

        assert!(analyze_conduction(&template, &ColumnKey::indexed(0), 3..9, 5.0, 2048.0, &CvConfig::default()).is_err());
        assert!(analyze_conduction(&template, &ColumnKey::indexed(3), 0..2, 5.0, 2048.0, &CvConfig::default()).is_err());
    }
}
