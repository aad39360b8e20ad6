//! Spike-triggered MUAP extraction
//!
//! Windows of `2 * half` samples are cut around every selected firing
//! `p` as `[p - half, p + half)`. A window that would cross either end of
//! the recording is discarded, never padded.

use ndarray::{s, Array2, Array3, Axis};
use tracing::debug;

use crate::diagnostics::{DataQualityWarning, Diagnostics};
use crate::error::{EmgErrorBuilder, EmgResult};
use crate::firings::{FiringRange, FiringTrain};
use crate::grid::{GridColumn, GridSignal};
use crate::processing::template::{SingleTrialTemplate, Template, TemplateColumn};
use crate::utils::conversion::{window_samples, WindowSamples};
use crate::utils::validation::{validate_positive, validate_sampling_rate};

/// Templates of every MU plus the warnings raised while computing them
#[derive(Debug, Clone)]
pub struct Extraction<T> {
    pub templates: Vec<T>,
    pub diagnostics: Diagnostics,
}

/// What to build for one MU
enum WindowPlan {
    /// No firing selected: zero fill, NaN on empty channels
    Inert,
    /// Firings exist but none has a complete window
    Placeholder,
    /// Start samples of the retained windows
    Windows(Vec<usize>),
}

fn check_window(fsamp: f64, timewindow_ms: f64) -> EmgResult<WindowSamples> {
    validate_sampling_rate(fsamp)?;
    validate_positive(timewindow_ms, "timewindow_ms")?;
    let window = window_samples(timewindow_ms, fsamp);
    if window.half == 0 {
        return Err(EmgErrorBuilder::new("extraction", "check_window").configuration(
            "timewindow_ms",
            timewindow_ms,
            "window is shorter than two samples at this sampling rate",
        ));
    }
    Ok(window)
}

fn plan_windows(
    mu: usize,
    train: &FiringTrain,
    range: &FiringRange,
    n_samples: usize,
    window: WindowSamples,
    diagnostics: &mut Diagnostics,
) -> WindowPlan {
    if train.is_empty() {
        diagnostics.push(DataQualityWarning::EmptyMotorUnit { mu });
        return WindowPlan::Inert;
    }

    let selected = train.select(range);
    if selected.is_empty() {
        let span = range.resolve(usize::MAX);
        diagnostics.push(DataQualityWarning::NoFiringsInRange {
            mu,
            start: span.start,
            end: span.end,
        });
        return WindowPlan::Inert;
    }

    let starts: Vec<usize> = selected
        .iter()
        .filter(|&&p| p >= window.half && p + window.half <= n_samples)
        .map(|&p| p - window.half)
        .collect();

    let discarded = selected.len() - starts.len();
    if starts.is_empty() {
        diagnostics.push(DataQualityWarning::NoCompleteWindows { mu });
        WindowPlan::Placeholder
    } else {
        if discarded > 0 {
            diagnostics.push(DataQualityWarning::IncompleteWindows { mu, discarded });
        }
        WindowPlan::Windows(starts)
    }
}

/// Fill used for MUs without firings
fn inert_fill(column: &GridColumn, full: usize) -> Array2<f64> {
    let mut data = Array2::<f64>::zeros((full, column.n_rows()));
    for row in 0..column.n_rows() {
        if column.is_empty_channel(row) {
            data.column_mut(row).fill(f64::NAN);
        }
    }
    data
}

/// Spike-triggered average of every MU
///
/// The output template of every MU spans `window.full` samples, whatever
/// the number of firings. MUs without selected firings get an inert
/// template (zeros, NaN on empty channels). When all windows of a MU cross
/// the recording edge the template is NaN-filled and every channel is a
/// placeholder.
pub fn sta(
    grid: &GridSignal,
    firings: &[FiringTrain],
    fsamp: f64,
    timewindow_ms: f64,
    range: &FiringRange,
) -> EmgResult<Extraction<Template>> {
    let window = check_window(fsamp, timewindow_ms)?;
    let mut diagnostics = Diagnostics::new();

    debug!(
        mus = firings.len(),
        half_window = window.half,
        range = %range,
        "computing spike-triggered averages"
    );

    let templates = firings
        .iter()
        .enumerate()
        .map(|(mu, train)| {
            match plan_windows(mu, train, range, grid.n_samples(), window, &mut diagnostics) {
                WindowPlan::Inert => Template::inert(
                    grid.columns()
                        .iter()
                        .map(|c| (c.key.clone(), TemplateColumn::new(inert_fill(c, window.full))))
                        .collect(),
                ),
                WindowPlan::Placeholder => Template::new(
                    grid.columns()
                        .iter()
                        .map(|c| {
                            let data = Array2::from_elem((window.full, c.n_rows()), f64::NAN);
                            (c.key.clone(), TemplateColumn::new(data))
                        })
                        .collect(),
                ),
                WindowPlan::Windows(starts) => Template::new(
                    grid.columns()
                        .iter()
                        .map(|c| (c.key.clone(), TemplateColumn::new(average(c, &starts, window.full))))
                        .collect(),
                ),
            }
        })
        .collect();

    Ok(Extraction { templates, diagnostics })
}

fn average(column: &GridColumn, starts: &[usize], full: usize) -> Array2<f64> {
    let mut sum = Array2::<f64>::zeros((full, column.n_rows()));
    for &start in starts {
        sum += &column.data.slice(s![start..start + full, ..]);
    }
    sum / starts.len() as f64
}

/// Single-trial MUAPs of every MU
///
/// Same window and edge rules as [`sta`], but every retained window is kept
/// as its own trial. Inert and placeholder MUs get one filled trial.
pub fn st_muap(
    grid: &GridSignal,
    firings: &[FiringTrain],
    fsamp: f64,
    timewindow_ms: f64,
    range: &FiringRange,
) -> EmgResult<Extraction<SingleTrialTemplate>> {
    let window = check_window(fsamp, timewindow_ms)?;
    let mut diagnostics = Diagnostics::new();

    debug!(mus = firings.len(), half_window = window.half, "computing single-trial MUAPs");

    let templates = firings
        .iter()
        .enumerate()
        .map(|(mu, train)| {
            let plan = plan_windows(mu, train, range, grid.n_samples(), window, &mut diagnostics);
            let columns = grid
                .columns()
                .iter()
                .map(|c| {
                    let trials = match &plan {
                        WindowPlan::Inert => inert_fill(c, window.full).insert_axis(Axis(2)),
                        WindowPlan::Placeholder => {
                            Array3::from_elem((window.full, c.n_rows(), 1), f64::NAN)
                        }
                        WindowPlan::Windows(starts) => {
                            let mut trials = Array3::<f64>::zeros((window.full, c.n_rows(), starts.len()));
                            for (trial, &start) in starts.iter().enumerate() {
                                trials
                                    .index_axis_mut(Axis(2), trial)
                                    .assign(&c.data.slice(s![start..start + window.full, ..]));
                            }
                            trials
                        }
                    };
                    (c.key.clone(), trials)
                })
                .collect();
            SingleTrialTemplate::new(columns)
        })
        .collect();

    Ok(Extraction { templates, diagnostics })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two columns of three rows; every channel holds its own sample index
    fn ramp_grid(n_samples: usize) -> GridSignal {
        let data = Array2::from_shape_fn((n_samples, 3), |(t, r)| t as f64 + 100.0 * r as f64);
        GridSignal::from_arrays(vec![data.clone(), data]).unwrap()
    }

    fn trains(samples: &[&[usize]]) -> Vec<FiringTrain> {
        samples.iter().map(|s| FiringTrain::new(s.to_vec()).unwrap()).collect()
    }

    #[test]
    fn test_sta_window_contents() {
        let grid = ramp_grid(64);
        let out = sta(&grid, &trains(&[&[32]]), 1000.0, 20.0, &FiringRange::All).unwrap();
        let column = &out.templates[0].columns()[0].1;
        assert_eq!(column.n_samples(), 20);
        assert_eq!(column.data()[[0, 0]], 22.0);
        assert_eq!(column.data()[[19, 1]], 141.0);
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_sta_averages_retained_windows() {
        let grid = ramp_grid(64);
        let out = sta(&grid, &trains(&[&[20, 40]]), 1000.0, 20.0, &FiringRange::All).unwrap();
        // Mean of windows starting at 10 and 30
        assert_eq!(out.templates[0].columns()[1].1.data()[[0, 0]], 20.0);
    }

    #[test]
    fn test_edge_windows_discarded_with_warning() {
        let grid = ramp_grid(64);
        let out = sta(&grid, &trains(&[&[5, 32, 60]]), 1000.0, 20.0, &FiringRange::All).unwrap();
        assert_eq!(out.templates[0].columns()[0].1.data()[[0, 0]], 22.0);
        assert_eq!(
            out.diagnostics.warnings(),
            &[DataQualityWarning::IncompleteWindows { mu: 0, discarded: 2 }]
        );
    }

    #[test]
    fn test_empty_mu_gets_inert_template() {
        let mut data = Array2::<f64>::ones((64, 3));
        data.column_mut(2).fill(f64::NAN);
        let grid = GridSignal::from_arrays(vec![data]).unwrap();
        let out = sta(&grid, &[FiringTrain::empty()], 1000.0, 20.0, &FiringRange::All).unwrap();

        let template = &out.templates[0];
        assert!(template.is_inert());
        let column = &template.columns()[0].1;
        assert_eq!(column.n_samples(), 20);
        assert_eq!(column.data()[[3, 0]], 0.0);
        assert!(column.is_placeholder(2));
        assert_eq!(out.diagnostics.warnings(), &[DataQualityWarning::EmptyMotorUnit { mu: 0 }]);
    }

    #[test]
    fn test_all_windows_discarded_gives_placeholders() {
        let grid = ramp_grid(64);
        let out = sta(&grid, &trains(&[&[2, 62]]), 1000.0, 20.0, &FiringRange::All).unwrap();
        let template = &out.templates[0];
        assert!(!template.is_inert());
        assert_eq!(template.n_samples(), 20);
        assert_eq!(template.n_valid_channels(), 0);
        assert_eq!(out.diagnostics.warnings(), &[DataQualityWarning::NoCompleteWindows { mu: 0 }]);
    }

    #[test]
    fn test_firing_range_restriction() {
        let grid = ramp_grid(128);
        let firings = trains(&[&[20, 40, 60, 80]]);
        let out = sta(&grid, &firings, 1000.0, 20.0, &FiringRange::span(2, 3)).unwrap();
        assert_eq!(out.templates[0].columns()[0].1.data()[[0, 0]], 50.0);

        let out = sta(&grid, &firings, 1000.0, 20.0, &FiringRange::span(6, 9)).unwrap();
        assert!(out.templates[0].is_inert());
        assert!(matches!(
            out.diagnostics.warnings()[0],
            DataQualityWarning::NoFiringsInRange { mu: 0, start: 6, end: 9 }
        ));
    }

    #[test]
    fn test_window_too_short_rejected() {
        let grid = ramp_grid(64);
        assert!(sta(&grid, &trains(&[&[32]]), 1000.0, 0.4, &FiringRange::All).is_err());
        assert!(sta(&grid, &trains(&[&[32]]), 0.0, 20.0, &FiringRange::All).is_err());
    }

    #[test]
    fn test_st_muap_keeps_trials() {
        let grid = ramp_grid(64);
        let out = st_muap(&grid, &trains(&[&[20, 40], &[]]), 1000.0, 20.0, &FiringRange::All).unwrap();
        let st = &out.templates[0];
        assert_eq!(st.n_trials(), 2);
        assert_eq!(st.columns()[0].1[[0, 0, 1]], 30.0);
        assert_eq!(out.templates[1].n_trials(), 1);
        assert_eq!(out.templates[1].n_samples(), 20);

        let sta_out = sta(&grid, &trains(&[&[20, 40]]), 1000.0, 20.0, &FiringRange::All).unwrap();
        assert_eq!(st.mean().columns()[0].1.data(), sta_out.templates[0].columns()[0].1.data());
    }
}
