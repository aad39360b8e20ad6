//! Normalized cross-correlation
//!
//! The 2D correlation of `a` against `b` is
//! `C[kt, kc] = sum a[t + kt, c + kc] * b[t, c]`, divided by `|a| * |b|`
//! (L2 norms over the whole tables). It is evaluated through zero-padded
//! 2D FFTs. A peak at a negative time lag means `a` leads `b`.

use std::sync::Arc;

use ndarray::{s, Array2, ArrayView1, ArrayView2, Axis};
use rustfft::{num_complex::Complex64, Fft, FftPlanner};

use crate::error::{EmgErrorBuilder, EmgResult, ProcessingStage};
use crate::grid::ColumnKey;
use crate::processing::template::Template;

/// Output extent of a correlation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationMode {
    /// Every overlap, shape `(ta + tb - 1, ca + cb - 1)`
    Full,
    /// Centred window with the shape of `a`
    Same,
}

/// Apply a 1D transform to every lane along both axes
fn transform(data: &mut Array2<Complex64>, along_time: &Arc<dyn Fft<f64>>, along_space: &Arc<dyn Fft<f64>>) {
    let mut buffer = Vec::with_capacity(data.nrows().max(data.ncols()));
    for (axis, fft) in [(Axis(1), along_space), (Axis(0), along_time)] {
        for mut lane in data.lanes_mut(axis) {
            buffer.clear();
            buffer.extend(lane.iter().copied());
            fft.process(&mut buffer);
            lane.iter_mut().zip(&buffer).for_each(|(dst, src)| *dst = *src);
        }
    }
}

/// Unnormalized full-mode correlation
fn correlate_full(a: ArrayView2<'_, f64>, b: ArrayView2<'_, f64>) -> Array2<f64> {
    let (ta, ca) = a.dim();
    let (tb, cb) = b.dim();
    let shape = (ta + tb - 1, ca + cb - 1);
    let zero = Complex64::new(0.0, 0.0);

    let mut fa = Array2::from_elem(shape, zero);
    fa.slice_mut(s![..ta, ..ca])
        .zip_mut_with(&a, |dst, &src| *dst = Complex64::new(src, 0.0));

    // Correlation is convolution with the flipped kernel
    let mut fb = Array2::from_elem(shape, zero);
    for ((t, c), &value) in b.indexed_iter() {
        fb[[tb - 1 - t, cb - 1 - c]] = Complex64::new(value, 0.0);
    }

    let mut planner = FftPlanner::<f64>::new();
    let forward_time = planner.plan_fft_forward(shape.0);
    let forward_space = planner.plan_fft_forward(shape.1);
    let inverse_time = planner.plan_fft_inverse(shape.0);
    let inverse_space = planner.plan_fft_inverse(shape.1);

    transform(&mut fa, &forward_time, &forward_space);
    transform(&mut fb, &forward_time, &forward_space);
    fa.zip_mut_with(&fb, |x, &y| *x *= y);
    transform(&mut fa, &inverse_time, &inverse_space);

    let scale = (shape.0 * shape.1) as f64;
    fa.mapv(|z| z.re / scale)
}

/// 2D normalized cross-correlation of `a` against `b`
///
/// Empty or zero-energy inputs have no defined similarity and are
/// reported as a computation error.
pub fn norm_xcorr_2d(
    a: ArrayView2<'_, f64>,
    b: ArrayView2<'_, f64>,
    mode: CorrelationMode,
) -> EmgResult<Array2<f64>> {
    if a.is_empty() || b.is_empty() {
        return Err(EmgErrorBuilder::new("xcorr", "norm_xcorr_2d")
            .info("a_shape", format!("{:?}", a.dim()))
            .info("b_shape", format!("{:?}", b.dim()))
            .computation(ProcessingStage::Similarity, "no channel left to correlate"));
    }

    let norm = a.iter().map(|v| v * v).sum::<f64>().sqrt() * b.iter().map(|v| v * v).sum::<f64>().sqrt();
    if !(norm > 0.0 && norm.is_finite()) {
        return Err(EmgErrorBuilder::new("xcorr", "norm_xcorr_2d")
            .info("norm", norm.to_string())
            .computation(ProcessingStage::Similarity, "input has no finite non-zero energy"));
    }

    let full = correlate_full(a, b) / norm;
    Ok(match mode {
        CorrelationMode::Full => full,
        CorrelationMode::Same => {
            let (ta, ca) = a.dim();
            let (t0, c0) = ((b.nrows() - 1) / 2, (b.ncols() - 1) / 2);
            full.slice(s![t0..t0 + ta, c0..c0 + ca]).to_owned()
        }
    })
}

/// Time lag of every row of a same-mode correlation
pub fn same_mode_lags(len_a: usize, len_b: usize) -> Vec<isize> {
    let offset = (len_b as isize - 1) / 2 - (len_b as isize - 1);
    (0..len_a as isize).map(|i| i + offset).collect()
}

/// Maximum of a correlation table, bounded to [-1, 1] against FFT rounding
fn peak(correlation: &Array2<f64>) -> f64 {
    correlation
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max)
        .clamp(-1.0, 1.0)
}

/// Similarity of two aligned templates
///
/// Placeholder channels are dropped from both, then the maximum of the
/// full-mode 2D normalized correlation is returned.
pub fn xcc(a: &Template, b: &Template) -> EmgResult<f64> {
    let a = a.flatten().valid_channels();
    let b = b.flatten().valid_channels();
    let correlation = norm_xcorr_2d(a.view(), b.view(), CorrelationMode::Full)?;
    Ok(peak(&correlation))
}

/// Maximum of the 1D normalized cross-correlation of two signals
pub fn norm_xcorr(x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> EmgResult<f64> {
    let correlation = norm_xcorr_2d(x.insert_axis(Axis(1)), y.insert_axis(Axis(1)), CorrelationMode::Full)?;
    Ok(peak(&correlation))
}

/// Similarity of every channel with the next row of the same column
///
/// The last row of each column has no neighbour. Pairs involving a
/// placeholder channel, and every pair of an inert template, are `None`.
pub fn adjacent_channel_xcc(template: &Template) -> EmgResult<Vec<(ColumnKey, Vec<Option<f64>>)>> {
    template
        .columns()
        .iter()
        .map(|(key, column)| -> EmgResult<(ColumnKey, Vec<Option<f64>>)> {
            let rows = (0..column.n_rows())
                .map(|row| -> EmgResult<Option<f64>> {
                    let next = row + 1;
                    if template.is_inert()
                        || next >= column.n_rows()
                        || column.is_placeholder(row)
                        || column.is_placeholder(next)
                    {
                        return Ok(None);
                    }
                    norm_xcorr(column.channel(row), column.channel(next)).map(Some)
                })
                .collect::<EmgResult<Vec<_>>>()?;
            Ok((key.clone(), rows))
        })
        .collect()
}

/// [`adjacent_channel_xcc`] for every MU
pub fn xcc_sta(templates: &[Template]) -> EmgResult<Vec<Vec<(ColumnKey, Vec<Option<f64>>)>>> {
    templates.iter().map(adjacent_channel_xcc).collect()
}
