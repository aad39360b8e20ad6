//! MUAP template containers
//!
//! A [`Template`] keeps one `[time, row]` table per electrode column, in grid
//! column order. Channels that carry no usable data (unused electrodes,
//! windows lost at the recording edge) are placeholders: they hold NaN and
//! are flagged in an explicit per-channel mask so they keep their position
//! without entering any correlation.

use ndarray::{s, Array2, Array3, ArrayView1, Axis};

use crate::error::{EmgErrorBuilder, EmgResult};
use crate::grid::ColumnKey;

/// `[time, row]` table of one electrode column
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateColumn {
    data: Array2<f64>,
    placeholder: Vec<bool>,
}

impl TemplateColumn {
    /// Wrap a table; channels holding any NaN are marked as placeholders
    pub fn new(data: Array2<f64>) -> Self {
        let placeholder = data
            .columns()
            .into_iter()
            .map(|channel| channel.iter().any(|v| v.is_nan()))
            .collect();
        Self { data, placeholder }
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_rows(&self) -> usize {
        self.data.ncols()
    }

    pub fn channel(&self, row: usize) -> ArrayView1<'_, f64> {
        self.data.column(row)
    }

    pub fn is_placeholder(&self, row: usize) -> bool {
        self.placeholder[row]
    }

    pub fn placeholder_mask(&self) -> &[bool] {
        &self.placeholder
    }
}

/// Averaged MUAP of one MU over the whole grid
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    columns: Vec<(ColumnKey, TemplateColumn)>,
    inert: bool,
}

impl Template {
    pub fn new(columns: Vec<(ColumnKey, TemplateColumn)>) -> Self {
        Self { columns, inert: false }
    }

    /// Template of a MU with no firings; kept for shape only
    pub fn inert(columns: Vec<(ColumnKey, TemplateColumn)>) -> Self {
        Self { columns, inert: true }
    }

    /// Build from `(key, table)` pairs
    pub fn from_tables(tables: Vec<(ColumnKey, Array2<f64>)>) -> Self {
        Self::new(
            tables
                .into_iter()
                .map(|(key, data)| (key, TemplateColumn::new(data)))
                .collect(),
        )
    }

    /// True when the MU had no firing, so the template is a zero/NaN fill
    pub fn is_inert(&self) -> bool {
        self.inert
    }

    pub fn columns(&self) -> &[(ColumnKey, TemplateColumn)] {
        &self.columns
    }

    pub fn column(&self, key: &ColumnKey) -> Option<&TemplateColumn> {
        self.columns.iter().find(|(k, _)| k == key).map(|(_, c)| c)
    }

    /// Window length in samples
    pub fn n_samples(&self) -> usize {
        self.columns.first().map(|(_, c)| c.n_samples()).unwrap_or(0)
    }

    pub fn n_channels(&self) -> usize {
        self.columns.iter().map(|(_, c)| c.n_rows()).sum()
    }

    /// Channels that are not placeholders
    pub fn n_valid_channels(&self) -> usize {
        self.columns
            .iter()
            .flat_map(|(_, c)| c.placeholder_mask().iter())
            .filter(|&&p| !p)
            .count()
    }

    /// Same column keys and rows per column
    pub fn same_geometry(&self, other: &Template) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(other.columns.iter())
                .all(|((ka, a), (kb, b))| ka == kb && a.n_rows() == b.n_rows())
    }

    /// Concatenate every column side by side into one `[time, channel]` table
    pub fn flatten(&self) -> FlatTemplate {
        let n_samples = self.n_samples();
        let mut data = Array2::<f64>::zeros((n_samples, self.n_channels()));
        let mut valid = Vec::with_capacity(self.n_channels());
        let mut layout = Vec::with_capacity(self.columns.len());

        let mut offset = 0;
        for (key, column) in &self.columns {
            let rows = column.n_rows();
            data.slice_mut(s![.., offset..offset + rows]).assign(column.data());
            valid.extend(column.placeholder_mask().iter().map(|&p| !p));
            layout.push((key.clone(), rows));
            offset += rows;
        }

        FlatTemplate {
            data,
            valid,
            layout,
            inert: self.inert,
        }
    }
}

/// Flattened template plus the layout needed to rebuild it
#[derive(Debug, Clone, PartialEq)]
pub struct FlatTemplate {
    /// `[time, channel]`, columns concatenated in grid order
    pub data: Array2<f64>,
    /// False for placeholder channels
    pub valid: Vec<bool>,
    layout: Vec<(ColumnKey, usize)>,
    inert: bool,
}

impl FlatTemplate {
    /// Only the non-placeholder channels
    pub fn valid_channels(&self) -> Array2<f64> {
        let keep: Vec<usize> = self
            .valid
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v)
            .map(|(i, _)| i)
            .collect();
        self.data.select(Axis(1), &keep)
    }

    /// Replace the time axis, e.g. after alignment
    pub fn with_data(&self, data: Array2<f64>) -> EmgResult<Self> {
        if data.ncols() != self.data.ncols() {
            return Err(EmgErrorBuilder::new("template", "with_data").mismatch(
                "flat template",
                "channel count must not change",
                self.data.ncols(),
                data.ncols(),
            ));
        }
        Ok(Self {
            data,
            valid: self.valid.clone(),
            layout: self.layout.clone(),
            inert: self.inert,
        })
    }

    /// Split back into the original column-keyed structure
    pub fn repack(&self) -> Template {
        let mut offset = 0;
        let columns = self
            .layout
            .iter()
            .map(|(key, rows)| {
                let data = self.data.slice(s![.., offset..offset + rows]).to_owned();
                let placeholder = self.valid[offset..offset + rows].iter().map(|&v| !v).collect();
                offset += rows;
                (key.clone(), TemplateColumn { data, placeholder })
            })
            .collect();
        Template {
            columns,
            inert: self.inert,
        }
    }
}

/// Per-firing MUAPs of one MU, one `[time, row, trial]` array per column
#[derive(Debug, Clone, PartialEq)]
pub struct SingleTrialTemplate {
    columns: Vec<(ColumnKey, Array3<f64>)>,
}

impl SingleTrialTemplate {
    pub fn new(columns: Vec<(ColumnKey, Array3<f64>)>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[(ColumnKey, Array3<f64>)] {
        &self.columns
    }

    pub fn n_samples(&self) -> usize {
        self.columns.first().map(|(_, c)| c.len_of(Axis(0))).unwrap_or(0)
    }

    pub fn n_trials(&self) -> usize {
        self.columns.first().map(|(_, c)| c.len_of(Axis(2))).unwrap_or(0)
    }

    /// Average over trials, giving the STA of the same firings
    pub fn mean(&self) -> Template {
        let columns = self
            .columns
            .iter()
            .map(|(key, trials)| {
                let data = trials.mean_axis(Axis(2)).unwrap_or_else(|| {
                    Array2::from_elem((trials.len_of(Axis(0)), trials.len_of(Axis(1))), f64::NAN)
                });
                (key.clone(), TemplateColumn::new(data))
            })
            .collect();
        Template::new(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn template() -> Template {
        Template::from_tables(vec![
            (ColumnKey::indexed(0), array![[1.0, f64::NAN], [2.0, f64::NAN], [3.0, f64::NAN]]),
            (ColumnKey::indexed(1), array![[4.0, 7.0], [5.0, 8.0], [6.0, 9.0]]),
        ])
    }

    #[test]
    fn test_placeholder_mask() {
        let t = template();
        assert_eq!(t.n_channels(), 4);
        assert_eq!(t.n_valid_channels(), 3);
        assert!(t.columns()[0].1.is_placeholder(1));
    }

    #[test]
    fn test_flatten_and_repack() {
        let t = template();
        let flat = t.flatten();
        assert_eq!(flat.data.dim(), (3, 4));
        assert_eq!(flat.valid, vec![true, false, true, true]);
        assert_eq!(flat.valid_channels().column(1).to_vec(), vec![4.0, 5.0, 6.0]);

        let repacked = flat.repack();
        assert!(repacked.same_geometry(&t));
        assert_eq!(repacked.column(&ColumnKey::indexed(1)), t.column(&ColumnKey::indexed(1)));
    }

    #[test]
    fn test_repack_after_trimming_time_axis() {
        let flat = template().flatten();
        let trimmed = flat.with_data(flat.data.slice(s![1.., ..]).to_owned()).unwrap();
        let repacked = trimmed.repack();
        assert_eq!(repacked.n_samples(), 2);
        assert!(repacked.columns()[0].1.is_placeholder(1));
        assert!(flat.with_data(Array2::zeros((2, 3))).is_err());
    }

    #[test]
    fn test_single_trial_mean() {
        let mut trials = Array3::<f64>::zeros((2, 1, 2));
        trials[[0, 0, 0]] = 1.0;
        trials[[0, 0, 1]] = 3.0;
        let st = SingleTrialTemplate::new(vec![(ColumnKey::indexed(0), trials)]);
        assert_eq!(st.n_trials(), 2);
        let sta = st.mean();
        assert_eq!(sta.columns()[0].1.data()[[0, 0]], 2.0);
    }
}
