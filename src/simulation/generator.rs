//! Synthetic decomposed HD-EMG recordings
//! Location: src/simulation/generator.rs

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::config::SimulationConfig;
use super::muap_model::MuapModel;
use crate::error::EmgResult;
use crate::firings::FiringTrain;
use crate::grid::{ColumnKey, GridColumn, GridSignal};
use crate::recording::EmgRecording;

/// A generated recording and the MUs it was built from
#[derive(Debug, Clone)]
pub struct SyntheticRecording {
    pub recording: EmgRecording,
    pub muaps: Vec<MuapModel>,
}

/// Seeded generator of monopolar grid recordings with known MUs
pub struct RecordingGenerator {
    config: SimulationConfig,
    rng: StdRng,
}

impl RecordingGenerator {
    pub fn new(config: SimulationConfig) -> EmgResult<Self> {
        config.validate()?;
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self { config, rng })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Draw `n_mus` random action potentials
    pub fn draw_muaps(&mut self) -> Vec<MuapModel> {
        (0..self.config.n_mus)
            .map(|_| MuapModel::random(&mut self.rng, &self.config))
            .collect()
    }

    /// Jittered discharge instants of one MU
    ///
    /// Every discharge leaves room for the full wave on all rows.
    pub fn draw_firings(&mut self, muap: &MuapModel) -> FiringTrain {
        let n_samples = self.config.n_samples();
        let (before, after) = muap.support(self.config.n_rows);
        let (low, high) = self.config.firing.rate_range_hz;
        let rate = if high > low { self.rng.gen_range(low..high) } else { low };
        let mean_isi = self.config.fsamp / rate;
        let jitter = self.config.firing.isi_jitter;

        let mut firings = Vec::new();
        let mut position = before as f64 + self.rng.gen::<f64>() * mean_isi;
        while (position.round() as usize) + after < n_samples {
            let sample = position.round() as usize;
            if firings.last().map_or(true, |&last| sample > last) {
                firings.push(sample);
            }
            let spread = jitter * (2.0 * self.rng.gen::<f64>() - 1.0);
            position += mean_isi * (1.0 + spread);
        }
        FiringTrain::new(firings).unwrap_or_default()
    }

    /// Standard normal sample (Box-Muller)
    fn gaussian(&mut self) -> f64 {
        let u1: f64 = self.rng.gen::<f64>().max(f64::MIN_POSITIVE);
        let u2: f64 = self.rng.gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    /// Build a recording from the given MUs with fresh firings and noise
    pub fn render(&mut self, muaps: &[MuapModel]) -> EmgResult<EmgRecording> {
        let n_samples = self.config.n_samples();
        let n_rows = self.config.n_rows;
        let firings: Vec<FiringTrain> = muaps.iter().map(|m| self.draw_firings(m)).collect();

        let mut columns = Vec::with_capacity(self.config.n_columns);
        for column in 0..self.config.n_columns {
            let mut data = Array2::<f64>::zeros((n_samples, n_rows));
            for (muap, train) in muaps.iter().zip(&firings) {
                let (before, after) = muap.support(n_rows);
                for &discharge in train.as_slice() {
                    let start = discharge.saturating_sub(before);
                    let end = (discharge + after + 1).min(n_samples);
                    for t in start..end {
                        let offset = t as f64 - discharge as f64;
                        for row in 0..n_rows {
                            data[[t, row]] += muap.value(column, row, offset);
                        }
                    }
                }
            }

            let std = self.config.noise.std_mv;
            if std > 0.0 {
                for value in data.iter_mut() {
                    *value += std * self.gaussian();
                }
            }
            columns.push(GridColumn::new(ColumnKey::indexed(column), data));
        }

        debug!(
            n_samples,
            n_columns = self.config.n_columns,
            n_mus = muaps.len(),
            "rendered synthetic recording"
        );
        Ok(EmgRecording::new(GridSignal::new(columns)?, firings, self.config.fsamp)?.with_ied(self.config.ied_mm))
    }

    /// Draw MUs and render them
    pub fn generate(&mut self) -> EmgResult<SyntheticRecording> {
        let muaps = self.draw_muaps();
        let recording = self.render(&muaps)?;
        Ok(SyntheticRecording { recording, muaps })
    }
}

/// Two sessions sharing their first `shared` MUs
///
/// The second session uses a seed derived from the first, so firings,
/// noise and the unshared MUs differ.
pub fn generate_session_pair(
    config: &SimulationConfig,
    shared: usize,
) -> EmgResult<(SyntheticRecording, SyntheticRecording)> {
    let mut first_gen = RecordingGenerator::new(config.clone())?;
    let first = first_gen.generate()?;

    let mut second_gen = RecordingGenerator::new(SimulationConfig {
        seed: config.seed.wrapping_add(1),
        ..config.clone()
    })?;
    let shared = shared.min(first.muaps.len());
    let mut muaps: Vec<MuapModel> = first.muaps[..shared].to_vec();
    muaps.extend(second_gen.draw_muaps().into_iter().skip(shared));
    let recording = second_gen.render(&muaps)?;

    Ok((first, SyntheticRecording { recording, muaps }))
}
