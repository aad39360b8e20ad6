// tests/conduction_velocity.rs
//! Conduction velocity on synthetic propagating MUs

use hdemg_core::config::CvConfig;
use hdemg_core::firings::FiringRange;
use hdemg_core::grid::{ColumnKey, Derivation};
use hdemg_core::processing::{analyze_conduction, sta, xcc_sta, Template};
use hdemg_core::simulation::{MuapConfig, NoiseConfig, RecordingGenerator, SimulationConfig, SyntheticRecording};

fn single_mu_config(seed: u64) -> SimulationConfig {
    SimulationConfig {
        seed,
        duration_s: 3.0,
        n_mus: 1,
        noise: NoiseConfig { std_mv: 0.001 },
        ..Default::default()
    }
}

fn simulate(config: SimulationConfig) -> SyntheticRecording {
    RecordingGenerator::new(config).unwrap().generate().unwrap()
}

fn single_mu(seed: u64) -> SyntheticRecording {
    simulate(single_mu_config(seed))
}

fn double_differential_sta(synthetic: &SyntheticRecording) -> Template {
    let recording = &synthetic.recording;
    let derived = Derivation::DoubleDifferential.apply(recording.grid()).unwrap();
    let mut extraction = sta(&derived, recording.firings(), recording.fsamp(), 100.0, &FiringRange::All).unwrap();
    extraction.templates.remove(0)
}

fn main_column(synthetic: &SyntheticRecording) -> ColumnKey {
    let last = synthetic.recording.grid().n_columns() - 1;
    ColumnKey::indexed((synthetic.muaps[0].centre_column.round() as usize).min(last))
}

#[test]
fn test_recovers_simulated_velocity() {
    for seed in [3, 17, 29] {
        let synthetic = single_mu(seed);
        let template = double_differential_sta(&synthetic);
        let report = analyze_conduction(
            &template,
            &main_column(&synthetic),
            0..6,
            8.0,
            2048.0,
            &CvConfig::default(),
        )
        .unwrap();

        let expected = synthetic.muaps[0].conduction_velocity;
        assert!(
            (report.cv - expected).abs() / expected < 0.05,
            "seed {}: estimated {} m/s, simulated {} m/s",
            seed,
            report.cv,
            expected
        );
        assert!(report.xcc > 0.9);
        assert!(report.rms > 0.0);
    }
}

#[test]
fn test_adjacent_channels_are_similar() {
    // 4.096 m/s at 8 mm and 2048 Hz: each row lags the previous by 4 samples
    let synthetic = simulate(SimulationConfig {
        muap: MuapConfig {
            cv_range: (4.096, 4.096),
            ..Default::default()
        },
        ..single_mu_config(5)
    });
    assert!((synthetic.muaps[0].row_delay - 4.0).abs() < 1e-9);
    let template = double_differential_sta(&synthetic);
    let per_mu = xcc_sta(std::slice::from_ref(&template)).unwrap();
    let key = main_column(&synthetic);
    let (_, rows) = per_mu[0].iter().find(|(k, _)| *k == key).unwrap();

    assert_eq!(rows.len(), 6);
    assert_eq!(rows[5], None);
    assert!(rows[..5].iter().all(|v| v.unwrap() > 0.99), "{:?}", rows);
}

#[test]
fn test_span_outside_column_is_rejected() {
    let synthetic = single_mu(3);
    let template = double_differential_sta(&synthetic);
    let result = analyze_conduction(
        &template,
        &main_column(&synthetic),
        4..9,
        8.0,
        2048.0,
        &CvConfig::default(),
    );
    assert!(result.is_err());
}
