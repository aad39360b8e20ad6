//! Synthetic HD-EMG recordings with known motor units
//! Location: src/simulation/mod.rs

pub mod config;
pub mod generator;
pub mod muap_model;

pub use config::{FiringConfig, MuapConfig, NoiseConfig, SimulationConfig};
pub use generator::{generate_session_pair, RecordingGenerator, SyntheticRecording};
pub use muap_model::MuapModel;
