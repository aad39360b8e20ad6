//! HDEMG-Core: motor unit analysis for high-density EMG recordings
//!
//! This library works on decomposed HD-EMG recordings (a grid signal plus
//! the firing trains of its motor units) and provides:
//!
//! - Spatial derivations of electrode grids (monopolar, single and double differential)
//! - Spike-triggered average and single-trial MUAP templates
//! - Cross-correlation alignment and similarity of templates
//! - Tracking of motor units across two recordings, with a worker pool
//! - Duplicate removal between recordings
//! - Maximum-likelihood conduction velocity estimation
//! - Layered TOML configuration
//! - Synthetic recordings for testing
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use hdemg_core::config::TrackingConfig;
//! use hdemg_core::simulation::{generate_session_pair, SimulationConfig};
//! use hdemg_core::tracking::{track, TemplateSource};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (first, second) = generate_session_pair(&SimulationConfig::default(), 2)?;
//!
//!     let result = track(
//!         TemplateSource::Computed {
//!             first: &first.recording,
//!             second: &second.recording,
//!         },
//!         &TrackingConfig::default(),
//!     )?;
//!
//!     for pair in result.matches() {
//!         println!("MU {} <-> MU {}: {:.3}", pair.mu_first, pair.mu_second, pair.xcc);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod firings;
pub mod grid;
pub mod processing;
pub mod recording;
pub mod simulation;
pub mod tracking;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::{CvConfig, HdemgConfig, TrackingConfig};
pub use diagnostics::{DataQualityWarning, Diagnostics, RecordingSide};
pub use error::{EmgError, EmgResult};
pub use firings::{FiringRange, FiringTrain};
pub use grid::{ColumnKey, Derivation, GridSignal};
pub use processing::{Template, CvReport};
pub use recording::EmgRecording;
pub use tracking::{track, TemplateSource, TrackingResult};

pub use utils::validation::{ValidationError, ValidationResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "High-density EMG motor unit analysis library".to_string(),
        features: vec![
            "Grid derivations".to_string(),
            "MUAP template extraction".to_string(),
            "Motor unit tracking".to_string(),
            "Conduction velocity estimation".to_string(),
            "Layered configuration".to_string(),
        ],
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// List of features
    pub features: Vec<String>,
}
