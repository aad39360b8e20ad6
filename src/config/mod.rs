// src/config/mod.rs
//! Configuration management

pub mod constants;
pub mod loader;
pub mod tracking_config;

pub use loader::ConfigLoader;
pub use tracking_config::{CvConfig, TrackingConfig};

use serde::{Deserialize, Serialize};

use crate::utils::validation::ValidationResult;

/// Complete configuration, one table per analysis stage
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct HdemgConfig {
    #[serde(default)]
    pub tracking: TrackingConfig,

    #[serde(default)]
    pub cv: CvConfig,
}

impl HdemgConfig {
    pub fn validate(&self) -> ValidationResult<()> {
        self.tracking.validate()?;
        self.cv.validate()
    }
}
