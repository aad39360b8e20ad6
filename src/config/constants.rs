//! System-wide configuration constants

/// Unit conversion factors
pub mod units {
    pub const MILLISECONDS_PER_SECOND: f64 = 1_000.0;
    pub const MILLIMETERS_PER_METER: f64 = 1_000.0;
}

/// Grid signal constants
pub mod grid {
    /// Rows removed from every column by one differential step
    pub const ROWS_PER_DIFFERENTIAL: usize = 1;
    /// Prefix used when column keys are generated from an index
    pub const COLUMN_KEY_PREFIX: &str = "col";
}

/// Tracking defaults and limits
pub mod tracking {
    pub const DEFAULT_TIMEWINDOW_MS: f64 = 50.0;
    pub const DEFAULT_THRESHOLD: f64 = 0.8;
    pub const DEFAULT_FINAL_DURATION: f64 = 0.5;
    pub const MIN_THRESHOLD: f64 = 0.0;
    pub const MAX_THRESHOLD: f64 = 1.0;
    /// The extraction window is this many times the tracking window
    pub const EXTRACTION_WINDOW_FACTOR: f64 = 2.0;
    /// Duplicate removal uses a stricter threshold than tracking
    pub const DEFAULT_DUPLICATE_THRESHOLD: f64 = 0.9;
}

/// Conduction velocity estimation constants
pub mod cv {
    pub const MIN_PHYSIOLOGICAL_CV: f64 = 0.5;
    pub const MAX_PHYSIOLOGICAL_CV: f64 = 20.0;
    pub const DEFAULT_MIN_CV: f64 = 1.0;
    pub const DEFAULT_MAX_CV: f64 = 10.0;
    pub const DEFAULT_INTER_ELECTRODE_DISTANCE_MM: f64 = 8.0;
    /// Grid resolution of the coarse delay search, in samples
    pub const DEFAULT_COARSE_STEP_SAMPLES: f64 = 0.05;
    pub const DEFAULT_MAX_ITERATIONS: usize = 100;
    pub const DEFAULT_TOLERANCE_SAMPLES: f64 = 1e-6;
    /// Backtracking halvings allowed per Newton step
    pub const MAX_STEP_HALVINGS: usize = 30;
    pub const MIN_CHANNELS: usize = 2;
}

/// Configuration file discovery
pub mod paths {
    pub const DEFAULT_CONFIG_FILE: &str = "hdemg.toml";
    pub const LOCAL_CONFIG_FILE: &str = "hdemg.local.toml";
    pub const CONFIG_DIR_ENV: &str = "HDEMG_CONFIG_DIR";
}
