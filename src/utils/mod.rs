//! Common utility functions for hdemg-core
//!
//! - Field validation helpers shared by configuration and processing
//! - Time, sample and velocity conversions
//!
//! Limits and unit factors live in the config constants module.

pub mod validation;
pub mod conversion;

pub use validation::{
    validate_range,
    validate_positive,
    validate_enum,
    validate_threshold,
    validate_final_duration,
    validate_sampling_rate,
    ValidationError,
    ValidationResult,
};

pub use conversion::{
    ms_to_samples,
    window_samples,
    fraction_of_length,
    delay_to_velocity,
    velocity_to_delay,
    WindowSamples,
};
