//! Validation utilities for hdemg-core
//!
//! Provides field-level checks used by the configuration types and by the
//! entry points of the processing stages:
//! - numeric ranges (inclusive and half-open)
//! - strictly positive and finite parameters
//! - enumerated string values
//! - array sizes
//!
//! Limits come from the constants in the config module.

use thiserror::Error;

use crate::config::constants::{cv, tracking};

/// Validation result type
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Field-level validation error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Value out of valid range
    #[error("Field '{field}' value '{value}' is out of range {lower}{min}, {max}]")]
    OutOfRange {
        field: String,
        value: String,
        min: String,
        max: String,
        lower: char,
    },
    /// Value must be finite and strictly positive
    #[error("Field '{field}' value '{value}' must be a finite positive number")]
    NotPositive { field: String, value: String },
    /// Invalid enum value
    #[error("Field '{field}' value '{value}' is invalid, valid values: [{}]", .valid_values.join(", "))]
    InvalidEnumValue {
        field: String,
        value: String,
        valid_values: Vec<String>,
    },
    /// Array size violation
    #[error("Field '{field}' has {actual} elements, expected {expected}")]
    InvalidArraySize {
        field: String,
        actual: usize,
        expected: String,
    },
    /// Cross-field validation failure
    #[error("Constraint violation for fields [{}]: {message}", .fields.join(", "))]
    ConstraintViolation { fields: Vec<String>, message: String },
}

/// Validate a value against the closed interval `[min, max]`
pub fn validate_range<T>(value: T, min: T, max: T, field: &str) -> ValidationResult<()>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    // NaN fails both comparisons, so test the accepted region
    if !(value >= min && value <= max) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
            lower: '[',
        });
    }
    Ok(())
}

/// Validate a value against the half-open interval `(min, max]`
pub fn validate_range_exclusive_min(value: f64, min: f64, max: f64, field: &str) -> ValidationResult<()> {
    if !(value > min && value <= max) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
            lower: '(',
        });
    }
    Ok(())
}

/// Validate a finite, strictly positive parameter
pub fn validate_positive(value: f64, field: &str) -> ValidationResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::NotPositive {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Validate that a string is one of the accepted values
pub fn validate_enum(value: &str, valid_values: &[&str], field: &str) -> ValidationResult<()> {
    if !valid_values.contains(&value) {
        return Err(ValidationError::InvalidEnumValue {
            field: field.to_string(),
            value: value.to_string(),
            valid_values: valid_values.iter().map(|v| v.to_string()).collect(),
        });
    }
    Ok(())
}

/// Validate a minimum array length
pub fn validate_min_len<T>(array: &[T], min_len: usize, field: &str) -> ValidationResult<()> {
    if array.len() < min_len {
        return Err(ValidationError::InvalidArraySize {
            field: field.to_string(),
            actual: array.len(),
            expected: format!(">= {}", min_len),
        });
    }
    Ok(())
}

/// Validate a sampling rate in Hz
pub fn validate_sampling_rate(fsamp: f64) -> ValidationResult<()> {
    validate_positive(fsamp, "fsamp")
}

/// Validate a similarity threshold
pub fn validate_threshold(threshold: f64) -> ValidationResult<()> {
    validate_range(
        threshold,
        tracking::MIN_THRESHOLD,
        tracking::MAX_THRESHOLD,
        "threshold",
    )
}

/// Validate the fraction of the extraction window kept after alignment
pub fn validate_final_duration(final_duration: f64) -> ValidationResult<()> {
    validate_range_exclusive_min(final_duration, 0.0, 1.0, "final_duration")
}

/// Validate a conduction-velocity search interval in m/s
pub fn validate_cv_bounds(min_cv: f64, max_cv: f64) -> ValidationResult<()> {
    validate_range(min_cv, cv::MIN_PHYSIOLOGICAL_CV, cv::MAX_PHYSIOLOGICAL_CV, "min_cv")?;
    validate_range(max_cv, cv::MIN_PHYSIOLOGICAL_CV, cv::MAX_PHYSIOLOGICAL_CV, "max_cv")?;
    if min_cv >= max_cv {
        return Err(ValidationError::ConstraintViolation {
            fields: vec!["min_cv".to_string(), "max_cv".to_string()],
            message: format!("min_cv ({}) must be lower than max_cv ({})", min_cv, max_cv),
        });
    }
    Ok(())
}
