// src/error.rs
//! Unified error handling for hdemg-core
//!
//! Every fallible operation in the crate returns [`EmgResult`]. Errors fall
//! into three families:
//!
//! - configuration errors, raised before any heavy computation starts
//! - invalid input data (shape mismatches, malformed firing trains)
//! - computation errors, raised where a numeric result cannot be produced
//!
//! Non-fatal data-quality issues are not errors; they travel in
//! [`crate::diagnostics::Diagnostics`].

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::validation::ValidationError;

/// Unified error type for the entire crate
#[derive(Debug, Clone, Error)]
pub enum EmgError {
    /// Invalid configuration value
    #[error("[CONFIG] Invalid value '{value}' for '{parameter}': {reason} ({})", .context.operation)]
    Configuration {
        parameter: String,
        value: String,
        reason: String,
        context: ErrorContext,
    },

    /// A numeric stage could not produce a result
    #[error("[COMPUTATION] {stage} stage error: {reason} ({})", .context.operation)]
    Computation {
        stage: ProcessingStage,
        reason: String,
        context: ErrorContext,
    },

    /// Input data violates a structural invariant
    #[error("[DATA] Invalid {data_type}: {reason}{} ({})", format_expectation(.expected, .actual), .context.operation)]
    InvalidData {
        data_type: String,
        reason: String,
        expected: Option<String>,
        actual: Option<String>,
        context: ErrorContext,
    },

    /// Field-level validation failure
    #[error("[VALIDATION] {0}")]
    Validation(#[from] ValidationError),

    /// The worker pool could not be created
    #[error("[POOL] Worker pool error: {reason}")]
    ThreadPool { reason: String },

    /// Filesystem failure while loading or exporting configuration
    #[error("[IO] {reason} ({path})")]
    Io { path: String, reason: String },

    /// Configuration file could not be parsed or serialized
    #[error("[PARSE] {reason}")]
    Parse { reason: String },
}

fn format_expectation(expected: &Option<String>, actual: &Option<String>) -> String {
    match (expected, actual) {
        (Some(exp), Some(act)) => format!(" (expected: {}, got: {})", exp, act),
        _ => String::new(),
    }
}

/// Processing stages for error tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingStage {
    Derivation,
    TemplateExtraction,
    Alignment,
    Similarity,
    Tracking,
    ConductionVelocity,
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessingStage::Derivation => "DERIVATION",
            ProcessingStage::TemplateExtraction => "TEMPLATE-EXTRACTION",
            ProcessingStage::Alignment => "ALIGNMENT",
            ProcessingStage::Similarity => "SIMILARITY",
            ProcessingStage::Tracking => "TRACKING",
            ProcessingStage::ConductionVelocity => "CONDUCTION-VELOCITY",
        };
        write!(f, "{}", name)
    }
}

/// Error context for debugging and analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub component: String,
    pub operation: String,
    pub additional_info: HashMap<String, String>,
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            component: component.to_string(),
            operation: operation.to_string(),
            additional_info: HashMap::new(),
        }
    }
}

impl EmgError {
    /// Context attached to the error, if the variant carries one
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            EmgError::Configuration { context, .. }
            | EmgError::Computation { context, .. }
            | EmgError::InvalidData { context, .. } => Some(context),
            _ => None,
        }
    }

    /// True for errors raised by configuration checks
    pub fn is_configuration(&self) -> bool {
        matches!(self, EmgError::Configuration { .. } | EmgError::Validation(_))
    }

    /// True for errors raised inside a numeric stage
    pub fn is_computation(&self) -> bool {
        matches!(self, EmgError::Computation { .. })
    }
}

/// Result type alias for crate operations
pub type EmgResult<T> = Result<T, EmgError>;

/// Error builder for convenient error construction
pub struct EmgErrorBuilder {
    component: String,
    operation: String,
    info: HashMap<String, String>,
}

impl EmgErrorBuilder {
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            component: component.to_string(),
            operation: operation.to_string(),
            info: HashMap::new(),
        }
    }

    /// Attach a key/value pair to the context of the built error
    pub fn info<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.info.insert(key.into(), value.into());
        self
    }

    fn context(&self) -> ErrorContext {
        let mut context = ErrorContext::new(&self.component, &self.operation);
        context.additional_info = self.info.clone();
        context
    }

    pub fn configuration(self, parameter: &str, value: impl fmt::Display, reason: &str) -> EmgError {
        EmgError::Configuration {
            parameter: parameter.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
            context: self.context(),
        }
    }

    pub fn computation(self, stage: ProcessingStage, reason: &str) -> EmgError {
        EmgError::Computation {
            stage,
            reason: reason.to_string(),
            context: self.context(),
        }
    }

    pub fn invalid_data(self, data_type: &str, reason: &str) -> EmgError {
        EmgError::InvalidData {
            data_type: data_type.to_string(),
            reason: reason.to_string(),
            expected: None,
            actual: None,
            context: self.context(),
        }
    }

    pub fn mismatch(
        self,
        data_type: &str,
        reason: &str,
        expected: impl fmt::Display,
        actual: impl fmt::Display,
    ) -> EmgError {
        EmgError::InvalidData {
            data_type: data_type.to_string(),
            reason: reason.to_string(),
            expected: Some(expected.to_string()),
            actual: Some(actual.to_string()),
            context: self.context(),
        }
    }
}
