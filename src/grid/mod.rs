//! Electrode-grid signals and spatial derivation
//!
//! The grid is produced by an external sorting step (channel re-ordering per
//! electrode layout); this module only consumes it.

pub mod signal;
pub mod derivation;

pub use signal::{ColumnKey, GridColumn, GridSignal};
pub use derivation::{double_differential, single_differential, Derivation};
