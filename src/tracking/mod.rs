// src/tracking/mod.rs
//! Cross-recording MU tracking

pub mod engine;
pub mod matching;
pub mod parallel;
pub mod result;
pub mod duplicates;

pub use engine::{track, TemplateSource};
pub use matching::{apply_threshold, greedy_filter, Candidate};
pub use parallel::{ExecutionMode, ParallelEvaluator};
pub use result::{Inclusion, TrackingMatch, TrackingResult};
pub use duplicates::{
    duplicate_config, remove_duplicates_between, remove_duplicates_from_result, DuplicateCriterion,
    DuplicateRemoval,
};
