// src/processing/mod.rs
//! MUAP template processing: extraction, alignment, similarity and
//! conduction velocity

pub mod template;
pub mod extraction;
pub mod alignment;
pub mod xcorr;
pub mod mle;
pub mod conduction;

pub use template::{FlatTemplate, SingleTrialTemplate, Template, TemplateColumn};
pub use extraction::{sta, st_muap, Extraction};
pub use alignment::{align_by_xcorr, AlignedPair};
pub use xcorr::{adjacent_channel_xcc, norm_xcorr, norm_xcorr_2d, xcc, xcc_sta, CorrelationMode};
pub use mle::{find_mle_teta, mle_cv_estimate};
pub use conduction::{
    analyze_conduction, estimate_conduction_velocity, estimate_conduction_velocity_table, CvReport,
};
