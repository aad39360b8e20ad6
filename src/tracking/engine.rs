//! MU tracking between two recordings
//!
//! One call runs four phases: template extraction (skipped for provided
//! templates), the all-against-all comparison on the worker pool, the
//! threshold, and the optional greedy filter.

use tracing::{debug, info};

use crate::config::TrackingConfig;
use crate::diagnostics::{DataQualityWarning, Diagnostics, RecordingSide};
use crate::error::{EmgErrorBuilder, EmgResult, ProcessingStage};
use crate::processing::alignment::align_by_xcorr;
use crate::processing::extraction::sta;
use crate::processing::template::Template;
use crate::processing::xcorr::xcc;
use crate::recording::EmgRecording;
use crate::tracking::matching::{apply_threshold, greedy_filter, sort_unfiltered, Candidate};
use crate::tracking::parallel::{ExecutionMode, ParallelEvaluator};
use crate::tracking::result::{Inclusion, TrackingMatch, TrackingResult};

/// Where the compared templates come from
#[derive(Debug, Clone)]
pub enum TemplateSource<'a> {
    /// Extract STAs from both recordings, then align every pair
    Computed {
        first: &'a EmgRecording,
        second: &'a EmgRecording,
    },
    /// Externally computed templates, compared as given
    ///
    /// Exactly two collections are accepted. Every template needs at least
    /// one valid channel.
    Provided(Vec<Vec<Template>>),
}

/// Templates of both recordings, ready for comparison
struct ResolvedTemplates {
    first: Vec<Template>,
    second: Vec<Template>,
    align: bool,
    diagnostics: Diagnostics,
}

fn resolve(source: TemplateSource<'_>, config: &TrackingConfig) -> EmgResult<ResolvedTemplates> {
    match source {
        TemplateSource::Computed { first, second } => {
            if first.fsamp() != second.fsamp() {
                return Err(EmgErrorBuilder::new("tracking", "resolve").mismatch(
                    "recording pair",
                    "recordings must share the sampling rate",
                    first.fsamp(),
                    second.fsamp(),
                ));
            }

            let mut diagnostics = Diagnostics::new();
            let mut extract = |recording: &EmgRecording| -> EmgResult<Vec<Template>> {
                let derived = config.derivation.apply(recording.grid())?;
                let extraction = sta(
                    &derived,
                    recording.firings(),
                    recording.fsamp(),
                    config.extraction_window_ms(),
                    &config.firings,
                )?;
                diagnostics.extend(extraction.diagnostics);
                Ok(extraction.templates)
            };
            let first = extract(first)?;
            let second = extract(second)?;

            debug!(derivation = %config.derivation, "extracted templates");
            Ok(ResolvedTemplates {
                first,
                second,
                align: true,
                diagnostics,
            })
        }
        TemplateSource::Provided(sets) => {
            let count = sets.len();
            let mut sets = sets.into_iter();
            match (sets.next(), sets.next(), count) {
                (Some(first), Some(second), 2) => {
                    check_provided(&first, RecordingSide::First)?;
                    check_provided(&second, RecordingSide::Second)?;
                    Ok(ResolvedTemplates {
                        first,
                        second,
                        align: false,
                        diagnostics: Diagnostics::new(),
                    })
                }
                _ => Err(EmgErrorBuilder::new("tracking", "resolve").configuration(
                    "custom_muaps",
                    format!("{} template collections", count),
                    "exactly two template collections are required",
                )),
            }
        }
    }
}

/// Provided templates are compared as given, so none may be degenerate
fn check_provided(templates: &[Template], side: RecordingSide) -> EmgResult<()> {
    match templates
        .iter()
        .position(|t| t.is_inert() || t.n_valid_channels() == 0)
    {
        Some(mu) => Err(EmgErrorBuilder::new("tracking", "resolve")
            .info("recording", side.to_string())
            .info("mu", mu.to_string())
            .computation(ProcessingStage::Similarity, "provided template has no valid channel")),
        None => Ok(()),
    }
}

/// MUs whose templates can be compared; the others are reported
fn usable_mus(templates: &[Template], side: RecordingSide, diagnostics: &mut Diagnostics) -> Vec<usize> {
    templates
        .iter()
        .enumerate()
        .filter_map(|(mu, template)| {
            if template.is_inert() || template.n_valid_channels() == 0 {
                diagnostics.push(DataQualityWarning::SkippedTemplate { recording: side, mu });
                None
            } else {
                Some(mu)
            }
        })
        .collect()
}

/// Compare one MU of the first recording against every MU of the second
fn compare_one_against_all(
    mu_first: usize,
    first: &Template,
    second: &[Template],
    candidates: &[usize],
    align: bool,
    final_duration: f64,
) -> EmgResult<Vec<Candidate>> {
    candidates
        .iter()
        .map(|&mu_second| -> EmgResult<Candidate> {
            let other = &second[mu_second];
            let similarity = if align {
                let pair = align_by_xcorr(first, other, final_duration)?;
                xcc(&pair.first, &pair.second)?
            } else {
                xcc(first, other)?
            };
            Ok(Candidate {
                mu_first,
                mu_second,
                xcc: similarity,
            })
        })
        .collect()
}

/// Track MUs across two recordings
///
/// Every pair of usable MUs is scored by template similarity. Pairs below
/// `threshold` are dropped when `exclude_below_threshold` is set, and with
/// `filter` the rest is reduced to at most one match per MU on each side.
/// No pair above threshold is a valid, empty result.
pub fn track(source: TemplateSource<'_>, config: &TrackingConfig) -> EmgResult<TrackingResult> {
    config.validate()?;

    let ResolvedTemplates {
        first,
        second,
        align,
        mut diagnostics,
    } = resolve(source, config)?;

    let active_first = usable_mus(&first, RecordingSide::First, &mut diagnostics);
    let active_second = usable_mus(&second, RecordingSide::Second, &mut diagnostics);

    info!(
        first = active_first.len(),
        second = active_second.len(),
        align,
        "comparing MUs"
    );

    let evaluator = ParallelEvaluator::new(ExecutionMode::from_config(config));
    let per_task = evaluator.run(active_first.len(), |task| {
        let mu = active_first[task];
        compare_one_against_all(mu, &first[mu], &second, &active_second, align, config.final_duration)
    })?;

    let candidates: Vec<Candidate> = per_task.into_iter().flatten().collect();
    let total = candidates.len();
    let mut kept = apply_threshold(candidates, config.threshold, config.exclude_below_threshold);
    debug!(total, above_threshold = kept.len(), "threshold applied");

    if config.filter {
        kept = greedy_filter(kept);
    } else {
        sort_unfiltered(&mut kept);
    }

    let matches = kept
        .into_iter()
        .map(|c| TrackingMatch {
            mu_first: c.mu_first,
            mu_second: c.mu_second,
            xcc: c.xcc,
            inclusion: Inclusion::Included,
        })
        .collect::<Vec<_>>();

    info!(matches = matches.len(), "tracking finished");
    Ok(TrackingResult::new(matches, diagnostics))
}
