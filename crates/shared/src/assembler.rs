//! Stage 3: quality-gate the summarized pool down to the final batch.

use serde::Deserialize;

use crate::config::AssemblyConfig;
use crate::models::SummarizedItem;

/// What to do when fewer than `min_items` clear the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Relax the threshold by `fallback_step` once and re-filter the same
    /// Stage-2 output. No cascade, no re-fetch.
    LowerThreshold,
    /// Deliver nothing today. Quality over quantity; this is success.
    #[default]
    Skip,
    /// Deliver a short note acknowledging a light-content day.
    Note,
}

/// The final ordered set, size 0 or within [min_items, max_items].
#[derive(Debug, Clone)]
pub struct SelectionBatch {
    pub items: Vec<SummarizedItem>,
}

/// Terminal outcome of a run. All three variants are success states.
#[derive(Debug, Clone)]
pub enum Assembly {
    Deliver(SelectionBatch),
    Note(String),
    Skip(String),
}

impl Assembly {
    pub fn selected_count(&self) -> usize {
        match self {
            Assembly::Deliver(batch) => batch.items.len(),
            _ => 0,
        }
    }
}

/// Sort by overall quality and apply the threshold and count policy.
/// A batch of 1 or 2 is never a terminal state: either the fallback raises
/// the count to `min_items` or the run drops to zero items.
pub fn assemble(mut summarized: Vec<SummarizedItem>, config: &AssemblyConfig) -> Assembly {
    summarized.sort_by(|a, b| {
        b.overall_quality()
            .partial_cmp(&a.overall_quality())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let selected = select_above(&summarized, config.quality_threshold, config.max_items);
    println!(
        "Stage 3: {} summarized -> {} above quality {:.2}",
        summarized.len(),
        selected.len(),
        config.quality_threshold
    );

    if selected.len() >= config.min_items {
        return Assembly::Deliver(SelectionBatch { items: selected });
    }

    match config.fallback {
        FallbackPolicy::LowerThreshold => {
            let relaxed = config.quality_threshold - config.fallback_step;
            let reselected = select_above(&summarized, relaxed, config.max_items);
            println!(
                "Stage 3: relaxed threshold to {:.2} -> {} items",
                relaxed,
                reselected.len()
            );
            if reselected.len() >= config.min_items {
                Assembly::Deliver(SelectionBatch { items: reselected })
            } else {
                Assembly::Skip(skip_reason(reselected.len(), config))
            }
        }
        FallbackPolicy::Skip => Assembly::Skip(skip_reason(selected.len(), config)),
        FallbackPolicy::Note => Assembly::Note(format!(
            "A light day: only {} of today's stories met the quality bar, \
             below the minimum of {}. Back tomorrow with more.",
            selected.len(),
            config.min_items
        )),
    }
}

fn select_above(
    summarized: &[SummarizedItem],
    threshold: f64,
    max_items: usize,
) -> Vec<SummarizedItem> {
    summarized
        .iter()
        .filter(|s| s.overall_quality() >= threshold)
        .take(max_items)
        .cloned()
        .collect()
}

fn skip_reason(selected: usize, config: &AssemblyConfig) -> String {
    format!(
        "Only {} items met quality threshold (need {}). Skipping delivery — quality over quantity.",
        selected, config.min_items
    )
}
