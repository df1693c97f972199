//! The three-stage run: Selection -> Summarize -> Assembly.
//!
//! Data flows strictly forward. Stage 2 is the only stage that touches the
//! network (through the `ContentFetch` collaborator) and the only one that
//! runs concurrently; its output is re-sorted afterwards so scheduling
//! order never shows up in the result.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::time::Duration;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use tokio::time::Instant;

use crate::assembler::{assemble, Assembly};
use crate::config::Config;
use crate::dedup::dedup_candidates;
use crate::extractor::ContentFetch;
use crate::models::{Candidate, RawMetrics, SummarizedItem};
use crate::quality::assess_quality;
use crate::ranker::rank_candidates;
use crate::summarizer::{summarize_candidate, SummaryParts};

/// Counters and outcome of one full run. The counts preserve the funnel
/// shape for auditing: N candidates -> M extracted -> K selected.
#[derive(Debug)]
pub struct PipelineResult {
    pub candidates_found: usize,
    pub candidates_summarized: usize,
    pub outcome: Assembly,
}

/// Run all three stages over an already-collected candidate pool.
/// `delivered` is the snapshot of previously-sent URLs; `today` anchors
/// recency scoring so a run is a pure function of its inputs.
pub async fn run_pipeline<F: ContentFetch + Sync>(
    pool: Vec<Candidate>,
    delivered: &HashSet<String>,
    fetcher: &F,
    config: &Config,
    today: NaiveDate,
) -> PipelineResult {
    // Stage 1: dedup, rank, cut to the short list.
    let deduped = dedup_candidates(pool, delivered);
    let after_dedup = deduped.len();
    let ranked = rank_candidates(deduped, config.ranking.top_n, today);
    println!(
        "Stage 1: {} candidates after dedup -> keeping top {}",
        after_dedup,
        ranked.len()
    );

    if ranked.is_empty() {
        return PipelineResult {
            candidates_found: 0,
            candidates_summarized: 0,
            outcome: Assembly::Skip("No candidates found from any source.".to_string()),
        };
    }

    // Stage 2: summarize everything that survived the cut.
    let summarized = summarize_candidates(
        ranked,
        fetcher,
        config.summarize.workers,
        Duration::from_secs(config.summarize.time_budget_secs),
    )
    .await;
    let candidates_found = summarized.len();
    let candidates_summarized = summarized.iter().filter(|s| s.extraction_success).count();

    // Stage 3: quality gate.
    let outcome = assemble(summarized, &config.assembly);

    PipelineResult {
        candidates_found,
        candidates_summarized,
        outcome,
    }
}

/// Stage 2: fetch, summarize, and score each candidate independently.
/// Output length always equals input length; a candidate that fails or
/// runs past the shared deadline becomes a zero-quality item instead of
/// disappearing or aborting the batch.
pub async fn summarize_candidates<F: ContentFetch + Sync>(
    candidates: Vec<Candidate>,
    fetcher: &F,
    workers: usize,
    time_budget: Duration,
) -> Vec<SummarizedItem> {
    let total = candidates.len();
    let deadline = Instant::now() + time_budget;
    let done = AtomicUsize::new(0);
    let done = &done;

    let mut items: Vec<SummarizedItem> = stream::iter(candidates)
        .map(|candidate| async move {
            let item = match tokio::time::timeout_at(deadline, fetch_and_summarize(&candidate, fetcher))
                .await
            {
                Ok(parts) => finish_item(candidate, parts),
                Err(_) => SummarizedItem::extraction_failed(candidate),
            };

            let i = done.fetch_add(1, AtomicOrdering::Relaxed) + 1;
            let status = if item.extraction_success {
                format!("q={:.2}", item.overall_quality())
            } else {
                "extraction failed".to_string()
            };
            println!(
                "Stage 2: [{}/{}] {} ({})",
                i,
                total,
                ellipsize(&item.candidate.title, 55),
                status
            );
            item
        })
        .buffer_unordered(workers.max(1))
        .collect()
        .await;

    // Deterministic final order regardless of completion order.
    items.sort_by(|a, b| {
        b.overall_quality()
            .partial_cmp(&a.overall_quality())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                b.candidate
                    .potential_score
                    .partial_cmp(&a.candidate.potential_score)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then_with(|| a.candidate.url.cmp(&b.candidate.url))
    });
    items
}

async fn fetch_and_summarize<F: ContentFetch + Sync>(
    candidate: &Candidate,
    fetcher: &F,
) -> SummaryParts {
    match &candidate.metrics {
        RawMetrics::HackerNews { story_id, .. } => {
            let article = fetcher.article_text(&candidate.url).await;
            let comments = if article.is_some() {
                fetcher.discussion(*story_id).await
            } else {
                Vec::new()
            };
            summarize_candidate(candidate, article.as_deref(), &comments)
        }
        // arXiv summaries come from the stored abstract; no fetch needed.
        RawMetrics::Arxiv { .. } => summarize_candidate(candidate, None, &[]),
    }
}

fn finish_item(candidate: Candidate, parts: SummaryParts) -> SummarizedItem {
    let quality = assess_quality(
        &parts.executive_summary,
        &candidate.title,
        &parts.significance,
        &candidate.url,
        parts.discussion_synthesis.as_deref(),
        parts.extraction_success,
    );
    SummarizedItem {
        candidate,
        extraction_success: parts.extraction_success,
        executive_summary: parts.executive_summary,
        significance: parts.significance,
        discussion_synthesis: parts.discussion_synthesis,
        quality,
    }
}

fn ellipsize(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
