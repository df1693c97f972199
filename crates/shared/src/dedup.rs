//! Candidate deduplication: drop anything already delivered in a previous
//! run, then collapse intra-batch duplicates.

use std::collections::HashSet;

use crate::models::Candidate;

/// Pure filter over the incoming batch. `delivered` is a snapshot of
/// previously-delivered URLs read once per run. Within the batch, the first
/// occurrence in source-priority order wins; the stable sort keeps
/// ingestion order inside each source. Running this twice is a no-op.
pub fn dedup_candidates(
    mut candidates: Vec<Candidate>,
    delivered: &HashSet<String>,
) -> Vec<Candidate> {
    candidates.sort_by_key(|c| c.source.priority());

    let mut seen: HashSet<String> = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| !delivered.contains(&c.url) && seen.insert(c.url.clone()))
        .collect()
}
