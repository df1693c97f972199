//! Stage-1 potential ranking: one scoring formula per source, all normalized
//! to roughly [0, 100] and monotonic nondecreasing in every raw signal.

use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::models::{Candidate, RawMetrics};

// arXiv signal weights, shared with the adapter's traction enrichment.
const WEIGHT_HN_MENTION: f64 = 30.0;
const WEIGHT_GITHUB: f64 = 20.0;
const WEIGHT_CITATIONS: f64 = 25.0;

/// Assign a potential score to every candidate, sort descending, and keep
/// the top N. Truncation happens only after the full pool is ranked, so a
/// uniformly strong source may dominate the cut. The sort is stable: equal
/// scores keep the incoming source-priority order.
pub fn rank_candidates(
    mut candidates: Vec<Candidate>,
    top_n: usize,
    today: NaiveDate,
) -> Vec<Candidate> {
    for candidate in &mut candidates {
        candidate.potential_score = Some(potential_score(candidate, today));
    }
    candidates.sort_by(|a, b| {
        b.potential_score
            .partial_cmp(&a.potential_score)
            .unwrap_or(Ordering::Equal)
    });
    candidates.truncate(top_n);
    candidates
}

fn potential_score(candidate: &Candidate, today: NaiveDate) -> f64 {
    let score = match &candidate.metrics {
        RawMetrics::HackerNews {
            points, comments, ..
        } => hn_potential(*points, *comments),
        RawMetrics::Arxiv {
            published,
            hn_mentioned,
            hn_points,
            github_repos,
            influential_citations,
            ..
        } => arxiv_potential(
            *published,
            *hn_mentioned,
            *hn_points,
            github_repos.len(),
            *influential_citations,
            today,
        ),
    };
    (score * 100.0).round() / 100.0
}

/// Popularity plus discussion depth. The depth term uses the smaller of
/// points and comments: heavy discussion on a barely-upvoted story (or the
/// reverse) earns less than balanced engagement, and the term stays
/// monotone in both signals.
fn hn_potential(points: u32, comments: u32) -> f64 {
    let points = points as f64;
    let comments = comments as f64;

    let mut score = (points / 50.0).min(3.0) * 20.0;
    score += (comments / 50.0).min(2.0) * 10.0;
    score += (points.min(comments) / 50.0).min(1.0) * 10.0;
    score
}

/// External traction when it exists; with no traction at all the score is
/// the recency bonus alone, so fresh papers stay visible.
fn arxiv_potential(
    published: NaiveDate,
    hn_mentioned: bool,
    hn_points: u32,
    github_repo_count: usize,
    influential_citations: u32,
    today: NaiveDate,
) -> f64 {
    let mut score = 0.0;

    if hn_mentioned {
        score += WEIGHT_HN_MENTION * (hn_points as f64 / 100.0).clamp(1.0, 2.0);
    }
    if github_repo_count > 0 {
        score += WEIGHT_GITHUB * (github_repo_count as f64).min(2.0);
    }
    score += WEIGHT_CITATIONS * (influential_citations as f64 / 5.0).min(2.0);

    score += recency_bonus(published, today);
    score
}

fn recency_bonus(published: NaiveDate, today: NaiveDate) -> f64 {
    let age_days = (today - published).num_days();
    if age_days <= 3 {
        10.0
    } else if age_days <= 7 {
        5.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::{arxiv_candidate, hn_candidate};
    use crate::models::Source;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 1).unwrap()
    }

    #[test]
    fn test_hn_monotonic_in_points_and_comments() {
        // A dominates B in every signal, so its score can't be lower.
        let cases = [
            ((200u32, 100u32), (150u32, 100u32)),
            ((51, 50), (50, 50)),
            ((500, 10), (499, 10)),
            ((30, 60), (30, 59)),
        ];
        for ((pa, ca), (pb, cb)) in cases {
            assert!(
                hn_potential(pa, ca) >= hn_potential(pb, cb),
                "({}, {}) scored below ({}, {})",
                pa,
                ca,
                pb,
                cb
            );
        }
    }

    #[test]
    fn test_hn_rewards_discussion_depth() {
        let shallow = hn_potential(200, 5);
        let deep = hn_potential(200, 120);
        assert!(deep > shallow);
    }

    #[test]
    fn test_arxiv_monotonic_in_each_signal() {
        let day = NaiveDate::from_ymd_opt(2026, 7, 30).unwrap();
        assert!(
            arxiv_potential(day, true, 200, 1, 3, today())
                >= arxiv_potential(day, true, 100, 1, 3, today())
        );
        assert!(
            arxiv_potential(day, true, 100, 2, 3, today())
                >= arxiv_potential(day, true, 100, 1, 3, today())
        );
        assert!(
            arxiv_potential(day, true, 100, 1, 5, today())
                >= arxiv_potential(day, true, 100, 1, 3, today())
        );
    }

    #[test]
    fn test_arxiv_recency_baseline_for_untracked_papers() {
        let fresh = NaiveDate::from_ymd_opt(2026, 7, 31).unwrap();
        let stale = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let fresh_score = arxiv_potential(fresh, false, 0, 0, 0, today());
        assert!(fresh_score > 0.0, "new papers must not be invisible");
        assert_eq!(arxiv_potential(stale, false, 0, 0, 0, today()), 0.0);
    }

    #[test]
    fn test_rank_truncates_after_full_ranking() {
        // Fifty stories with descending scores 500, 490, ... and a floor of
        // 20 points; the ranker keeps exactly the top 15, sorted.
        let candidates: Vec<_> = (0..50)
            .map(|i| {
                hn_candidate(
                    &format!("https://news.example/{}", i),
                    (500 - i * 10).max(20) as u32,
                    30,
                )
            })
            .collect();
        let ranked = rank_candidates(candidates, 15, today());

        assert_eq!(ranked.len(), 15);
        let scores: Vec<f64> = ranked
            .iter()
            .map(|c| c.potential_score.unwrap())
            .collect();
        let mut sorted = scores.clone();
        sorted.sort_by(|a, b| b.partial_cmp(a).unwrap());
        assert_eq!(scores, sorted);
        for candidate in &ranked {
            match &candidate.metrics {
                RawMetrics::HackerNews { points, .. } => assert!(*points >= 20),
                _ => unreachable!(),
            }
        }
    }

    #[test]
    fn test_equal_scores_keep_source_priority_order() {
        // Zero-signal candidates from both sources tie at 0; the HN one
        // entered first and must stay first.
        let old = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let candidates = vec![
            hn_candidate("https://a.com", 0, 0),
            arxiv_candidate("https://b.com", old),
        ];
        let ranked = rank_candidates(candidates, 10, today());
        assert_eq!(ranked[0].source, Source::HackerNews);
        assert_eq!(ranked[0].potential_score, ranked[1].potential_score);
    }

    #[test]
    fn test_scores_are_assigned_to_all_survivors() {
        let candidates = vec![hn_candidate("https://a.com", 120, 40)];
        let ranked = rank_candidates(candidates, 5, today());
        assert!(ranked[0].potential_score.is_some());
    }
}
