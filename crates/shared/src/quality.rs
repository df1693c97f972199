//! Quality scoring for summarized items.
//!
//! Four independent sub-scores in [0, 1]; `overall()` combines them with
//! fixed weights. The assembler's threshold is calibrated against these
//! weights, so changing them means re-tuning the threshold.

use crate::summarizer::{split_sentences, GENERIC_SIGNIFICANCE};

pub const WEIGHT_COHERENCE: f64 = 0.3;
pub const WEIGHT_SIGNIFICANCE: f64 = 0.3;
pub const WEIGHT_DISCUSSION: f64 = 0.2;
pub const WEIGHT_COMPLETENESS: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct QualityScore {
    pub extraction_success: bool,
    pub coherence: f64,
    pub completeness: f64,
    pub significance_accuracy: f64,
    pub discussion_quality: f64,
}

impl QualityScore {
    /// Weighted combination of the sub-scores. Always 0 when extraction
    /// failed, whatever the sub-scores say.
    pub fn overall(&self) -> f64 {
        if !self.extraction_success {
            return 0.0;
        }
        self.coherence * WEIGHT_COHERENCE
            + self.significance_accuracy * WEIGHT_SIGNIFICANCE
            + self.discussion_quality * WEIGHT_DISCUSSION
            + self.completeness * WEIGHT_COMPLETENESS
    }

    pub fn failed() -> Self {
        Self {
            extraction_success: false,
            coherence: 0.0,
            completeness: 0.0,
            significance_accuracy: 0.0,
            discussion_quality: 0.0,
        }
    }
}

/// Score all four dimensions for a produced summary.
pub fn assess_quality(
    summary: &str,
    title: &str,
    significance: &str,
    url: &str,
    discussion_synthesis: Option<&str>,
    extraction_success: bool,
) -> QualityScore {
    if !extraction_success {
        return QualityScore::failed();
    }
    QualityScore {
        extraction_success: true,
        coherence: score_coherence(summary),
        completeness: score_completeness(summary, title, url),
        significance_accuracy: score_significance_accuracy(significance),
        discussion_quality: score_discussion_quality(discussion_synthesis),
    }
}

const SUBSTANTIVE_WORDS: &[&str] = &[
    "found",
    "shows",
    "enables",
    "introduces",
    "built",
    "developed",
    "research",
    "approach",
    "system",
    "method",
    "results",
    "performance",
    "users",
    "data",
    "model",
];

/// Sentence flow and readability of the executive summary.
fn score_coherence(summary: &str) -> f64 {
    if summary.is_empty() {
        return 0.0;
    }

    let mut score = 0.0;

    // Multiple sentences read as a narrative; fragments don't.
    let sentences: Vec<&str> = split_sentences(summary)
        .into_iter()
        .filter(|s| s.trim().len() > 10)
        .collect();
    if sentences.len() >= 2 {
        score += 0.3;
    } else if sentences.len() == 1 {
        score += 0.15;
    }

    let len = summary.len();
    if (80..=400).contains(&len) {
        score += 0.25;
    } else if len > 400 {
        score += 0.1;
    }

    // Truncation artifacts: summaries that stop mid-sentence.
    let trimmed = summary.trim_end();
    if trimmed.ends_with('.') || trimmed.ends_with('!') || trimmed.ends_with('?') {
        score += 0.15;
    } else if trimmed.ends_with("...") {
        score += 0.05;
    }

    let lower = summary.to_lowercase();
    let matches = SUBSTANTIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();
    score += (matches as f64 * 0.05).min(0.2);

    // HTML residue means extraction leaked markup into the prose.
    if !summary.contains('<') && !summary.contains("&amp;") {
        score += 0.1;
    }

    score.min(1.0)
}

const EXPLANATORY_WORDS: &[&str] = &[
    "because", "by", "through", "using", "which", "that", "allows", "enables", "means", "results",
];

const DOMAIN_STOPWORDS: &[&str] = &["github", "com", "www", "blog"];

/// Does the summary cover the article's stated main point?
fn score_completeness(summary: &str, title: &str, url: &str) -> f64 {
    if summary.is_empty() {
        return 0.0;
    }

    let mut score: f64 = 0.0;
    let summary_lower = summary.to_lowercase();
    let title_lower = title.to_lowercase();

    let title_words: Vec<&str> = title_lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 3)
        .collect();
    if !title_words.is_empty() {
        let overlap = title_words
            .iter()
            .filter(|w| summary_lower.contains(*w))
            .count();
        score += (overlap as f64 / title_words.len() as f64).min(1.0) * 0.4;
    }

    // Host keywords appearing in the text are weak evidence we extracted
    // the right page.
    if let Ok(parsed) = url::Url::parse(url) {
        if let Some(host) = parsed.host_str() {
            let host_keywords: Vec<&str> = host
                .split(|c: char| c == '.' || c == '-')
                .filter(|k| k.len() > 3 && !DOMAIN_STOPWORDS.contains(k))
                .collect();
            if !host_keywords.is_empty() {
                let overlap = host_keywords
                    .iter()
                    .filter(|k| summary_lower.contains(*k))
                    .count();
                score += (overlap as f64 / host_keywords.len() as f64).min(1.0) * 0.15;
            }
        }
    }

    // Explanatory content beyond a title restatement.
    if summary.len() > title.len() * 3 / 2 {
        score += 0.3;
    }
    if EXPLANATORY_WORDS
        .iter()
        .any(|w| summary_lower.split_whitespace().any(|t| t.trim_matches(|c: char| !c.is_alphanumeric()) == *w))
    {
        score += 0.2;
    }
    if summary.chars().any(|c| c.is_ascii_digit()) {
        score += 0.1;
    }

    // A summary with none of the title's key terms is probably the wrong
    // content (nav chrome, cookie banner, unrelated page).
    if title_words.len() >= 2 {
        let key_matches = title_words
            .iter()
            .take(3)
            .filter(|w| summary_lower.contains(*w))
            .count();
        if key_matches == 0 {
            score = (score - 0.5).max(0.0);
        }
    }

    score.min(1.0)
}

const SIGNIFICANCE_CATEGORIES: &[&str] = &[
    "privacy",
    "security",
    "ai/ml",
    "infrastructure",
    "market",
    "open source",
    "research",
    "preservation",
    "media",
];

/// Is the significance line specific and evidence-backed, or the generic
/// fallback?
fn score_significance_accuracy(significance: &str) -> f64 {
    if significance.is_empty() {
        return 0.0;
    }

    let sig_lower = significance.to_lowercase();
    if sig_lower.contains(GENERIC_SIGNIFICANCE) {
        return 0.15;
    }

    let mut score: f64 = 0.3;

    if SIGNIFICANCE_CATEGORIES.iter().any(|c| sig_lower.contains(c)) {
        score += 0.3;
    }
    if ["your", "relevant", "impact", "affects"]
        .iter()
        .any(|w| sig_lower.contains(w))
    {
        score += 0.2;
    }
    if (30..=200).contains(&significance.len()) {
        score += 0.2;
    }

    score.min(1.0)
}

const INSIGHT_SIGNALS: &[&str] = &[
    "pointed out",
    "noted",
    "argued",
    "explained",
    "experience",
    "production",
    "worked on",
    "built",
];

const SENTIMENT_WORDS: &[&str] = &["positive", "negative", "mixed", "concerns", "enthusiasm"];

/// Specificity of the discussion synthesis. 0 when there is no discussion
/// attached: the sub-score measures what the synthesis adds, and nothing
/// adds nothing.
fn score_discussion_quality(synthesis: Option<&str>) -> f64 {
    let synthesis = match synthesis {
        Some(s) if !s.is_empty() => s,
        _ => return 0.0,
    };

    let mut score: f64 = 0.0;
    let lower = synthesis.to_lowercase();

    if lower.contains("discussed") || lower.contains("debate") || lower.contains("commenters") {
        score += 0.2;
    }
    if INSIGHT_SIGNALS.iter().any(|s| lower.contains(s)) {
        score += 0.25;
    }
    if split_sentences(synthesis).len() >= 2 {
        score += 0.2;
    }
    if SENTIMENT_WORDS.iter().any(|w| lower.contains(w)) {
        score += 0.15;
    }
    if (50..=400).contains(&synthesis.len()) {
        score += 0.2;
    }

    score.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_SUMMARY: &str = "Researchers found that the new caching system cuts query latency by 40 percent. The approach works by precomputing index shards, which enables lookups without disk access.";

    #[test]
    fn test_overall_is_zero_when_extraction_failed() {
        let q = QualityScore {
            extraction_success: false,
            coherence: 1.0,
            completeness: 1.0,
            significance_accuracy: 1.0,
            discussion_quality: 1.0,
        };
        assert_eq!(q.overall(), 0.0);
    }

    #[test]
    fn test_failed_score_has_zero_subscores() {
        let q = QualityScore::failed();
        assert_eq!(q.coherence, 0.0);
        assert_eq!(q.completeness, 0.0);
        assert_eq!(q.significance_accuracy, 0.0);
        assert_eq!(q.discussion_quality, 0.0);
        assert_eq!(q.overall(), 0.0);
    }

    #[test]
    fn test_overall_weight_contract() {
        let q = QualityScore {
            extraction_success: true,
            coherence: 0.8,
            completeness: 0.6,
            significance_accuracy: 0.7,
            discussion_quality: 0.5,
        };
        let expected = 0.3 * 0.8 + 0.3 * 0.7 + 0.2 * 0.5 + 0.2 * 0.6;
        assert!((q.overall() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_coherent_summary_scores_high() {
        let score = score_coherence(GOOD_SUMMARY);
        assert!(score >= 0.8, "expected high coherence, got {}", score);
    }

    #[test]
    fn test_empty_summary_scores_zero() {
        assert_eq!(score_coherence(""), 0.0);
        assert_eq!(score_completeness("", "Title", "https://example.com"), 0.0);
    }

    #[test]
    fn test_html_residue_costs_coherence() {
        let clean = score_coherence(GOOD_SUMMARY);
        let dirty = score_coherence(&format!("{} <div>", GOOD_SUMMARY));
        assert!(dirty < clean);
    }

    #[test]
    fn test_completeness_rewards_title_overlap() {
        let title = "New caching system cuts query latency";
        let on_topic = score_completeness(GOOD_SUMMARY, title, "https://example.com/post");
        let off_topic = score_completeness(
            "Subscribe to our newsletter for weekly updates and special offers today.",
            title,
            "https://example.com/post",
        );
        assert!(on_topic > off_topic);
    }

    #[test]
    fn test_completeness_penalizes_wrong_content() {
        // None of the title's key terms appear: likely extracted the wrong page.
        let score = score_completeness(
            "Trade paperback editions ship with new cover artwork because fans demanded it.",
            "Babylon 5 returns to streaming",
            "https://example.com",
        );
        assert!(score < 0.5);
    }

    #[test]
    fn test_generic_significance_gets_minimal_score() {
        let generic = format!("Interesting development — {}.", GENERIC_SIGNIFICANCE);
        assert!((score_significance_accuracy(&generic) - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_specific_significance_scores_high() {
        let sig = "Privacy/security trend — relevant to your infrastructure decisions and user trust.";
        assert!(score_significance_accuracy(sig) >= 0.8);
    }

    #[test]
    fn test_no_discussion_scores_zero() {
        assert_eq!(score_discussion_quality(None), 0.0);
        assert_eq!(score_discussion_quality(Some("")), 0.0);
    }

    #[test]
    fn test_specific_synthesis_beats_generic() {
        let specific = "Commenters discussed technical implementation, privacy concerns. One commenter explained that the key issue is battery drain from constant polling in production. Mixed reactions with substantive debate.";
        let generic = "People talked about the article.";
        assert!(score_discussion_quality(Some(specific)) > score_discussion_quality(Some(generic)));
        assert!(score_discussion_quality(Some(specific)) >= 0.8);
    }
}
