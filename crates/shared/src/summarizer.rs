//! Summary synthesis: executive summaries, significance classification, and
//! discussion synthesis. Everything here is a pure function of the candidate
//! and its fetched content, so Stage-2 scheduling cannot change results.

use crate::models::{Candidate, RawMetrics};

/// Marker sentence for content with no category evidence. The quality
/// assessor keys off this to penalize generic significance lines.
pub const GENERIC_SIGNIFICANCE: &str = "monitoring for emerging patterns";

const MAX_SUMMARY_LEN: usize = 400;

/// The text fields of a Stage-2 result, before quality assessment.
#[derive(Debug, Clone)]
pub struct SummaryParts {
    pub extraction_success: bool,
    pub executive_summary: String,
    pub significance: String,
    pub discussion_synthesis: Option<String>,
}

impl SummaryParts {
    fn failed() -> Self {
        Self {
            extraction_success: false,
            executive_summary: String::new(),
            significance: String::new(),
            discussion_synthesis: None,
        }
    }
}

/// Synthesize summary text for one candidate from its fetched content.
/// `article` is None when the content-fetch collaborator failed; the result
/// then carries `extraction_success == false` and empty text.
pub fn summarize_candidate(
    candidate: &Candidate,
    article: Option<&str>,
    comments: &[String],
) -> SummaryParts {
    match &candidate.metrics {
        RawMetrics::HackerNews { .. } => {
            let content = match article {
                Some(c) if !c.trim().is_empty() => c,
                _ => return SummaryParts::failed(),
            };
            let executive_summary = match synthesize_executive_summary(content) {
                Some(s) => s,
                None => return SummaryParts::failed(),
            };
            let significance =
                analyze_significance(content, &candidate.title, candidate.category_hint.as_deref());
            SummaryParts {
                extraction_success: true,
                executive_summary,
                significance,
                discussion_synthesis: synthesize_discussion(comments),
            }
        }
        RawMetrics::Arxiv {
            abstract_text,
            github_repos,
            ..
        } => {
            if abstract_text.trim().is_empty() {
                return SummaryParts::failed();
            }
            let mut significance = String::from("Research finding");
            if !github_repos.is_empty() {
                significance.push_str(" with available implementation");
            }
            significance.push_str(" — early signal of validated approaches, relevant to your technical work.");
            SummaryParts {
                extraction_success: true,
                executive_summary: truncate_with_ellipsis(abstract_text.trim(), MAX_SUMMARY_LEN),
                significance,
                discussion_synthesis: None,
            }
        }
    }
}

/// Split text into sentences on `.`/`!`/`?` followed by whitespace.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let bytes = text.as_bytes();
    let mut start = 0;

    for (i, b) in bytes.iter().enumerate() {
        if matches!(b, b'.' | b'!' | b'?') {
            let next = bytes.get(i + 1);
            if next.is_none() || next.is_some_and(|n| n.is_ascii_whitespace()) {
                let sentence = text[start..=i].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                start = i + 1;
            }
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

const FINDING_WORDS: &[&str] = &["found", "discovered", "revealed", "showed", "demonstrated"];
const CAUSAL_WORDS: &[&str] = &["because", "therefore", "as a result", "this means"];
const PROBLEM_WORDS: &[&str] = &["problem", "challenge", "issue", "crisis"];
const SOLUTION_WORDS: &[&str] = &["solution", "approach", "method", "strategy"];

/// Pick the highest-signal sentences and rebuild them in original order:
/// a short narrative, not a fragment list. None when the content has no
/// usable sentences (boilerplate, nav chrome, empty extraction).
pub fn synthesize_executive_summary(content: &str) -> Option<String> {
    let sentences: Vec<&str> = split_sentences(content)
        .into_iter()
        .filter(|s| s.len() > 30)
        .collect();

    if sentences.is_empty() {
        return None;
    }

    let mut scored: Vec<(i32, usize)> = sentences
        .iter()
        .take(20)
        .enumerate()
        .map(|(idx, sentence)| {
            let lower = sentence.to_lowercase();
            let mut score = 0i32;
            if FINDING_WORDS.iter().any(|w| lower.contains(w)) {
                score += 3;
            }
            if CAUSAL_WORDS.iter().any(|w| lower.contains(w)) {
                score += 2;
            }
            if PROBLEM_WORDS.iter().any(|w| lower.contains(w)) {
                score += 2;
            }
            if SOLUTION_WORDS.iter().any(|w| lower.contains(w)) {
                score += 2;
            }
            if sentence.chars().any(|c| c.is_ascii_digit()) {
                score += 1;
            }
            if sentence.len() > 100 {
                score += 1;
            }
            if sentence.len() > 300 {
                score -= 2;
            }
            (score, idx)
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0));
    let mut top_indices: Vec<usize> = scored.iter().take(3).map(|(_, idx)| *idx).collect();
    top_indices.sort_unstable();

    let picked: Vec<&str> = top_indices
        .into_iter()
        .take(3)
        .map(|idx| sentences[idx])
        .collect();

    let summary = collapse_whitespace(&picked.join(" "));
    Some(truncate_with_ellipsis(&summary, MAX_SUMMARY_LEN))
}

struct SignificanceCategory {
    name: &'static str,
    title_patterns: &'static [&'static str],
    content_patterns: &'static [&'static str],
    implication: &'static str,
    hints: &'static [&'static str],
}

// Evidence patterns are deliberately specific (leading/trailing spaces on
// short tokens) so unrelated content doesn't match a dominant category.
const SIGNIFICANCE_CATEGORIES: &[SignificanceCategory] = &[
    SignificanceCategory {
        name: "Privacy/security trend",
        title_patterns: &["privacy", "security", "breach", "tracking"],
        content_patterns: &["privacy concerns", "security vulnerability", "data breach"],
        implication: "relevant to your infrastructure decisions and user trust.",
        hints: &[],
    },
    SignificanceCategory {
        name: "AI/ML development",
        title_patterns: &[],
        content_patterns: &[" ai ", "machine learning", "llm ", "language model", "neural network"],
        implication: "may impact your tooling choices.",
        hints: &["tech"],
    },
    SignificanceCategory {
        name: "Infrastructure tooling",
        title_patterns: &[],
        content_patterns: &["kubernetes", "docker ", "infrastructure", "observability", "database", "cloud ", "devops"],
        implication: "directly relevant to your operations work.",
        hints: &["tech"],
    },
    SignificanceCategory {
        name: "Market signal",
        title_patterns: &[],
        content_patterns: &["startup", "valuation", "funding round", "revenue", "ipo ", "market trend"],
        implication: "indicates where investment and talent are flowing.",
        hints: &["economics"],
    },
    SignificanceCategory {
        name: "Open source ecosystem",
        title_patterns: &[],
        content_patterns: &["open source", "open-source", "mit license", "gpl license"],
        implication: "affects sustainability of tools you depend on.",
        hints: &["tech"],
    },
    SignificanceCategory {
        name: "Research finding",
        title_patterns: &[],
        content_patterns: &["research paper", "study found", "published in", "arxiv.org"],
        implication: "early signal of validated approaches.",
        hints: &["science", "research"],
    },
    SignificanceCategory {
        name: "Knowledge preservation issue",
        title_patterns: &[],
        content_patterns: &["internet archive", "archive.org", "digital preservation", "library of congress"],
        implication: "affects long-term access to information.",
        hints: &[],
    },
    SignificanceCategory {
        name: "Media/content landscape shift",
        title_patterns: &[],
        content_patterns: &["streaming", "netflix", "youtube", "content licensing", "media rights"],
        implication: "signals changes in how content is distributed and consumed.",
        hints: &["f1"],
    },
    SignificanceCategory {
        name: "Software preservation",
        title_patterns: &["reverse engineer", "reverse-engineer", "preservation", "legacy code"],
        content_patterns: &["reverse engineer", "reverse-engineer", "legacy code", "abandoned software", "software archaeology", "source code rescued"],
        implication: "demonstrates techniques for maintaining access to legacy systems.",
        hints: &[],
    },
];

/// Build the "why this matters" line from lexical evidence in the content.
/// A category is only claimed when its patterns actually match; content with
/// no evidence gets an explicitly generic line instead of a guessed tag.
pub fn analyze_significance(content: &str, title: &str, category_hint: Option<&str>) -> String {
    let content_lower = collapse_whitespace(&content.to_lowercase());
    let title_lower = title.to_lowercase();
    // Evidence near the top of the article counts; footer boilerplate doesn't.
    let head = head_chars(&content_lower, 2000);

    let mut matched: Vec<&SignificanceCategory> = Vec::new();
    for category in SIGNIFICANCE_CATEGORIES {
        let title_hit = category
            .title_patterns
            .iter()
            .any(|p| title_lower.contains(p));
        let content_hit = category.content_patterns.iter().any(|p| head.contains(p));
        if title_hit || content_hit {
            matched.push(category);
        }
    }

    if matched.is_empty() {
        return format!(
            "Interesting development in your areas of focus — {}.",
            GENERIC_SIGNIFICANCE
        );
    }

    // The ingestion hint breaks ties between matched categories; it never
    // conjures a category the content has no evidence for.
    if let Some(hint) = category_hint {
        if let Some(pos) = matched.iter().position(|c| c.hints.contains(&hint)) {
            let preferred = matched.remove(pos);
            matched.insert(0, preferred);
        }
    }

    let base = match matched.len() {
        1 => matched[0].name.to_string(),
        2 => format!("{} intersecting with {}", matched[0].name, matched[1].name),
        _ => format!(
            "{} at the intersection of {} and {}",
            matched[0].name, matched[1].name, matched[2].name
        ),
    };

    format!("{} — {}", base, matched[0].implication)
}

const THEME_KEYWORDS: &[(&str, &[&str])] = &[
    ("technical implementation", &["implementation", "architecture", "how it works", "code quality"]),
    ("privacy concerns", &["privacy", "tracking", "data collection", "surveillance"]),
    ("business model", &["revenue", "business model", "monetize", "sustainable"]),
    ("alternatives", &["alternative", "instead", "competitor", "better option"]),
    ("historical context", &["history", "previously", "used to", "in the past"]),
    ("criticisms", &["issue", "problem", "concern", "flaw", "limitations"]),
    ("quality assessment", &["quality", "well made", "holds up", "aged well"]),
];

const INSIGHT_PATTERNS: &[&str] = &[
    "pointed out",
    "noted that",
    "argued that",
    "explained that",
    "the key issue",
    "the real problem",
    "what matters",
    "importantly",
    "experience with",
    "found that",
    "discovered that",
];

const EXPERIENCE_PATTERNS: &[&str] =
    &["i worked on", "i built", "we use", "in production", "at my company"];
const TECHNICAL_PATTERNS: &[&str] =
    &["the issue is", "the problem with", "what actually happens"];
const HISTORICAL_PATTERNS: &[&str] = &["this happened before", "similar to", "historically"];

const POSITIVE_WORDS: &[&str] =
    &["great", "excellent", "impressive", "useful", "helpful", "good", "well done"];
const NEGATIVE_WORDS: &[&str] =
    &["problem", "issue", "concern", "flaw", "bad", "disappointing", "worried"];

/// Synthesize discussion themes into complete sentences, quoting a concrete
/// insight from the highest-signal comment. Returns None rather than a
/// generic restatement when no specific insight can be extracted.
pub fn synthesize_discussion(comments: &[String]) -> Option<String> {
    let usable: Vec<&String> = comments
        .iter()
        .filter(|c| c.len() > 80 && c.len() < 900)
        .collect();
    if usable.len() < 3 {
        return None;
    }

    let all_text = usable
        .iter()
        .map(|c| c.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    let themes: Vec<&str> = THEME_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|kw| all_text.contains(kw)))
        .map(|(theme, _)| *theme)
        .collect();

    let has_specific_insight = INSIGHT_PATTERNS.iter().any(|p| all_text.contains(p));
    if !has_specific_insight {
        return None;
    }

    let mut parts: Vec<String> = Vec::new();
    if !themes.is_empty() {
        parts.push(format!(
            "Commenters discussed {}.",
            themes[..themes.len().min(2)].join(", ")
        ));
    }

    // Rank comments by how much first-hand signal they carry.
    let mut ranked: Vec<(&String, i32)> = usable
        .iter()
        .map(|c| {
            let lower = c.to_lowercase();
            let mut score = 0i32;
            if EXPERIENCE_PATTERNS.iter().any(|p| lower.contains(p)) {
                score += 10;
            } else if TECHNICAL_PATTERNS.iter().any(|p| lower.contains(p)) {
                score += 7;
            } else if HISTORICAL_PATTERNS.iter().any(|p| lower.contains(p)) {
                score += 6;
            }
            if c.len() < 120 {
                score -= 5;
            }
            (*c, score)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let mut insight_added = false;
    'comments: for (comment, _) in ranked.iter().take(3) {
        let cleaned = collapse_whitespace(&strip_citation_markers(comment));
        for sentence in split_sentences(&cleaned)
            .into_iter()
            .filter(|s| s.len() > 50)
            .take(2)
        {
            let lower = sentence.to_lowercase();
            if !INSIGHT_PATTERNS.iter().any(|p| lower.contains(p)) {
                continue;
            }
            // A usable insight must read as a full clause, not a fragment.
            let words: Vec<&str> = lower.split_whitespace().collect();
            let has_subject = ["the", "this", "it", "they", "i", "we", "commenters"]
                .iter()
                .any(|w| words.contains(w));
            let has_verb = ["is", "are", "was", "were", "shows", "indicates", "suggests", "notes", "explains"]
                .iter()
                .any(|w| words.contains(w));
            if has_subject && has_verb && sentence.len() < 350 {
                parts.push(sentence.to_string());
                insight_added = true;
                break 'comments;
            }
        }
    }

    if insight_added {
        let pos = usable
            .iter()
            .map(|c| {
                let lower = c.to_lowercase();
                POSITIVE_WORDS.iter().filter(|w| lower.contains(*w)).count()
            })
            .sum::<usize>();
        let neg = usable
            .iter()
            .map(|c| {
                let lower = c.to_lowercase();
                NEGATIVE_WORDS.iter().filter(|w| lower.contains(*w)).count()
            })
            .sum::<usize>();
        if pos > neg + 1 {
            parts.push("Overall reception was positive.".to_string());
        } else if neg > pos + 1 {
            parts.push("Significant concerns were raised.".to_string());
        } else {
            parts.push("Mixed reactions with substantive debate.".to_string());
        }
    }

    if parts.len() >= 2 {
        Some(parts.join(" "))
    } else {
        None
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove `[12]`-style citation markers left over from comment text.
fn strip_citation_markers(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '[' {
            let mut digits = String::new();
            let mut matched = false;
            while let Some(&next) = chars.peek() {
                if next.is_ascii_digit() {
                    digits.push(next);
                    chars.next();
                } else if next == ']' && !digits.is_empty() {
                    chars.next();
                    matched = true;
                    break;
                } else {
                    break;
                }
            }
            if !matched {
                out.push('[');
                out.push_str(&digits);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Truncate at a char boundary, marking the cut with an ellipsis.
pub fn truncate_with_ellipsis(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }
    let mut end = max_len.saturating_sub(3);
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

fn head_chars(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let mut end = max_len;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::hn_candidate;

    #[test]
    fn test_split_sentences_basic() {
        let sentences = split_sentences("First sentence. Second one! A third? Yes.");
        assert_eq!(sentences.len(), 4);
        assert_eq!(sentences[0], "First sentence.");
        assert_eq!(sentences[2], "A third?");
    }

    #[test]
    fn test_split_sentences_ignores_interior_dots() {
        let sentences = split_sentences("Runs on v2.5 today. More soon.");
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0], "Runs on v2.5 today.");
    }

    #[test]
    fn test_executive_summary_forms_narrative() {
        let content = "The team found that compile times dropped by 60 percent after the change. \
            Cookie banner text here. \
            The approach works because incremental caching avoids re-parsing unchanged modules entirely. \
            Short bit. \
            Critics raised the problem of cache invalidation across build machines and shared runners.";
        let summary = synthesize_executive_summary(content).unwrap();
        let sentence_count = split_sentences(&summary).len();
        assert!((2..=3).contains(&sentence_count), "got: {}", summary);
        assert!(summary.contains("compile times"));
        // Sentences keep their original article order.
        let found = summary.find("found").unwrap();
        let because = summary.find("because").unwrap();
        assert!(found < because);
    }

    #[test]
    fn test_executive_summary_none_for_unusable_content() {
        assert!(synthesize_executive_summary("Menu. Home. About. Login.").is_none());
        assert!(synthesize_executive_summary("").is_none());
    }

    #[test]
    fn test_executive_summary_truncates_long_text() {
        let long_sentence = format!("The research found that {} matters a lot.", "x".repeat(500));
        let summary = synthesize_executive_summary(&long_sentence).unwrap();
        assert!(summary.len() <= 400);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn test_significance_requires_evidence() {
        // Off-topic content must not be tagged with a dominant category.
        let sig = analyze_significance(
            "A recipe for sourdough bread with a long fermentation schedule.",
            "Weekend baking",
            Some("tech"),
        );
        assert!(sig.contains(GENERIC_SIGNIFICANCE));
    }

    #[test]
    fn test_significance_detects_category_from_content() {
        let sig = analyze_significance(
            "The startup announced a funding round at a new valuation after strong revenue growth.",
            "Company news",
            None,
        );
        assert!(sig.contains("Market signal"));
        assert!(!sig.contains(GENERIC_SIGNIFICANCE));
    }

    #[test]
    fn test_significance_title_evidence_for_security() {
        let sig = analyze_significance("Some body text here.", "Massive data breach at provider", None);
        assert!(sig.contains("Privacy/security trend"));
    }

    #[test]
    fn test_significance_hint_breaks_ties_only_among_matches() {
        let content = "The startup raised a funding round. The team also released it as open source under the MIT license.";
        let with_hint = analyze_significance(content, "News", Some("economics"));
        assert!(with_hint.starts_with("Market signal"));
        // Hint for an unmatched category changes nothing.
        let other = analyze_significance(content, "News", Some("science"));
        assert!(!other.starts_with("Research finding"));
    }

    #[test]
    fn test_discussion_needs_three_usable_comments() {
        let comments = vec![
            "A long enough comment that explained that the key issue is memory fragmentation under sustained load.".to_string(),
            "Another long comment about the architecture and implementation of this system in some depth.".to_string(),
        ];
        assert!(synthesize_discussion(&comments).is_none());
    }

    #[test]
    fn test_discussion_synthesis_cites_concrete_insight() {
        let comments = vec![
            "I worked on a similar system in production. The key issue is that garbage collection pauses were hiding behind the p99 latency numbers everyone quoted.".to_string(),
            "The implementation looks clean but the architecture makes horizontal scaling awkward because state lives in the worker processes.".to_string(),
            "There is a real problem with the benchmark methodology here, the comparison baseline was never tuned and that is a known flaw.".to_string(),
        ];
        let synthesis = synthesize_discussion(&comments).unwrap();
        assert!(synthesis.contains("key issue"));
        let sentence_count = split_sentences(&synthesis).len();
        assert!(sentence_count >= 2);
    }

    #[test]
    fn test_discussion_none_without_specific_insight() {
        let comments = vec![
            "Wow this is really cool stuff, thanks for sharing it with all of us here today, very nice.".to_string(),
            "I like it a lot, reminds me of other tools in the same general area of the ecosystem, neat.".to_string(),
            "Interesting read overall, will definitely keep an eye on where this project goes from here.".to_string(),
        ];
        assert!(synthesize_discussion(&comments).is_none());
    }

    #[test]
    fn test_summarize_candidate_failure_marker() {
        let candidate = hn_candidate("https://example.com/a", 100, 50);
        let parts = summarize_candidate(&candidate, None, &[]);
        assert!(!parts.extraction_success);
        assert!(parts.executive_summary.is_empty());
        assert!(parts.significance.is_empty());
    }

    #[test]
    fn test_strip_citation_markers() {
        assert_eq!(
            strip_citation_markers("See the docs [1] and the paper [23]."),
            "See the docs  and the paper ."
        );
        assert_eq!(strip_citation_markers("array[idx] stays"), "array[idx] stays");
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        let text = format!("{}ééé", "a".repeat(396));
        let out = truncate_with_ellipsis(&text, 400);
        assert!(out.len() <= 400);
        assert!(out.ends_with("..."));
        assert!(!out.contains('\u{FFFD}'));
    }
}
