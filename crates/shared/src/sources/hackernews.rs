//! Hacker News adapter: top stories from the Firebase API, filtered by
//! engagement and tagged with an interest category when the title carries
//! evidence for one.

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::Deserialize;

use crate::config::HackerNewsConfig;
use crate::models::{Candidate, RawMetrics, Source};

const TOP_STORIES_URL: &str = "https://hacker-news.firebaseio.com/v0/topstories.json";
const ITEM_URL: &str = "https://hacker-news.firebaseio.com/v0/item";

const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "tech",
        &[
            "ai", "llm", "machine learning", "database", "infrastructure", "cloud", "kubernetes",
            "observability", "server", "api", "code", "programming", "developer", "compiler",
        ],
    ),
    (
        "economics",
        &[
            "startup", "business", "finance", "market", "economy", "valuation", "revenue",
            "profit", "venture", "ipo",
        ],
    ),
    (
        "science",
        &[
            "physics", "biology", "research", "study", "paper", "experiment", "discovery",
            "breakthrough",
        ],
    ),
    (
        "f1",
        &["formula 1", "f1", "racing", "grand prix", "ferrari", "verstappen", "hamilton"],
    ),
];

#[derive(Debug, Deserialize)]
struct HnItem {
    id: u64,
    #[serde(rename = "type")]
    kind: Option<String>,
    title: Option<String>,
    url: Option<String>,
    #[serde(default)]
    score: u32,
    #[serde(default)]
    descendants: u32,
}

pub struct HackerNewsSource {
    client: Client,
}

impl HackerNewsSource {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    /// Fetch the current top stories and keep the ones with enough
    /// engagement to be worth summarizing.
    pub async fn fetch_candidates(&self, config: &HackerNewsConfig) -> Result<Vec<Candidate>> {
        let ids: Vec<u64> = self
            .client
            .get(TOP_STORIES_URL)
            .send()
            .await
            .context("Failed to fetch HN top stories")?
            .json()
            .await
            .context("Failed to parse HN top stories response")?;

        let candidates: Vec<Candidate> = stream::iter(ids.into_iter().take(config.fetch_limit))
            .map(|id| self.fetch_story(id))
            .buffer_unordered(10)
            .filter_map(|story| async move { story.and_then(story_to_candidate) })
            .collect()
            .await;

        Ok(filter_interesting(
            candidates,
            config.min_score,
            config.min_comments,
        ))
    }

    async fn fetch_story(&self, id: u64) -> Option<HnItem> {
        let url = format!("{}/{}.json", ITEM_URL, id);
        self.client.get(&url).send().await.ok()?.json().await.ok()
    }
}

/// Convert a raw item to a candidate. Self-posts (Ask HN and friends) and
/// non-stories are dropped: there is no external article to extract.
fn story_to_candidate(item: HnItem) -> Option<Candidate> {
    if item.kind.as_deref() != Some("story") {
        return None;
    }
    let title = item.title?;
    let url = item.url.filter(|u| !u.is_empty() && !u.starts_with("item?id="))?;

    Some(Candidate {
        source: Source::HackerNews,
        category_hint: categorize(&title),
        title,
        url,
        metrics: RawMetrics::HackerNews {
            story_id: item.id,
            points: item.score,
            comments: item.descendants,
        },
        potential_score: None,
    })
}

/// Tag a title with the interest category its keywords support, or None
/// when nothing matches. No default: an uncategorized story stays
/// uncategorized rather than being lumped into the most common bucket.
/// Single-word keywords match whole words only ("ai" must not fire inside
/// "trails"); phrases match as substrings.
pub fn categorize(title: &str) -> Option<String> {
    let title_lower = title.to_lowercase();
    let tokens: Vec<&str> = title_lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    CATEGORY_KEYWORDS
        .iter()
        .map(|(category, keywords)| {
            let hits = keywords
                .iter()
                .filter(|&&kw| {
                    if kw.contains(' ') {
                        title_lower.contains(kw)
                    } else {
                        tokens.iter().any(|&t| t == kw)
                    }
                })
                .count();
            (category, hits)
        })
        .filter(|(_, hits)| *hits > 0)
        .max_by_key(|(_, hits)| *hits)
        .map(|(category, _)| category.to_string())
}

fn filter_interesting(
    candidates: Vec<Candidate>,
    min_score: u32,
    min_comments: u32,
) -> Vec<Candidate> {
    fn points_of(candidate: &Candidate) -> u32 {
        match &candidate.metrics {
            RawMetrics::HackerNews { points, .. } => *points,
            _ => 0,
        }
    }

    let mut interesting: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| match &c.metrics {
            RawMetrics::HackerNews {
                points, comments, ..
            } => *points >= min_score && *comments >= min_comments,
            _ => false,
        })
        .collect();
    interesting.sort_by(|a, b| points_of(b).cmp(&points_of(a)));
    interesting
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_story(id: u64, title: &str, url: &str, score: u32, descendants: u32) -> HnItem {
        HnItem {
            id,
            kind: Some("story".to_string()),
            title: Some(title.to_string()),
            url: Some(url.to_string()),
            score,
            descendants,
        }
    }

    #[test]
    fn test_categorize_by_keywords() {
        assert_eq!(
            categorize("New database infrastructure for developers"),
            Some("tech".to_string())
        );
        assert_eq!(
            categorize("Startup raises at record valuation before IPO"),
            Some("economics".to_string())
        );
    }

    #[test]
    fn test_categorize_no_evidence_yields_none() {
        assert_eq!(categorize("My favorite hiking trails in the Alps"), None);
    }

    #[test]
    fn test_self_posts_are_skipped() {
        let ask = HnItem {
            id: 1,
            kind: Some("story".to_string()),
            title: Some("Ask HN: what are you reading?".to_string()),
            url: None,
            score: 300,
            descendants: 400,
        };
        assert!(story_to_candidate(ask).is_none());

        let job = HnItem {
            id: 2,
            kind: Some("job".to_string()),
            title: Some("Hiring engineers".to_string()),
            url: Some("https://example.com".to_string()),
            score: 1,
            descendants: 0,
        };
        assert!(story_to_candidate(job).is_none());
    }

    #[test]
    fn test_filter_interesting_thresholds_and_order() {
        let candidates: Vec<Candidate> = vec![
            raw_story(1, "Low score", "https://a.com", 5, 50),
            raw_story(2, "Few comments", "https://b.com", 100, 2),
            raw_story(3, "Keeper", "https://c.com", 80, 30),
            raw_story(4, "Stronger keeper", "https://d.com", 200, 30),
        ]
        .into_iter()
        .filter_map(story_to_candidate)
        .collect();

        let filtered = filter_interesting(candidates, 20, 10);
        let urls: Vec<&str> = filtered.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, vec!["https://d.com", "https://c.com"]);
    }
}
