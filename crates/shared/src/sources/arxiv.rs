//! arXiv adapter: recent papers from the Atom API, enriched with external
//! traction signals (HN mentions, citations, linked code) before ranking.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;

use crate::config::ArxivConfig;
use crate::models::{Candidate, RawMetrics, Source};

const CATEGORIES: &[&str] = &["cs.AI", "cs.SE", "cs.CL", "cs.CY", "econ.GN", "econ.TH", "q-fin.EC"];

const QUERY_URL: &str = "http://export.arxiv.org/api/query";
const ALGOLIA_URL: &str = "https://hn.algolia.com/api/v1/search";
const SEMANTIC_SCHOLAR_URL: &str = "https://api.semanticscholar.org/graph/v1/paper";

const MAX_ABSTRACT_CHARS: usize = 500;

// Atom feed shape, only the fields we read.
#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    id: String,
    title: String,
    summary: String,
    published: String,
    #[serde(rename = "author", default)]
    authors: Vec<Author>,
    #[serde(rename = "link", default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Clone)]
struct Paper {
    arxiv_id: String,
    title: String,
    authors: Vec<String>,
    abstract_text: String,
    url: String,
    published: NaiveDate,
}

pub struct ArxivSource {
    client: Client,
}

impl ArxivSource {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    /// Fetch recent papers across the configured categories and turn them
    /// into traction-enriched candidates.
    pub async fn fetch_candidates(
        &self,
        config: &ArxivConfig,
        today: NaiveDate,
    ) -> Result<Vec<Candidate>> {
        let papers = self.fetch_recent(config, today).await?;

        let mut candidates = Vec::with_capacity(papers.len());
        for paper in papers {
            candidates.push(self.enrich(paper).await);
            // Polite pause between external lookups.
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        }
        Ok(candidates)
    }

    async fn fetch_recent(&self, config: &ArxivConfig, today: NaiveDate) -> Result<Vec<Paper>> {
        let cutoff = today - chrono::Duration::days(config.days);
        let mut papers: Vec<Paper> = Vec::new();

        for category in CATEGORIES {
            let url = format!(
                "{}?search_query=cat:{}&start=0&max_results={}&sortBy=submittedDate&sortOrder=descending",
                QUERY_URL, category, config.max_per_category
            );

            match self.fetch_category(&url).await {
                Ok(batch) => {
                    papers.extend(batch.into_iter().filter(|p| p.published >= cutoff));
                }
                Err(e) => {
                    // One bad category query should not empty the pool.
                    eprintln!("  Warning: arXiv query for {} failed: {:#}", category, e);
                }
            }

            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        }

        // The same paper can be cross-listed in several categories.
        let mut seen = std::collections::HashSet::new();
        papers.retain(|p| seen.insert(p.arxiv_id.clone()));
        Ok(papers)
    }

    async fn fetch_category(&self, url: &str) -> Result<Vec<Paper>> {
        let response = self.client.get(url).send().await.context("request failed")?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("arXiv API returned {}", status);
        }
        let xml = response.text().await.context("reading response body")?;
        parse_feed(&xml)
    }

    async fn enrich(&self, paper: Paper) -> Candidate {
        let github_repos = find_github_repos(&paper.abstract_text);

        let (hn_mentioned, hn_points) = self.check_hn_mention(&paper.arxiv_id).await;
        let influential_citations = self.check_semantic_scholar(&paper.arxiv_id).await;

        Candidate {
            source: Source::Arxiv,
            title: paper.title,
            url: paper.url,
            category_hint: Some("research".to_string()),
            metrics: RawMetrics::Arxiv {
                arxiv_id: paper.arxiv_id,
                authors: paper.authors.into_iter().take(3).collect(),
                abstract_text: paper.abstract_text,
                published: paper.published,
                hn_mentioned,
                hn_points,
                github_repos,
                influential_citations,
            },
            potential_score: None,
        }
    }

    /// Was this paper submitted to HN, and with how many points?
    async fn check_hn_mention(&self, arxiv_id: &str) -> (bool, u32) {
        #[derive(Deserialize)]
        struct SearchResult {
            hits: Vec<Hit>,
        }
        #[derive(Deserialize)]
        struct Hit {
            #[serde(default)]
            points: Option<u32>,
        }

        let query = format!("arxiv.org/abs/{}", arxiv_id);
        let url = format!(
            "{}?query={}&tags=story",
            ALGOLIA_URL,
            urlencoding::encode(&query)
        );

        let result: Option<SearchResult> = match self.client.get(&url).send().await {
            Ok(resp) => resp.json().await.ok(),
            Err(_) => None,
        };

        match result {
            Some(r) if !r.hits.is_empty() => {
                let best = r.hits.iter().filter_map(|h| h.points).max().unwrap_or(0);
                (true, best)
            }
            _ => (false, 0),
        }
    }

    async fn check_semantic_scholar(&self, arxiv_id: &str) -> u32 {
        #[derive(Deserialize)]
        struct PaperStats {
            #[serde(rename = "influentialCitationCount", default)]
            influential_citation_count: u32,
        }

        let url = format!(
            "{}/arXiv:{}?fields=influentialCitationCount",
            SEMANTIC_SCHOLAR_URL, arxiv_id
        );

        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => resp
                .json::<PaperStats>()
                .await
                .map(|s| s.influential_citation_count)
                .unwrap_or(0),
            _ => 0,
        }
    }
}

fn parse_feed(xml: &str) -> Result<Vec<Paper>> {
    let feed: Feed = quick_xml::de::from_str(xml).context("parsing arXiv Atom feed")?;

    let papers = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            // Entry ids look like http://arxiv.org/abs/2401.00001v2.
            let arxiv_id = entry
                .id
                .rsplit('/')
                .next()?
                .split('v')
                .next()?
                .to_string();
            if arxiv_id.is_empty() {
                return None;
            }

            let published = NaiveDate::parse_from_str(entry.published.get(..10)?, "%Y-%m-%d").ok()?;

            let url = entry
                .links
                .iter()
                .find(|l| l.rel.as_deref() == Some("alternate"))
                .map(|l| l.href.clone())
                .unwrap_or_else(|| format!("https://arxiv.org/abs/{}", arxiv_id));

            let mut abstract_text = crate::summarizer::collapse_whitespace(&entry.summary);
            if abstract_text.len() > MAX_ABSTRACT_CHARS {
                let mut end = MAX_ABSTRACT_CHARS;
                while end > 0 && !abstract_text.is_char_boundary(end) {
                    end -= 1;
                }
                abstract_text.truncate(end);
            }

            Some(Paper {
                arxiv_id,
                title: crate::summarizer::collapse_whitespace(&entry.title),
                authors: entry.authors.into_iter().map(|a| a.name).collect(),
                abstract_text,
                url,
                published,
            })
        })
        .collect();

    Ok(papers)
}

/// Scan text for linked `github.com/owner/repo` references.
pub fn find_github_repos(text: &str) -> Vec<String> {
    const PREFIX: &str = "github.com/";
    let valid = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.';

    let mut repos: Vec<String> = Vec::new();
    let mut rest = text;
    while let Some(pos) = rest.find(PREFIX) {
        let after = &rest[pos + PREFIX.len()..];
        let owner: String = after.chars().take_while(|&c| valid(c)).collect();
        let after_owner = &after[owner.len()..];
        if !owner.is_empty() && after_owner.starts_with('/') {
            let repo: String = after_owner[1..]
                .chars()
                .take_while(|&c| valid(c))
                .collect();
            let repo = repo.trim_end_matches('.').to_string();
            if !repo.is_empty() {
                let full = format!("github.com/{}/{}", owner, repo);
                if !repos.contains(&full) {
                    repos.push(full);
                }
            }
        }
        rest = &rest[pos + PREFIX.len()..];
    }
    repos
}
