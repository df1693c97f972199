//! Source adapters. Each produces a pool of candidates; a failing adapter
//! degrades to an empty contribution so the remaining sources still feed
//! the pipeline.

pub mod arxiv;
pub mod hackernews;

use chrono::NaiveDate;

use crate::config::Config;
use crate::models::Candidate;

/// Collect candidates from every enabled source, in source-priority order
/// (discussion board first, then the preprint repo).
pub async fn collect_candidates(config: &Config, today: NaiveDate) -> Vec<Candidate> {
    let mut pool: Vec<Candidate> = Vec::new();

    if config.sources.hackernews.enabled {
        println!("📰 Fetching Hacker News...");
        match fetch_hackernews(config).await {
            Ok(candidates) => {
                println!("✓ {} interesting stories", candidates.len());
                pool.extend(candidates);
            }
            Err(e) => eprintln!("⚠ Hacker News unavailable, continuing without it: {:#}", e),
        }
    }

    if config.sources.arxiv.enabled {
        println!("📄 Fetching arXiv...");
        match fetch_arxiv(config, today).await {
            Ok(candidates) => {
                println!("✓ {} recent papers", candidates.len());
                pool.extend(candidates);
            }
            Err(e) => eprintln!("⚠ arXiv unavailable, continuing without it: {:#}", e),
        }
    }

    pool
}

async fn fetch_hackernews(config: &Config) -> anyhow::Result<Vec<Candidate>> {
    let source = hackernews::HackerNewsSource::new()?;
    source.fetch_candidates(&config.sources.hackernews).await
}

async fn fetch_arxiv(config: &Config, today: NaiveDate) -> anyhow::Result<Vec<Candidate>> {
    let source = arxiv::ArxivSource::new()?;
    source.fetch_candidates(&config.sources.arxiv, today).await
}
