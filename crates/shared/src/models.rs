use chrono::NaiveDate;

use crate::quality::QualityScore;

/// Origin of a candidate. Priority order (lower = earlier in the batch)
/// decides which duplicate survives dedup and how score ties break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    HackerNews,
    Arxiv,
}

impl Source {
    pub fn priority(&self) -> u8 {
        match self {
            Source::HackerNews => 0,
            Source::Arxiv => 1,
        }
    }

    /// Short tag used in the database and email rendering.
    pub fn tag(&self) -> &'static str {
        match self {
            Source::HackerNews => "hn",
            Source::Arxiv => "arxiv",
        }
    }
}

/// Source-specific traction signals. One variant per source; the ranker
/// matches on this, so adding a source is a new variant plus one arm there.
#[derive(Debug, Clone)]
pub enum RawMetrics {
    HackerNews {
        story_id: u64,
        points: u32,
        comments: u32,
    },
    Arxiv {
        arxiv_id: String,
        authors: Vec<String>,
        abstract_text: String,
        published: NaiveDate,
        hn_mentioned: bool,
        hn_points: u32,
        github_repos: Vec<String>,
        influential_citations: u32,
    },
}

/// One piece of content under consideration, before summarization.
/// Created by a source adapter, scored once by the ranker, then read-only.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub source: Source,
    pub title: String,
    pub url: String,
    pub category_hint: Option<String>,
    pub metrics: RawMetrics,
    pub potential_score: Option<f64>,
}

impl Candidate {
    /// Stable source-native identifier (arXiv id, HN story id).
    pub fn source_id(&self) -> String {
        match &self.metrics {
            RawMetrics::HackerNews { story_id, .. } => story_id.to_string(),
            RawMetrics::Arxiv { arxiv_id, .. } => arxiv_id.clone(),
        }
    }

}

/// A candidate after Stage 2: summary text plus its quality assessment.
/// Stage 2 produces exactly one of these per input candidate; extraction
/// failures become items with `extraction_success == false` and zero quality
/// rather than disappearing.
#[derive(Debug, Clone)]
pub struct SummarizedItem {
    pub candidate: Candidate,
    pub extraction_success: bool,
    pub executive_summary: String,
    pub significance: String,
    pub discussion_synthesis: Option<String>,
    pub quality: QualityScore,
}

impl SummarizedItem {
    /// The failure marker for a candidate whose content could not be
    /// fetched or parsed (or whose time budget ran out).
    pub fn extraction_failed(candidate: Candidate) -> Self {
        Self {
            candidate,
            extraction_success: false,
            executive_summary: String::new(),
            significance: String::new(),
            discussion_synthesis: None,
            quality: QualityScore::failed(),
        }
    }

    pub fn overall_quality(&self) -> f64 {
        self.quality.overall()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn hn_candidate(url: &str, points: u32, comments: u32) -> Candidate {
        Candidate {
            source: Source::HackerNews,
            title: format!("Story at {}", url),
            url: url.to_string(),
            category_hint: Some("tech".to_string()),
            metrics: RawMetrics::HackerNews {
                story_id: 1,
                points,
                comments,
            },
            potential_score: None,
        }
    }

    pub fn arxiv_candidate(url: &str, published: NaiveDate) -> Candidate {
        Candidate {
            source: Source::Arxiv,
            title: format!("Paper at {}", url),
            url: url.to_string(),
            category_hint: Some("research".to_string()),
            metrics: RawMetrics::Arxiv {
                arxiv_id: "2401.00001".to_string(),
                authors: vec!["A. Author".to_string()],
                abstract_text: "An abstract.".to_string(),
                published,
                hn_mentioned: false,
                hn_points: 0,
                github_repos: Vec::new(),
                influential_citations: 0,
            },
            potential_score: None,
        }
    }
}
