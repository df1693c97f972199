use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

use crate::assembler::FallbackPolicy;

/// Full runtime configuration, loaded from
/// `~/.config/daybrief/config.json`. Validation runs at load time, before
/// any network or database work: a bad threshold must stop the run up
/// front, not after an hour of fetching.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub summarize: SummarizeConfig,
    #[serde(default)]
    pub assembly: AssemblyConfig,
    pub email: Option<EmailConfig>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct SourcesConfig {
    #[serde(default)]
    pub hackernews: HackerNewsConfig,
    #[serde(default)]
    pub arxiv: ArxivConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HackerNewsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_hn_fetch_limit")]
    pub fetch_limit: usize,
    #[serde(default = "default_hn_min_score")]
    pub min_score: u32,
    #[serde(default = "default_hn_min_comments")]
    pub min_comments: u32,
}

impl Default for HackerNewsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fetch_limit: default_hn_fetch_limit(),
            min_score: default_hn_min_score(),
            min_comments: default_hn_min_comments(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArxivConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_arxiv_days")]
    pub days: i64,
    #[serde(default = "default_arxiv_max_per_category")]
    pub max_per_category: usize,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            days: default_arxiv_days(),
            max_per_category: default_arxiv_max_per_category(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RankingConfig {
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SummarizeConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_time_budget_secs")]
    pub time_budget_secs: u64,
}

impl Default for SummarizeConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            time_budget_secs: default_time_budget_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssemblyConfig {
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f64,
    #[serde(default = "default_min_items")]
    pub min_items: usize,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    #[serde(default)]
    pub fallback: FallbackPolicy,
    #[serde(default = "default_fallback_step")]
    pub fallback_step: f64,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            quality_threshold: default_quality_threshold(),
            min_items: default_min_items(),
            max_items: default_max_items(),
            fallback: FallbackPolicy::default(),
            fallback_step: default_fallback_step(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmailConfig {
    pub to: String,
    pub from: String,
    pub smtp_host: String,
    pub smtp_username: String,
    /// Not stored in the config file; loaded from DAYBRIEF_SMTP_PASS.
    #[serde(skip)]
    pub smtp_password: String,
}

fn default_true() -> bool {
    true
}
fn default_hn_fetch_limit() -> usize {
    50
}
fn default_hn_min_score() -> u32 {
    20
}
fn default_hn_min_comments() -> u32 {
    10
}
fn default_arxiv_days() -> i64 {
    7
}
fn default_arxiv_max_per_category() -> usize {
    20
}
fn default_top_n() -> usize {
    15
}
fn default_workers() -> usize {
    4
}
fn default_time_budget_secs() -> u64 {
    300
}
fn default_quality_threshold() -> f64 {
    0.6
}
fn default_min_items() -> usize {
    3
}
fn default_max_items() -> usize {
    5
}
fn default_fallback_step() -> f64 {
    0.15
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("daybrief").join("config.json"))
    }

    /// Load from the given path (or the default location), pull secrets
    /// from the environment, and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::try_load_dotenv();

        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        let mut config: Config = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            // No file means defaults: sources on, no email delivery.
            Config {
                sources: SourcesConfig::default(),
                ranking: RankingConfig::default(),
                summarize: SummarizeConfig::default(),
                assembly: AssemblyConfig::default(),
                email: None,
            }
        };

        if let Some(email) = config.email.as_mut() {
            email.smtp_password = env::var("DAYBRIEF_SMTP_PASS").context(
                "DAYBRIEF_SMTP_PASS not found.\n\n\
                To fix this, create ~/.config/daybrief/.env with:\n  \
                DAYBRIEF_SMTP_PASS=your_smtp_password_here",
            )?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject inconsistent settings before anything else runs.
    pub fn validate(&self) -> Result<()> {
        let a = &self.assembly;
        if !(a.quality_threshold > 0.0 && a.quality_threshold <= 1.0) {
            anyhow::bail!(
                "quality_threshold must be in (0, 1], got {}",
                a.quality_threshold
            );
        }
        if a.min_items == 0 || a.min_items > a.max_items {
            anyhow::bail!(
                "target count bounds invalid: min_items={}, max_items={}",
                a.min_items,
                a.max_items
            );
        }
        if matches!(a.fallback, FallbackPolicy::LowerThreshold)
            && !(a.fallback_step > 0.0 && a.fallback_step < a.quality_threshold)
        {
            // The relaxed bar must stay positive so zero-quality items
            // (failed extractions) can never be selected.
            anyhow::bail!(
                "fallback_step must be in (0, quality_threshold), got {}",
                a.fallback_step
            );
        }
        if self.ranking.top_n == 0 {
            anyhow::bail!("ranking.top_n must be at least 1");
        }
        if self.summarize.workers == 0 {
            anyhow::bail!("summarize.workers must be at least 1");
        }
        if self.summarize.time_budget_secs == 0 {
            anyhow::bail!("summarize.time_budget_secs must be at least 1");
        }
        Ok(())
    }

    fn try_load_dotenv() {
        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/daybrief/.env (standard config location)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("daybrief").join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env (home directory)
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                let _ = dotenvy::from_path(&home_path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            sources: SourcesConfig::default(),
            ranking: RankingConfig::default(),
            summarize: SummarizeConfig::default(),
            assembly: AssemblyConfig::default(),
            email: None,
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_rejects_threshold_out_of_range() {
        let mut config = base_config();
        config.assembly.quality_threshold = 0.0;
        assert!(config.validate().is_err());
        config.assembly.quality_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let mut config = base_config();
        config.assembly.min_items = 6;
        config.assembly.max_items = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_fallback_step_at_or_above_threshold() {
        let mut config = base_config();
        config.assembly.fallback = FallbackPolicy::LowerThreshold;
        config.assembly.fallback_step = 0.6;
        assert!(config.validate().is_err());
        config.assembly.fallback_step = 0.15;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_top_n() {
        let mut config = base_config();
        config.ranking.top_n = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parses_partial_file() {
        let json = r#"{
            "sources": { "arxiv": { "enabled": false } },
            "assembly": { "quality_threshold": 0.7, "fallback": "note" }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(!config.sources.arxiv.enabled);
        assert!(config.sources.hackernews.enabled);
        assert_eq!(config.assembly.quality_threshold, 0.7);
        assert!(matches!(config.assembly.fallback, FallbackPolicy::Note));
        assert_eq!(config.ranking.top_n, 15);
    }
}
