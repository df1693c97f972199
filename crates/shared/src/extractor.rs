//! Content fetching for Stage 2. The `ContentFetch` trait is the seam to
//! the outside world: the pipeline only sees article text or a failure
//! indicator, never transport errors.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Semaphore;

const MAX_ARTICLE_CHARS: usize = 8000;
const MAX_DISCUSSION_COMMENTS: usize = 12;
const HN_ITEM_URL: &str = "https://hacker-news.firebaseio.com/v0/item";

#[async_trait]
pub trait ContentFetch {
    /// Readable article text for a URL, or None when the page cannot be
    /// fetched or yields no usable text. Partial or garbled content is a
    /// failure, not a short success.
    async fn article_text(&self, url: &str) -> Option<String>;

    /// Top-level comment texts for a discussion thread, HTML stripped.
    /// Empty when the thread is missing or the comments are unusable.
    async fn discussion(&self, story_id: u64) -> Vec<String>;
}

pub struct HttpFetcher {
    client: Client,
    semaphore: Arc<Semaphore>,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (compatible; Daybrief/1.0)")
            .build()
            .context("Failed to create HTTP client")?;

        let semaphore = Arc::new(Semaphore::new(10));

        Ok(Self { client, semaphore })
    }

    async fn try_fetch_article(&self, url: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send HTTP request")?;

        let status = response.status();
        if status == 401 || status == 403 || status == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            anyhow::bail!("HTTP error: {}", status);
        }

        let html = response.text().await?;
        let text = html2text::from_read(html.as_bytes(), 100);
        let text = text.trim();

        if text.len() < 100 {
            return Ok(None);
        }

        Ok(Some(truncate_chars(text, MAX_ARTICLE_CHARS).to_string()))
    }

    async fn fetch_comment(&self, comment_id: u64) -> Option<String> {
        #[derive(Deserialize)]
        struct HnComment {
            #[serde(rename = "type")]
            kind: Option<String>,
            text: Option<String>,
        }

        let url = format!("{}/{}.json", HN_ITEM_URL, comment_id);
        let comment: HnComment = self.client.get(&url).send().await.ok()?.json().await.ok()?;

        if comment.kind.as_deref() != Some("comment") {
            return None;
        }
        let html = comment.text?;
        let text = html2text::from_read(html.as_bytes(), 10_000);
        let text = crate::summarizer::collapse_whitespace(&text);

        // Too short to carry an insight, too long to quote from.
        if text.len() > 80 && text.len() < 900 {
            Some(text)
        } else {
            None
        }
    }
}

#[async_trait]
impl ContentFetch for HttpFetcher {
    async fn article_text(&self, url: &str) -> Option<String> {
        let _permit = self.semaphore.acquire().await.ok()?;

        for attempt in 0..3 {
            match self.try_fetch_article(url).await {
                Ok(content) => return content,
                Err(e) => {
                    if attempt == 2 {
                        eprintln!("Failed to fetch {}: {}", url, e);
                        return None;
                    }
                    let backoff = std::time::Duration::from_millis(500 * (2_u64.pow(attempt)));
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        None
    }

    async fn discussion(&self, story_id: u64) -> Vec<String> {
        #[derive(Deserialize)]
        struct HnStoryKids {
            kids: Option<Vec<u64>>,
        }

        let url = format!("{}/{}.json", HN_ITEM_URL, story_id);
        let story: HnStoryKids = match self.client.get(&url).send().await {
            Ok(resp) => match resp.json().await {
                Ok(s) => s,
                Err(_) => return Vec::new(),
            },
            Err(_) => return Vec::new(),
        };

        let kids = match story.kids {
            Some(kids) => kids,
            None => return Vec::new(),
        };

        stream::iter(kids.into_iter().take(MAX_DISCUSSION_COMMENTS))
            .map(|id| self.fetch_comment(id))
            .buffer_unordered(5)
            .filter_map(|c| async move { c })
            .collect()
            .await
    }
}

fn truncate_chars(text: &str, max_len: usize) -> &str {
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

    #[test]
    fn test_truncate_chars_respects_boundary() {
        let text = format!("{}日本語", "a".repeat(7998));
        let out = truncate_chars(&text, 8000);
        assert!(out.len() <= 8000);
        assert!(out.is_char_boundary(out.len()));
    }

    #[test]
    fn test_truncate_chars_short_input_untouched() {
        assert_eq!(truncate_chars("short", 8000), "short");
    }
}
