//! Delivery history and feedback, tracked in SQLite. The pipeline reads one
//! URL snapshot per run; writing back happens only after assembly, from the
//! CLI.

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::models::{RawMetrics, SummarizedItem};

pub struct Database {
    conn: Connection,
}

#[derive(Debug)]
pub struct ItemRecord {
    pub id: i64,
    pub source: String,
    pub title: String,
    pub url: String,
    pub avg_rating: Option<f64>,
}

#[derive(Debug)]
pub struct EmailRecord {
    pub id: i64,
    pub sent_at: String,
    pub subject: String,
    pub sources: Vec<String>,
    pub items: Vec<ItemRecord>,
}

#[derive(Debug)]
pub struct SourceStats {
    pub source: String,
    pub avg_rating: f64,
    pub count: i64,
}

#[derive(Debug)]
pub struct TopItem {
    pub title: String,
    pub source: String,
    pub category: String,
    pub rating: f64,
    pub comments: Option<String>,
}

impl Database {
    pub fn default_path() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .context("Could not determine local data directory")?
            .join("daybrief");
        std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;
        Ok(data_dir.join("daybrief.db"))
    }

    pub fn open(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS emails (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sent_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                subject TEXT,
                recipient TEXT,
                html_path TEXT,
                summary TEXT,
                sources_json TEXT
            );

            CREATE TABLE IF NOT EXISTS items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email_id INTEGER,
                source TEXT,
                source_id TEXT,
                title TEXT,
                url TEXT UNIQUE,
                category TEXT,
                summary TEXT,
                potential_score REAL,
                hn_points INTEGER,
                hn_comments INTEGER,
                arxiv_authors TEXT,
                FOREIGN KEY (email_id) REFERENCES emails(id)
            );

            CREATE TABLE IF NOT EXISTS feedback (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                item_id INTEGER,
                email_id INTEGER,
                rating INTEGER,
                comment TEXT,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (item_id) REFERENCES items(id),
                FOREIGN KEY (email_id) REFERENCES emails(id)
            );

            CREATE INDEX IF NOT EXISTS idx_items_url ON items(url);
            CREATE INDEX IF NOT EXISTS idx_items_source ON items(source);
            CREATE INDEX IF NOT EXISTS idx_feedback_item ON feedback(item_id);",
        )
        .context("Failed to initialize database schema")?;
        Ok(Self { conn })
    }

    /// Snapshot of every URL ever delivered, read once per pipeline run.
    pub fn delivered_urls(&self) -> Result<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT url FROM items")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut urls = HashSet::new();
        for row in rows {
            urls.insert(row?);
        }
        Ok(urls)
    }

    pub fn has_been_sent(&self, url: &str) -> Result<bool> {
        let mut stmt = self.conn.prepare("SELECT 1 FROM items WHERE url = ?1")?;
        let found = stmt.exists([url])?;
        Ok(found)
    }

    /// Record a delivered email and its items. Returns the email id.
    pub fn record_email(
        &mut self,
        subject: &str,
        recipient: &str,
        html_path: &Path,
        items: &[SummarizedItem],
    ) -> Result<i64> {
        let tx = self.conn.transaction()?;

        let mut sources: Vec<&str> = items.iter().map(|i| i.candidate.source.tag()).collect();
        sources.sort_unstable();
        sources.dedup();
        let sources_json = serde_json::to_string(&sources)?;

        tx.execute(
            "INSERT INTO emails (subject, recipient, html_path, summary, sources_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                subject,
                recipient,
                html_path.display().to_string(),
                format!("{} items", items.len()),
                sources_json,
            ],
        )?;
        let email_id = tx.last_insert_rowid();

        for item in items {
            let candidate = &item.candidate;
            let (hn_points, hn_comments) = match &candidate.metrics {
                RawMetrics::HackerNews {
                    points, comments, ..
                } => (*points, *comments),
                _ => (0, 0),
            };
            let authors_json = match &candidate.metrics {
                RawMetrics::Arxiv { authors, .. } => serde_json::to_string(authors)?,
                _ => "[]".to_string(),
            };

            tx.execute(
                "INSERT OR IGNORE INTO items
                 (email_id, source, source_id, title, url, category, summary,
                  potential_score, hn_points, hn_comments, arxiv_authors)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                rusqlite::params![
                    email_id,
                    candidate.source.tag(),
                    candidate.source_id(),
                    candidate.title,
                    candidate.url,
                    candidate.category_hint.as_deref().unwrap_or(""),
                    item.executive_summary,
                    candidate.potential_score,
                    hn_points,
                    hn_comments,
                    authors_json,
                ],
            )?;
        }

        tx.commit()?;
        Ok(email_id)
    }

    pub fn add_feedback(&self, item_id: i64, rating: u8, comment: &str) -> Result<bool> {
        if !(1..=5).contains(&rating) {
            anyhow::bail!("rating must be between 1 and 5, got {}", rating);
        }

        let email_id: Option<i64> = self
            .conn
            .query_row(
                "SELECT email_id FROM items WHERE id = ?1",
                [item_id],
                |row| row.get(0),
            )
            .ok();

        let email_id = match email_id {
            Some(id) => id,
            None => return Ok(false),
        };

        self.conn.execute(
            "INSERT INTO feedback (item_id, email_id, rating, comment)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![item_id, email_id, rating, comment],
        )?;
        Ok(true)
    }

    pub fn find_item_by_url(&self, url: &str) -> Result<Option<i64>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM items WHERE url = ?1 ORDER BY id DESC LIMIT 1",
                [url],
                |row| row.get(0),
            )
            .ok();
        Ok(id)
    }

    pub fn recent_emails(&self, limit: usize) -> Result<Vec<EmailRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, sent_at, subject, sources_json
             FROM emails ORDER BY sent_at DESC LIMIT ?1",
        )?;
        let emails: Vec<(i64, String, String, Option<String>)> = stmt
            .query_map([limit as i64], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<std::result::Result<_, _>>()?;

        let mut records = Vec::with_capacity(emails.len());
        for (id, sent_at, subject, sources_json) in emails {
            let sources = sources_json
                .as_deref()
                .and_then(|j| serde_json::from_str(j).ok())
                .unwrap_or_default();

            let mut item_stmt = self.conn.prepare(
                "SELECT i.id, i.source, i.title, i.url, AVG(f.rating)
                 FROM items i
                 LEFT JOIN feedback f ON i.id = f.item_id
                 WHERE i.email_id = ?1
                 GROUP BY i.id",
            )?;
            let items: Vec<ItemRecord> = item_stmt
                .query_map([id], |row| {
                    Ok(ItemRecord {
                        id: row.get(0)?,
                        source: row.get(1)?,
                        title: row.get(2)?,
                        url: row.get(3)?,
                        avg_rating: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<_, _>>()?;

            records.push(EmailRecord {
                id,
                sent_at,
                subject,
                sources,
                items,
            });
        }
        Ok(records)
    }

    pub fn feedback_stats(&self) -> Result<Vec<SourceStats>> {
        let mut stmt = self.conn.prepare(
            "SELECT i.source, AVG(f.rating), COUNT(*)
             FROM feedback f
             JOIN items i ON f.item_id = i.id
             GROUP BY i.source",
        )?;
        let stats = stmt
            .query_map([], |row| {
                Ok(SourceStats {
                    source: row.get(0)?,
                    avg_rating: row.get(1)?,
                    count: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<_, _>>()?;
        Ok(stats)
    }

    pub fn top_items(&self, min_rating: f64, limit: usize) -> Result<Vec<TopItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT i.title, i.source, i.category,
                    AVG(f.rating) as rating,
                    GROUP_CONCAT(f.comment) as comments
             FROM feedback f
             JOIN items i ON f.item_id = i.id
             GROUP BY i.id
             HAVING AVG(f.rating) >= ?1
             ORDER BY AVG(f.rating) DESC
             LIMIT ?2",
        )?;
        let items = stmt
            .query_map(rusqlite::params![min_rating, limit as i64], |row| {
                Ok(TopItem {
                    title: row.get(0)?,
                    source: row.get(1)?,
                    category: row.get(2)?,
                    rating: row.get(3)?,
                    comments: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<_, _>>()?;
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::hn_candidate;
    use crate::quality::QualityScore;

    fn memory_db() -> Database {
        Database::init(Connection::open_in_memory().unwrap()).unwrap()
    }

    fn item(url: &str) -> SummarizedItem {
        SummarizedItem {
            candidate: hn_candidate(url, 100, 50),
            extraction_success: true,
            executive_summary: "Summary text.".to_string(),
            significance: "Why it matters.".to_string(),
            discussion_synthesis: None,
            quality: QualityScore {
                extraction_success: true,
                coherence: 0.8,
                completeness: 0.8,
                significance_accuracy: 0.8,
                discussion_quality: 0.0,
            },
        }
    }

    #[test]
    fn test_new_url_has_not_been_sent() {
        let db = memory_db();
        assert!(!db.has_been_sent("https://example.com/new").unwrap());
        assert!(db.delivered_urls().unwrap().is_empty());
    }

    #[test]
    fn test_record_email_marks_urls_delivered() {
        let mut db = memory_db();
        let items = vec![item("https://example.com/1"), item("https://example.com/2")];

        let email_id = db
            .record_email("Daybrief", "me@example.com", Path::new("/tmp/d.html"), &items)
            .unwrap();
        assert_eq!(email_id, 1);
        assert!(db.has_been_sent("https://example.com/1").unwrap());

        let urls = db.delivered_urls().unwrap();
        assert_eq!(urls.len(), 2);
        assert!(urls.contains("https://example.com/2"));
    }

    #[test]
    fn test_feedback_round_trip() {
        let mut db = memory_db();
        db.record_email("Daybrief", "me@example.com", Path::new("/tmp/d.html"), &[item("https://example.com/1")])
            .unwrap();

        let item_id = db.find_item_by_url("https://example.com/1").unwrap().unwrap();
        assert!(db.add_feedback(item_id, 5, "great pick").unwrap());

        let stats = db.feedback_stats().unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].source, "hn");
        assert_eq!(stats[0].count, 1);
        assert!((stats[0].avg_rating - 5.0).abs() < 1e-9);

        let top = db.top_items(4.0, 10).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].comments.as_deref(), Some("great pick"));
    }

    #[test]
    fn test_feedback_on_unknown_item_is_rejected() {
        let db = memory_db();
        assert!(!db.add_feedback(42, 3, "").unwrap());
        assert!(db.add_feedback(1, 9, "").is_err());
    }

    #[test]
    fn test_recent_emails_include_items() {
        let mut db = memory_db();
        db.record_email("First", "me@example.com", Path::new("/tmp/1.html"), &[item("https://a.com")])
            .unwrap();

        let emails = db.recent_emails(10).unwrap();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].subject, "First");
        assert_eq!(emails[0].sources, vec!["hn".to_string()]);
        assert_eq!(emails[0].items.len(), 1);
        assert!(emails[0].items[0].avg_rating.is_none());
    }
}
