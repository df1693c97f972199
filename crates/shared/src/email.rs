//! HTML email rendering, file output, and SMTP delivery for the final
//! batch. The pipeline itself knows nothing about any of this; it hands
//! over an ordered batch (or a note) and the CLI drives the rest.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::EmailConfig;
use crate::models::{RawMetrics, SummarizedItem};

/// Render the full digest email.
pub fn generate_email(items: &[SummarizedItem], date_display: &str) -> String {
    let mut html = String::new();
    push_header(&mut html, date_display);

    for item in items {
        push_story(&mut html, item);
    }

    push_footer(&mut html, &format!("{} stories", items.len()));
    html
}

/// Render the short light-content-day note.
pub fn generate_note_email(note: &str, date_display: &str) -> String {
    let mut html = String::new();
    push_header(&mut html, date_display);
    html.push_str("      <div class=\"story\">\n");
    html.push_str(&format!("        <p>{}</p>\n", escape_html(note)));
    html.push_str("      </div>\n");
    push_footer(&mut html, "no stories today");
    html
}

fn push_header(html: &mut String, date_display: &str) {
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("  <meta charset=\"UTF-8\">\n");
    html.push_str("  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    html.push_str("  <title>Daybrief</title>\n");
    html.push_str("  <style>\n");
    html.push_str("    body { margin: 0; padding: 0; font-family: -apple-system, 'Segoe UI', Roboto, sans-serif; background-color: #f5f5f5; color: #1a1a1a; line-height: 1.6; }\n");
    html.push_str("    .container { max-width: 600px; margin: 0 auto; background-color: #ffffff; }\n");
    html.push_str("    .header { background: linear-gradient(135deg, #1a237e 0%, #3949ab 100%); padding: 40px 30px; text-align: center; }\n");
    html.push_str("    .header h1 { margin: 0; color: #ffffff; font-size: 28px; font-weight: 300; letter-spacing: 1px; }\n");
    html.push_str("    .header .date { color: rgba(255,255,255,0.8); font-size: 14px; margin-top: 10px; text-transform: uppercase; letter-spacing: 2px; }\n");
    html.push_str("    .content { padding: 40px 30px; }\n");
    html.push_str("    .story { margin-bottom: 40px; padding-bottom: 40px; border-bottom: 1px solid #e0e0e0; }\n");
    html.push_str("    .story:last-child { border-bottom: none; margin-bottom: 0; padding-bottom: 0; }\n");
    html.push_str("    .category { display: inline-block; font-size: 11px; font-weight: 600; text-transform: uppercase; letter-spacing: 1.5px; color: #3949ab; margin-bottom: 12px; padding: 4px 12px; background: #e8eaf6; border-radius: 4px; }\n");
    html.push_str("    .story h2 { margin: 0 0 18px 0; font-size: 20px; font-weight: 600; line-height: 1.35; }\n");
    html.push_str("    .story h2 a { color: #1a1a1a; text-decoration: none; }\n");
    html.push_str("    .executive-summary { font-size: 15px; line-height: 1.7; color: #333; margin: 18px 0; }\n");
    html.push_str("    .significance { margin: 20px 0; padding: 14px 18px; background: #e3f2fd; border-left: 4px solid #2196f3; font-size: 14px; color: #1565c0; }\n");
    html.push_str("    .significance strong { color: #0d47a1; display: block; margin-bottom: 6px; }\n");
    html.push_str("    .discussion { margin: 20px 0 0 0; padding: 16px 18px; background: #fff8e1; border-left: 4px solid #ffc107; }\n");
    html.push_str("    .discussion-header { font-size: 12px; font-weight: 600; color: #e65100; text-transform: uppercase; letter-spacing: 0.5px; margin-bottom: 10px; }\n");
    html.push_str("    .discussion-text { font-size: 14px; line-height: 1.6; color: #555; }\n");
    html.push_str("    .source { font-size: 12px; color: #888; margin-top: 18px; }\n");
    html.push_str("    .footer { padding: 30px; text-align: center; background-color: #fafafa; border-top: 1px solid #e0e0e0; }\n");
    html.push_str("    .footer p { margin: 0; font-size: 13px; color: #888; }\n");
    html.push_str("  </style>\n</head>\n<body>\n");
    html.push_str("  <div class=\"container\">\n");
    html.push_str("    <div class=\"header\">\n");
    html.push_str("      <h1>Daybrief</h1>\n");
    html.push_str(&format!(
        "      <div class=\"date\">{}</div>\n",
        escape_html(date_display)
    ));
    html.push_str("    </div>\n");
    html.push_str("    <div class=\"content\">\n");
}

fn push_story(html: &mut String, item: &SummarizedItem) {
    let candidate = &item.candidate;
    let chip = match &candidate.category_hint {
        Some(category) => format!(
            "{} · {}",
            candidate.source.tag().to_uppercase(),
            category.to_uppercase()
        ),
        None => candidate.source.tag().to_uppercase(),
    };

    html.push_str("      <div class=\"story\">\n");
    html.push_str(&format!(
        "        <span class=\"category\">{}</span>\n",
        escape_html(&chip)
    ));
    html.push_str(&format!(
        "        <h2><a href=\"{}\">{}</a></h2>\n",
        candidate.url,
        escape_html(&candidate.title)
    ));
    html.push_str(&format!(
        "        <div class=\"executive-summary\">{}</div>\n",
        escape_html(&item.executive_summary)
    ));
    html.push_str("        <div class=\"significance\">\n");
    html.push_str("          <strong>Why this matters:</strong>\n");
    html.push_str(&format!("          {}\n", escape_html(&item.significance)));
    html.push_str("        </div>\n");

    if let Some(synthesis) = &item.discussion_synthesis {
        html.push_str("        <div class=\"discussion\">\n");
        html.push_str("          <div class=\"discussion-header\">Discussion synthesis</div>\n");
        html.push_str(&format!(
            "          <div class=\"discussion-text\">{}</div>\n",
            escape_html(synthesis)
        ));
        html.push_str("        </div>\n");
    }

    if let RawMetrics::Arxiv { authors, .. } = &candidate.metrics {
        if !authors.is_empty() {
            html.push_str(&format!(
                "        <p class=\"source\">{}</p>\n",
                escape_html(&authors.join(", "))
            ));
        }
    }

    html.push_str(&format!(
        "        <p class=\"source\">Read more at <a href=\"{}\">{}</a></p>\n",
        candidate.url,
        candidate.source.tag()
    ));
    html.push_str("      </div>\n");
}

fn push_footer(html: &mut String, count_line: &str) {
    html.push_str("    </div>\n");
    html.push_str("    <div class=\"footer\">\n");
    html.push_str("      <p>Curated by daybrief</p>\n");
    html.push_str(&format!("      <p>{}</p>\n", escape_html(count_line)));
    html.push_str("    </div>\n");
    html.push_str("  </div>\n</body>\n</html>");
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

pub fn default_output_dir() -> Result<PathBuf> {
    let dir = dirs::data_local_dir()
        .context("Could not determine local data directory")?
        .join("daybrief")
        .join("emails");
    fs::create_dir_all(&dir).context("Failed to create email output directory")?;
    Ok(dir)
}

/// Save the rendered email under `<output_dir>/<date>.html`.
pub fn save_email(html: &str, output_dir: &Path, date: NaiveDate) -> Result<PathBuf> {
    fs::create_dir_all(output_dir).context("Failed to create email output directory")?;
    let filepath = output_dir.join(format!("{}.html", date.format("%Y-%m-%d")));
    fs::write(&filepath, html).context("Failed to write email file")?;
    Ok(filepath)
}

/// Send the rendered email over SMTP, with a plain-text alternative for
/// clients that want one.
pub async fn send_email(html: &str, subject: &str, config: &EmailConfig) -> Result<()> {
    let from: Mailbox = config
        .from
        .parse()
        .with_context(|| format!("Invalid from address: {}", config.from))?;
    let to: Mailbox = config
        .to
        .parse()
        .with_context(|| format!("Invalid to address: {}", config.to))?;

    let plain = html2text::from_read(html.as_bytes(), 80);

    let message = Message::builder()
        .from(from)
        .to(to)
        .subject(subject)
        .multipart(MultiPart::alternative_plain_html(plain, html.to_string()))
        .context("Failed to build email message")?;

    let credentials = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());
    let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
        .with_context(|| format!("Invalid SMTP host: {}", config.smtp_host))?
        .credentials(credentials)
        .build();

    mailer.send(message).await.context("Failed to send email")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::hn_candidate;
    use crate::quality::QualityScore;

    fn item(title: &str, synthesis: Option<&str>) -> SummarizedItem {
        let mut candidate = hn_candidate("https://example.com/story", 100, 50);
        candidate.title = title.to_string();
        SummarizedItem {
            candidate,
            extraction_success: true,
            executive_summary: "A two sentence summary. It explains the main point.".to_string(),
            significance: "Infrastructure tooling — directly relevant to your operations work."
                .to_string(),
            discussion_synthesis: synthesis.map(str::to_string),
            quality: QualityScore {
                extraction_success: true,
                coherence: 0.9,
                completeness: 0.9,
                significance_accuracy: 0.9,
                discussion_quality: 0.0,
            },
        }
    }

    #[test]
    fn test_generate_email_contains_story_fields() {
        let items = vec![item("Big News", Some("Commenters discussed tradeoffs."))];
        let html = generate_email(&items, "August 7, 2026");

        assert!(html.contains("Big News"));
        assert!(html.contains("https://example.com/story"));
        assert!(html.contains("A two sentence summary."));
        assert!(html.contains("Why this matters:"));
        assert!(html.contains("Commenters discussed tradeoffs."));
        assert!(html.contains("August 7, 2026"));
        assert!(html.contains("1 stories"));
    }

    #[test]
    fn test_generate_email_escapes_markup() {
        let items = vec![item("Rust <3 & \"lifetimes\"", None)];
        let html = generate_email(&items, "August 7, 2026");

        assert!(html.contains("Rust &lt;3 &amp; &quot;lifetimes&quot;"));
        assert!(!html.contains("Rust <3"));
    }

    #[test]
    fn test_story_without_synthesis_has_no_discussion_block() {
        let items = vec![item("Quiet story", None)];
        let html = generate_email(&items, "August 7, 2026");
        assert!(!html.contains("Discussion synthesis"));
    }

    #[test]
    fn test_note_email_renders_note() {
        let html = generate_note_email("A light day: nothing cleared the bar.", "August 7, 2026");
        assert!(html.contains("A light day"));
        assert!(html.contains("no stories today"));
    }

    #[test]
    fn test_save_email_writes_dated_file() {
        let dir = std::env::temp_dir().join("daybrief-email-test");
        let date = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        let path = save_email("<html></html>", &dir, date).unwrap();

        assert!(path.ends_with("2026-08-07.html"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "<html></html>");
        let _ = fs::remove_file(path);
    }
}
