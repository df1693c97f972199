use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use shared::{
    email, pipeline::run_pipeline, sources, Assembly, Config, Database, HttpFetcher,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "daybrief")]
#[command(about = "Personalized daily digest: collect, rank, summarize, deliver")]
struct Args {
    /// Path to the config file (defaults to ~/.config/daybrief/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pipeline and write today's digest
    Generate {
        /// Send the digest by email after generating it
        #[arg(long)]
        send: bool,
    },
    /// List recent digests and their items
    List {
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },
    /// Rate a delivered item (by item id or URL)
    Feedback {
        /// Item id or URL
        item: String,
        /// Rating, 1-5
        #[arg(short, long)]
        rating: u8,
        /// Optional comment
        #[arg(short, long)]
        comment: Option<String>,
    },
    /// Show feedback statistics by source
    Stats,
    /// Show top-rated items
    Top {
        #[arg(long, default_value = "4.0")]
        min_rating: f64,
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },
    /// Check whether a URL was already delivered
    Sent { url: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Generate { send } => cmd_generate(args.config.as_deref(), send).await,
        Command::List { limit } => cmd_list(limit),
        Command::Feedback {
            item,
            rating,
            comment,
        } => cmd_feedback(&item, rating, comment.as_deref().unwrap_or("")),
        Command::Stats => cmd_stats(),
        Command::Top { min_rating, limit } => cmd_top(min_rating, limit),
        Command::Sent { url } => cmd_sent(&url),
    }
}

async fn cmd_generate(config_path: Option<&std::path::Path>, send: bool) -> Result<()> {
    // Configuration problems stop the run before any fetching.
    let config = Config::load(config_path)?;
    if send && config.email.is_none() {
        anyhow::bail!(
            "--send requires an email section in the config file \
             (to, from, smtp_host, smtp_username)"
        );
    }

    let mut db = Database::open(None)?;
    let delivered = db.delivered_urls().context("Failed to read delivery history")?;
    let today = Utc::now().date_naive();

    println!("☀️ Daybrief — collecting candidates");
    let pool = sources::collect_candidates(&config, today).await;
    if pool.is_empty() {
        println!("No candidates found from any source. Nothing to do.");
        return Ok(());
    }

    let fetcher = HttpFetcher::new()?;
    let result = run_pipeline(pool, &delivered, &fetcher, &config, today).await;

    println!(
        "Pipeline complete: {} candidates -> {} summarized -> {} selected",
        result.candidates_found,
        result.candidates_summarized,
        result.outcome.selected_count()
    );

    let date_display = Local::now().format("%B %-d, %Y").to_string();
    let subject = format!("Daybrief — {}", date_display);

    let (html, items) = match &result.outcome {
        Assembly::Deliver(batch) => (
            email::generate_email(&batch.items, &date_display),
            batch.items.as_slice(),
        ),
        Assembly::Note(note) => (email::generate_note_email(note, &date_display), &[][..]),
        Assembly::Skip(reason) => {
            println!("Digest skipped: {}", reason);
            return Ok(());
        }
    };

    let output_dir = email::default_output_dir()?;
    let html_path = email::save_email(&html, &output_dir, today)?;
    println!("✓ Digest saved to: {}", html_path.display());

    if send {
        if let Some(email_config) = config.email.as_ref() {
            println!("📧 Sending to {}...", email_config.to);
            email::send_email(&html, &subject, email_config)
                .await
                .context("Failed to send digest")?;
            println!("✓ Sent");

            if !items.is_empty() {
                let email_id = db
                    .record_email(&subject, &email_config.to, &html_path, items)
                    .context("Failed to record delivery")?;
                println!("✓ Recorded as digest #{}", email_id);
            }
        }
    }

    Ok(())
}

fn cmd_list(limit: usize) -> Result<()> {
    let db = Database::open(None)?;
    let emails = db.recent_emails(limit)?;

    if emails.is_empty() {
        println!("No digests delivered yet.");
        return Ok(());
    }

    for record in emails {
        println!("\n[{}] {}", record.id, record.sent_at);
        println!("    Subject: {}", record.subject);
        println!("    Sources: {}", record.sources.join(", "));
        for item in record.items {
            let rating = match item.avg_rating {
                Some(r) => format!("★{:.1}", r),
                None => "☆".to_string(),
            };
            println!("    - [{}] {} (ID: {})", rating, truncate(&item.title, 60), item.id);
        }
    }
    Ok(())
}

fn cmd_feedback(item: &str, rating: u8, comment: &str) -> Result<()> {
    let db = Database::open(None)?;

    let item_id = if let Ok(id) = item.parse::<i64>() {
        Some(id)
    } else {
        db.find_item_by_url(item)?
    };

    let item_id = item_id.ok_or_else(|| anyhow::anyhow!("Item not found: {}", item))?;

    if db.add_feedback(item_id, rating, comment)? {
        println!("Feedback recorded: {}/5 for item {}", rating, item_id);
    } else {
        anyhow::bail!("Item not found: {}", item);
    }
    Ok(())
}

fn cmd_stats() -> Result<()> {
    let db = Database::open(None)?;
    let stats = db.feedback_stats()?;

    if stats.is_empty() {
        println!("No feedback recorded yet.");
        return Ok(());
    }

    println!("\nFeedback by source:");
    for s in stats {
        println!("  {:<10} {:.1}/5 ({} ratings)", s.source, s.avg_rating, s.count);
    }
    Ok(())
}

fn cmd_top(min_rating: f64, limit: usize) -> Result<()> {
    let db = Database::open(None)?;
    let items = db.top_items(min_rating, limit)?;

    println!("\nTop-rated items (>= {:.1}/5):", min_rating);
    for item in items {
        println!("\n  [{:.1}/5] {}", item.rating, truncate(&item.title, 70));
        println!("      Source: {} | {}", item.source, item.category);
        if let Some(comments) = item.comments.filter(|c| !c.is_empty()) {
            println!("      Note: {}", truncate(&comments, 100));
        }
    }
    Ok(())
}

fn cmd_sent(url: &str) -> Result<()> {
    let db = Database::open(None)?;
    if db.has_been_sent(url)? {
        println!("✓ Already delivered: {}", url);
    } else {
        println!("✗ Not yet delivered: {}", url);
    }
    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
