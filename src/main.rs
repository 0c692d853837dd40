mod api;
mod config;
mod db;
mod dedup;
mod error;
mod fetch;
mod parser;
mod pipeline;

use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use api::Articles;
use config::Settings;
use db::{ArticleId, NoteFields, NoteId, Store};
use error::ApiError;
use fetch::Fetcher;
use pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "surf_headlines", about = "Scrape surf headlines and annotate them")]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the page and store its headlines
    Scrape,
    /// Articles not yet saved, as a table
    Unsaved,
    /// Every stored article as JSON
    List,
    /// One article with its note as JSON
    Show { id: ArticleId },
    /// Attach a new note to an article (replaces any previous note)
    Note {
        id: ArticleId,
        #[arg(short, long, default_value = "")]
        title: String,
        #[arg(short, long, default_value = "")]
        body: String,
    },
    /// Create a note that is not attached to any article yet
    NewNote {
        #[arg(short, long, default_value = "")]
        title: String,
        #[arg(short, long, default_value = "")]
        body: String,
    },
    /// Point an article at an existing note
    Attach { id: ArticleId, note_id: NoteId },
    /// Mark an article as saved
    Save { id: ArticleId },
    /// Clear an article's saved flag
    Unsave { id: ArticleId },
    /// Delete notes no article points to any more
    PruneNotes,
    /// Show store statistics
    Stats,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let result = run(cli).await;

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<ApiError>() {
            Some(ApiError::NotFound(id)) => {
                eprintln!("Not found: no article with id {}", id);
                ExitCode::from(2)
            }
            Some(ApiError::NoteNotFound(id)) => {
                eprintln!("Not found: no note with id {}", id);
                ExitCode::from(2)
            }
            _ => {
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        },
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = cli.settings;
    let store = Store::open(&settings.db_path)
        .with_context(|| format!("Failed to open {}", settings.db_path.display()))?;
    let api = Articles::new(&store);

    match cli.command {
        Commands::Scrape => {
            let fetcher = Fetcher::new(settings.timeout())?;
            let pipeline = Pipeline::new(
                fetcher,
                settings.url.clone(),
                settings.selectors(),
                settings.dedup,
            );

            let pb = ProgressBar::new_spinner();
            pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
            pb.set_message(format!("Scraping {}", settings.url));
            pb.enable_steady_tick(Duration::from_millis(100));
            let outcome = pipeline.run(&store).await;
            pb.finish_and_clear();

            let report = outcome.context("Scrape failed")?;
            println!(
                "Scrape complete: {} new articles ({} found).",
                report.persisted, report.found
            );
        }
        Commands::Unsaved => {
            let rows = api.unsaved()?;
            if rows.is_empty() {
                println!("No unsaved articles. Run 'scrape' first.");
            } else {
                print_table(&rows);
            }
        }
        Commands::List => print_json(&api.all()?)?,
        Commands::Show { id } => print_json(&api.get(id)?)?,
        Commands::Note { id, title, body } => {
            print_json(&api.annotate(id, &NoteFields { title, body })?)?
        }
        Commands::NewNote { title, body } => {
            print_json(&api.create_note(&NoteFields { title, body })?)?
        }
        Commands::Attach { id, note_id } => print_json(&api.attach(id, note_id)?)?,
        Commands::Save { id } => print_json(&api.set_saved(id, true)?)?,
        Commands::Unsave { id } => print_json(&api.set_saved(id, false)?)?,
        Commands::PruneNotes => {
            let removed = store.prune_orphan_notes()?;
            println!("Removed {} orphaned notes.", removed);
        }
        Commands::Stats => {
            let s = store.stats()?;
            println!("Articles:     {}", s.articles);
            println!("Saved:        {}", s.saved);
            println!("Notes:        {}", s.notes);
            println!("Orphan notes: {}", s.orphan_notes);
        }
    }

    store.close()?;
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_table(rows: &[db::Article]) {
    println!("{:>5} | {:<60} | {:<40} | {:<4}", "Id", "Title", "Link", "Note");
    println!("{}", "-".repeat(118));
    for a in rows {
        let note = if a.note_id.is_some() { "yes" } else { "" };
        println!(
            "{:>5} | {:<60} | {:<40} | {:<4}",
            a.id,
            truncate(&a.title, 60),
            truncate(a.link.as_deref().unwrap_or("-"), 40),
            note
        );
    }
    println!("\n{} unsaved articles", rows.len());
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
