//! Command-line front end for mathnote.
//!
//! Results and history go to stdout; tracing output goes to stderr so
//! `--json` output stays machine readable.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use mathnote::{MathNoteConfig, MathNoteService};
use mathnote_search::{SearchHistory, SearchResult, SearchSource};

#[derive(Debug, Parser)]
#[command(name = "mathnote", version, about = "Relevance-ranked math search with history")]
struct Cli {
    /// Config file (defaults to the platform config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Search the configured sources and record the query.
    Search {
        query: String,
        /// Restrict to these sources (google, bing, arxiv). Repeatable.
        #[arg(long = "source", value_parser = parse_source)]
        sources: Vec<SearchSource>,
        /// Maximum number of results.
        #[arg(long)]
        max: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// List past searches, newest first.
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Only searches whose extracted keywords include this one.
        #[arg(long, conflicts_with = "query")]
        keyword: Option<String>,
        /// Only searches whose query text contains this.
        #[arg(long)]
        query: Option<String>,
        /// Print totals instead of rows.
        #[arg(long)]
        stats: bool,
        #[arg(long)]
        json: bool,
    },
    /// Delete history older than the retention period.
    Prune {
        /// Override the configured retention in days.
        #[arg(long)]
        days: Option<u32>,
    },
    /// Delete a single history entry.
    Forget { id: i64 },
}

fn parse_source(raw: &str) -> Result<SearchSource, String> {
    match raw.parse::<SearchSource>() {
        Ok(SearchSource::Other) => Err("source 'other' cannot be searched".into()),
        Ok(source) => Ok(source),
        Err(e) => Err(e.to_string()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = MathNoteConfig::load(cli.config.as_deref()).context("loading config")?;
    config.apply_env_overrides();
    let service = MathNoteService::open(&config).context("starting mathnote")?;

    match cli.command {
        Command::Search {
            query,
            sources,
            max,
            json,
        } => {
            let results = service.search(&query, &sources, max).await?;
            print_results(&results, json)?;
        }
        Command::History {
            limit,
            keyword,
            query,
            stats,
            json,
        } => {
            if stats {
                let stats = service.history_statistics()?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                } else {
                    println!("searches: {}", stats.total);
                    println!("average results: {:.1}", stats.average_result_count);
                    if let (Some(first), Some(last)) = (stats.earliest, stats.latest) {
                        println!("range: {} .. {}", first.to_rfc3339(), last.to_rfc3339());
                    }
                }
                return Ok(());
            }
            let rows = match (keyword, query) {
                (Some(keyword), _) => {
                    let mut rows = service.history_for_keyword(&keyword)?;
                    rows.truncate(limit);
                    rows
                }
                (None, Some(text)) => service.search_history_text(&text, limit)?,
                (None, None) => service.recent_history(limit)?,
            };
            print_history(&rows, json)?;
        }
        Command::Prune { days } => {
            let deleted = service.prune_history(days)?;
            println!("deleted {deleted} history entries");
        }
        Command::Forget { id } => {
            service.forget(id)?;
            println!("deleted history entry {id}");
        }
    }

    Ok(())
}

fn print_results(results: &[SearchResult], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }
    if results.is_empty() {
        println!("no results");
    }
    for (rank, result) in results.iter().enumerate() {
        let marker = if result.math_content_detected() { " [math]" } else { "" };
        println!(
            "{:>2}. {:.3} [{}]{} {}",
            rank + 1,
            result.relevance_score(),
            result.source(),
            marker,
            result.title()
        );
        println!("    {}", result.url());
        if !result.snippet().is_empty() {
            println!("    {}", result.snippet());
        }
    }
    Ok(())
}

fn print_history(rows: &[SearchHistory], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }
    for row in rows {
        let id = row.id.map(|id| id.to_string()).unwrap_or_default();
        println!(
            "{id:>5}  {}  {}",
            row.timestamp.format("%Y-%m-%d %H:%M"),
            row.summary()
        );
    }
    Ok(())
}
