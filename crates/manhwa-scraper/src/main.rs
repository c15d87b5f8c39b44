//! Manhwa scraper CLI application.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use manhwa_scraper::{ApiResponse, HttpFetcher, PageFetcher, QueryOrchestrator, SourceRegistry};
use serde::Serialize;
use shared::{Config, SourceError};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered sources
    Sources,
    /// Search one source
    Search {
        source: String,
        query: String,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Search every registered source
    SearchAll {
        query: String,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Series details with chapter list
    Details { source: String, manga_id: String },
    /// Image URLs of one chapter
    Pages { source: String, chapter_id: String },
    /// Popular series
    Popular {
        source: String,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Recently updated series
    Latest {
        source: String,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
}

/// Print the response envelope as JSON on stdout, reporting whether the query succeeded
fn emit<T: Serialize>(result: Result<T, SourceError>) -> Result<bool> {
    let response = ApiResponse::from_result(result);
    let json = serde_json::to_string_pretty(&response).context("Failed to serialize response")?;
    println!("{}", json);
    Ok(response.success)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Load configuration
    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Initialize logging
    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        config.log_level()
    };

    shared::logging::init(shared::LogConfig {
        log_dir: config.log_dir().to_string_lossy().to_string(),
        component: "manhwa-scraper".to_string(),
        default_level: log_level,
        console: config.logging.console,
        file: config.logging.file,
        json_format: config.logging.json_format,
    })?;

    info!(config_file = %args.config.display(), "Manhwa scraper starting");

    let fetcher: Arc<dyn PageFetcher> =
        Arc::new(HttpFetcher::new(&config.fetcher).context("Failed to create page fetcher")?);
    let registry = Arc::new(SourceRegistry::from_config(&config.sources, fetcher));
    info!(sources = ?registry.ids(), "Source registry ready");

    let orchestrator = QueryOrchestrator::new(registry);

    let success = match args.command {
        Command::Sources => emit(Ok(orchestrator.sources()))?,
        Command::Search { source, query, page } => {
            emit(orchestrator.search(&source, &query, page).await)?
        }
        Command::SearchAll { query, page } => emit(Ok(orchestrator.search_all(&query, page).await))?,
        Command::Details { source, manga_id } => {
            emit(orchestrator.manga_details(&source, &manga_id).await)?
        }
        Command::Pages { source, chapter_id } => {
            emit(orchestrator.chapter_pages(&source, &chapter_id).await)?
        }
        Command::Popular { source, page } => emit(orchestrator.popular(&source, page).await)?,
        Command::Latest { source, page } => emit(orchestrator.latest(&source, page).await)?,
    };

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
