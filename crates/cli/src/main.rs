mod render;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use data_loader::{KEY_COLUMN, load_table};
use fetch_client::{Fetcher, HttpFetcher, LocalFetcher};
use orchestrator::{NOT_FOUND_MESSAGE, RecommendationOrchestrator, Snapshot};
use serde_json::Value;
use sources::{SourceId, SourcesConfig};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, watch};
use tracing::{info, warn};

/// ArticleRecs - news article recommendations from several models
#[derive(Parser)]
#[command(name = "article-recs")]
#[command(about = "Fetch article recommendations from every configured source", long_about = None)]
struct Cli {
    /// Sources configuration file (TOML); the built-in setup is used when omitted
    #[arg(short, long, env = "ARTICLE_RECS_CONFIG")]
    config: Option<PathBuf>,

    /// Base url that relative source urls are resolved against
    #[arg(long)]
    base_url: Option<String>,

    /// Serve source urls from this directory instead of over HTTP
    #[arg(long, conflicts_with = "base_url")]
    data_root: Option<PathBuf>,

    /// Per-request timeout in seconds (no timeout by default)
    #[arg(long)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get recommendations for a user and article from every enabled source
    Recommend {
        #[arg(long)]
        user_id: String,

        #[arg(long)]
        article_id: String,

        /// Enable a source for this run (repeatable)
        #[arg(long = "enable", value_name = "SOURCE")]
        enable: Vec<SourceId>,

        /// Disable a source for this run (repeatable)
        #[arg(long = "disable", value_name = "SOURCE")]
        disable: Vec<SourceId>,

        /// Print loading transitions as they happen
        #[arg(long)]
        live: bool,

        /// Print the final state as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the configured sources
    Sources,

    /// Look up one article's row in a local CSV file
    Lookup {
        #[arg(long)]
        file: PathBuf,

        #[arg(long)]
        article_id: String,
    },

    /// Dispatch a raw "<url> [lookup key]" descriptor for one source
    Fetch {
        #[arg(long)]
        source: SourceId,

        descriptor: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logs go to stderr so --json output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Recommend {
            user_id,
            article_id,
            enable,
            disable,
            live,
            json,
        } => {
            let mut config = load_config(&cli)?;
            for source in enable {
                config.set_enabled(*source, true)?;
            }
            for source in disable {
                config.set_enabled(*source, false)?;
            }
            handle_recommend(&cli, config, user_id, article_id, *live, *json).await?
        }
        Commands::Sources => handle_sources(&cli)?,
        Commands::Lookup { file, article_id } => handle_lookup(file, article_id)?,
        Commands::Fetch { source, descriptor } => handle_fetch(&cli, *source, descriptor).await?,
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<SourcesConfig> {
    let config = match &cli.config {
        Some(path) => SourcesConfig::load(path)?,
        None => SourcesConfig::reference(),
    };
    Ok(match &cli.base_url {
        Some(base_url) => config.with_base_url(base_url.clone()),
        None => config,
    })
}

fn build_fetcher(cli: &Cli, config: &SourcesConfig) -> Result<Arc<dyn Fetcher>> {
    if let Some(root) = &cli.data_root {
        let fetcher = LocalFetcher::new(root.clone());
        info!("Serving source urls from {}", fetcher.root().display());
        return Ok(Arc::new(fetcher));
    }

    let mut builder = HttpFetcher::builder();
    if let Some(base_url) = &config.base_url {
        builder = builder.base_url(base_url.clone());
    }
    if let Some(secs) = cli.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    let fetcher = builder.build().context("Failed to build HTTP client")?;

    let unresolvable = unresolvable_sources(config, &fetcher);
    if !unresolvable.is_empty() {
        let names: Vec<_> = unresolvable.iter().map(SourceId::as_str).collect();
        warn!(
            "No base url for the relative urls of {}; these sources will fail. \
             Pass --base-url, --data-root, or a --config that sets base_url",
            names.join(", ")
        );
    }
    Ok(Arc::new(fetcher))
}

/// Enabled sources the HTTP fetcher has no way to resolve
fn unresolvable_sources(config: &SourcesConfig, fetcher: &HttpFetcher) -> Vec<SourceId> {
    match fetcher.base_url() {
        Some(_) => Vec::new(),
        None => config.relative_sources(),
    }
}

fn build_orchestrator(cli: &Cli, config: SourcesConfig) -> Result<RecommendationOrchestrator> {
    let fetcher = build_fetcher(cli, &config)?;
    RecommendationOrchestrator::new(config, fetcher)
}

/// Handle the 'recommend' command
async fn handle_recommend(
    cli: &Cli,
    config: SourcesConfig,
    user_id: &str,
    article_id: &str,
    live: bool,
    json: bool,
) -> Result<()> {
    let orchestrator = build_orchestrator(cli, config)?;

    let watcher = live.then(|| {
        let (done_tx, done_rx) = oneshot::channel();
        let handle = tokio::spawn(watch_transitions(orchestrator.subscribe(), done_rx));
        (done_tx, handle)
    });

    let start = Instant::now();
    let submission = orchestrator.try_submit(user_id, article_id)?;
    if submission.is_empty() {
        warn!("No sources are enabled");
    }
    submission.wait().await;

    if let Some((done_tx, handle)) = watcher {
        let _ = done_tx.send(());
        handle.await.context("Transition watcher failed")?;
    }

    let snapshot = orchestrator.snapshot();
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!(
            "{} Recommendations for user {} / article {} ({:?})\n",
            "✓".green(),
            user_id.trim().bold(),
            article_id.trim().bold(),
            start.elapsed()
        );
        render::print_snapshot(&snapshot);
    }
    Ok(())
}

/// Prints each loading flag change until the submission is done
async fn watch_transitions(
    mut rx: watch::Receiver<Snapshot<Value>>,
    mut done: oneshot::Receiver<()>,
) {
    let mut previous = rx.borrow_and_update().loading().clone();
    loop {
        let finished = tokio::select! {
            changed = rx.changed() => changed.is_err(),
            _ = &mut done => true,
        };
        let snapshot = rx.borrow_and_update().clone();
        if let Err(e) = report_transitions(&mut std::io::stderr().lock(), &previous, &snapshot) {
            warn!("Failed to print loading transitions: {}", e);
        }
        previous = snapshot.loading().clone();
        if finished {
            break;
        }
    }
}

/// Writes one line per source whose loading flag changed.
///
/// Goes to stderr from `recommend --live` so stdout stays free for `--json`.
fn report_transitions(
    out: &mut impl Write,
    previous: &BTreeMap<SourceId, bool>,
    snapshot: &Snapshot<Value>,
) -> io::Result<()> {
    for (source, &loading) in snapshot.loading() {
        if previous.get(source) == Some(&loading) {
            continue;
        }
        if loading {
            writeln!(out, "{} {} Loading...", "…".yellow(), render::panel_title(*source))?;
        } else {
            let outcome = match snapshot.get(*source) {
                Some(rec) if rec.is_error() => rec.error().red().to_string(),
                Some(rec) => format!("{} items", rec.data().len()),
                None => String::new(),
            };
            writeln!(out, "{} {} {}", "•".cyan(), render::panel_title(*source), outcome)?;
        }
    }
    Ok(())
}

/// Handle the 'sources' command
fn handle_sources(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;

    match (&cli.data_root, &config.base_url) {
        (Some(root), _) => println!("Reading sources from {}", root.display()),
        (None, Some(base_url)) => println!("Resolving relative urls against {}", base_url),
        (None, None) => println!("No base url configured; source urls must be absolute"),
    }
    println!();

    for spec in &config.sources {
        let name = format!("{:<14}", spec.name.to_string());
        let status = if spec.enabled {
            format!("{:<9}", "enabled").green()
        } else {
            format!("{:<9}", "disabled").dimmed()
        };
        println!(
            "{} {:<8} {} {}",
            name.bold(),
            spec.kind.to_string(),
            status,
            spec.url
        );
    }
    Ok(())
}

/// Handle the 'lookup' command
fn handle_lookup(file: &Path, article_id: &str) -> Result<()> {
    let table = load_table(file)
        .with_context(|| format!("Failed to load table from {}", file.display()))?;
    println!(
        "{} Loaded {} rows ({} columns)",
        "✓".green(),
        table.len(),
        table.header.len()
    );

    match table.find_by(KEY_COLUMN, article_id) {
        Some(record) => {
            println!("{}", format!("Article {}", article_id).bold().blue());
            for (i, value) in record.clone().into_values_without_key().iter().enumerate() {
                println!("  {}. {}", (i + 1).to_string().green(), value);
            }
        }
        None => println!("{}", NOT_FOUND_MESSAGE.red()),
    }
    Ok(())
}

/// Handle the 'fetch' command
async fn handle_fetch(cli: &Cli, source: SourceId, descriptor: &str) -> Result<()> {
    let orchestrator = build_orchestrator(cli, load_config(cli)?)?;
    if !orchestrator.store().is_configured(source) {
        anyhow::bail!("source '{}' is not configured", source);
    }

    orchestrator.dispatcher().fetch_descriptor(source, descriptor).await;

    let snapshot = orchestrator.snapshot();
    if let Some(rec) = snapshot.get(source) {
        render::print_panel(source, snapshot.is_loading(source), rec);
    }
    Ok(())
}
