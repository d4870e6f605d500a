//! CLI entry point for gutenscroll.

use std::io::{self, IsTerminal};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use gutenscroll_core::catalogue::{
    CatalogueService, DEFAULT_BASE_URL, GutendexClient, HttpTimeouts,
};
use gutenscroll_core::session::{BrowseSession, PageDisposition, SessionOptions};
use gutenscroll_core::url_sync::{self, MemoryLocation};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

mod app_config;
mod cli;
mod output;

use app_config::{FileConfig, VerbositySetting};
use cli::Args;

/// Effective settings after merging CLI flags over the config file.
#[derive(Debug, Clone)]
struct Settings {
    base_url: String,
    timeouts: HttpTimeouts,
    session: SessionOptions,
}

impl Settings {
    fn resolve(args: &Args, file: &FileConfig) -> Self {
        let defaults = SessionOptions::default();
        let timeouts = HttpTimeouts::default();
        Self {
            base_url: args
                .base_url
                .clone()
                .or_else(|| file.base_url.clone())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeouts: HttpTimeouts {
                connect_timeout_secs: file
                    .connect_timeout_secs
                    .unwrap_or(timeouts.connect_timeout_secs),
                read_timeout_secs: file
                    .read_timeout_secs
                    .unwrap_or(timeouts.read_timeout_secs),
            },
            session: SessionOptions {
                debounce: args
                    .debounce_ms
                    .or(file.debounce_ms)
                    .map_or(defaults.debounce, Duration::from_millis),
                scroll_threshold: file.scroll_threshold.unwrap_or(defaults.scroll_threshold),
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    let loaded = app_config::load_default_file_config()?;
    let file_config = loaded.config.unwrap_or_default();

    init_tracing(&args, file_config.verbosity);
    debug!(?args, config_path = ?loaded.path, "CLI arguments parsed");

    let settings = Settings::resolve(&args, &file_config);
    debug!(?settings, "effective settings");

    let client = GutendexClient::with_options(&settings.base_url, settings.timeouts)
        .with_context(|| format!("Failed to create catalogue client for '{}'", settings.base_url))?;
    let service: Arc<dyn CatalogueService> = Arc::new(client);

    let location = MemoryLocation::new(&starting_query(&args));
    let mut session = BrowseSession::new(service, location, settings.session);

    if let Some(id) = args.book {
        return show_book(&session, id).await;
    }
    browse(&mut session, &args).await
}

/// Priority: `RUST_LOG` env var > quiet flag > verbose flag > config file > default (info)
fn init_tracing(args: &Args, configured: Option<VerbositySetting>) {
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => configured.map_or("info", VerbositySetting::level),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// `--url` with language flags folded in. Title and author flags are typed
/// into the session afterwards so they go through the debouncer.
fn starting_query(args: &Args) -> String {
    let mut snapshot = url_sync::parse_query(args.url.as_deref().unwrap_or_default());
    for code in &args.languages {
        if !snapshot.languages.contains(code) {
            snapshot.languages.toggle(code);
            snapshot.page = 1;
        }
    }
    url_sync::to_query(&snapshot)
}

fn spinner(enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

async fn browse(session: &mut BrowseSession<MemoryLocation>, args: &Args) -> Result<()> {
    if let Some(title) = &args.title {
        session.set_title(title.as_str());
    }
    if let Some(author) = &args.author {
        session.set_author(author.as_str());
    }

    let progress = spinner(!args.quiet && io::stderr().is_terminal());
    progress.set_message("Waiting for input to settle...");
    let mut next = match session.settle().await {
        Some(fetch) => Some(fetch),
        None => session.load_initial(),
    };

    info!(key = %session.query_key(), pages = args.pages, "browsing catalogue");
    let mut loaded = 0;
    while let Some(fetch) = next.take() {
        progress.set_message(format!("Loading page {}...", fetch.page()));
        let outcome = fetch.await;
        match session.on_page_loaded(outcome) {
            PageDisposition::Applied => loaded += 1,
            PageDisposition::Stale => {}
            PageDisposition::Failed(error) => {
                warn!(error = %error, "stopping after failed page");
                break;
            }
        }
        if loaded >= args.pages {
            break;
        }
        next = session.request_more();
    }
    progress.finish_and_clear();

    let view = session.view();
    let cache = session.cache();
    print!("{}", output::render_view(&view, |id| cache.is_visited(id)));

    if view.items.is_empty()
        && let Some(error) = view.last_error
    {
        bail!("Catalogue request failed: {error}");
    }
    Ok(())
}

async fn show_book(session: &BrowseSession<MemoryLocation>, id: u64) -> Result<()> {
    let book = session
        .book(id)
        .await
        .with_context(|| format!("Failed to look up book {id}"))?;
    debug!(id, detail_path = %session.detail_path(id), "book loaded");
    print!("{}", output::render_book(&book, &session.list_path()));
    Ok(())
}
