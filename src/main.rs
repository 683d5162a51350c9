use crate::config::{search_url, AppConfig, ConfigError};
use crate::db::{get_recent_runs, Database, JsonSnapshotStore, RunJournal, SnapshotStore, SqliteSnapshotStore};
use crate::errors::AppError;
use crate::notifier::{Channel, TelegramChannel};
use crate::runner::{RunOptions, Runner};
use crate::scraper::CianScraper;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod config;
mod db;
mod domain;
mod errors;
mod notifier;
mod runner;
mod scraper;
mod trigger;

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StoreKind {
    Sqlite,
    Json,
}

/// Watches a cian rental search and reports new, removed and re-priced offers
#[derive(Parser, Debug)]
#[command(name = "offer_tracker")]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON config file (search filters, telegram, retry settings)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where the previous snapshot is kept
    #[arg(short, long, default_value = "data/offers.sqlite3")]
    store: PathBuf,

    /// Snapshot storage format
    #[arg(long, value_enum, default_value_t = StoreKind::Sqlite)]
    store_kind: StoreKind,

    /// Upper bound on result pages per crawl (overrides the config)
    #[arg(long)]
    max_pages: Option<usize>,

    /// File the CI workflow polls for follow-up runs
    #[arg(long, default_value = "data/workflow_trigger")]
    trigger_file: PathBuf,

    /// Run everything but send no messages
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Send a counts message after the change messages
    #[arg(long, default_value_t = false)]
    summary: bool,

    /// Repeat every N minutes instead of running once
    #[arg(long)]
    interval_minutes: Option<u64>,

    /// Print recent runs from the SQLite journal and exit
    #[arg(long, default_value_t = false)]
    history: bool,
}

fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        log::error!("❌ {e}");
        if keeps_previous_snapshot(&e) {
            log::error!("🛡️ Previous snapshot left untouched");
        }
        std::process::exit(1);
    }
}

/// A trigger failure comes after the new snapshot was saved.
fn keeps_previous_snapshot(err: &AppError) -> bool {
    !matches!(err, AppError::Trigger(_))
}

fn ensure_parent_dir(path: &Path) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| AppError::Persistence(e.into()))?;
    }
    Ok(())
}

fn run(args: Args) -> Result<(), AppError> {
    let mut cfg = AppConfig::load(args.config.as_deref())?;
    cfg.apply_env(|key| std::env::var(key).ok());
    if let Some(max_pages) = args.max_pages {
        cfg.max_pages = max_pages;
    }
    cfg.validate()?;

    ensure_parent_dir(&args.store)?;

    let sqlite;
    let json;
    let (store, journal): (&dyn SnapshotStore, Option<&dyn RunJournal>) = match args.store_kind {
        StoreKind::Sqlite => {
            sqlite = SqliteSnapshotStore::new(Database::new(&args.store));
            log::info!("💾 SQLite store: {}", sqlite.database().path().display());
            (&sqlite, Some(&sqlite))
        }
        StoreKind::Json => {
            json = JsonSnapshotStore::new(&args.store);
            log::info!("💾 JSON store: {}", args.store.display());
            (&json, None)
        }
    };

    if args.history {
        return print_history(&args, journal.is_some());
    }

    let query = search_url(&cfg.search).map_err(ConfigError::from)?.to_string();
    let fetcher = CianScraper::new(cfg.fetch.clone())?;

    let telegram = if args.dry_run {
        None
    } else {
        let channel = TelegramChannel::new(&cfg.telegram)?;
        match channel.check_connection() {
            Ok(username) => log::info!(
                "✅ Bot connected: @{username}, {} chat(s)",
                channel.recipients().len()
            ),
            Err(e) => log::warn!("⚠️ Bot check failed, will still try to send: {e}"),
        }
        Some(channel)
    };

    let runner = Runner {
        fetcher: &fetcher,
        store,
        journal,
        channel: telegram.as_ref().map(|c| c as &dyn Channel),
        retry: cfg.retry.clone(),
        options: RunOptions {
            max_pages: cfg.max_pages,
            dry_run: args.dry_run,
            summary: args.summary,
            trigger_file: Some(args.trigger_file.clone()),
        },
    };

    match args.interval_minutes {
        None => {
            let summary = runner.run(&query)?;
            log::info!(
                "Run complete: {} offers over {} page(s), outcome={}",
                summary.records_seen,
                summary.pages_fetched,
                summary.outcome.as_str()
            );
            if let Some(report) = &summary.delivery {
                log::info!(
                    "📨 {} message(s): {} delivered, {} failed",
                    report.messages,
                    report.delivered,
                    report.failed
                );
            }
            Ok(())
        }
        Some(minutes) => {
            let pause = Duration::from_secs(minutes.max(1) * 60);
            log::info!("Running every {} minute(s)", minutes.max(1));
            loop {
                match runner.run(&query) {
                    Ok(summary) => log::info!(
                        "Run complete: {} change(s), outcome={}",
                        summary.changes.len(),
                        summary.outcome.as_str()
                    ),
                    Err(e) if keeps_previous_snapshot(&e) => {
                        log::error!("❌ Run failed, keeping previous snapshot: {e}")
                    }
                    Err(e) => log::error!("❌ Run failed after saving: {e}"),
                }
                std::thread::sleep(pause);
            }
        }
    }
}

fn print_history(args: &Args, has_journal: bool) -> Result<(), AppError> {
    if !has_journal {
        return Err(ConfigError::Invalid("--history needs --store-kind sqlite".into()).into());
    }
    let store = SqliteSnapshotStore::new(Database::new(&args.store));
    for run in get_recent_runs(&store, 20)? {
        let status = if run.success { "ok" } else { "FAILED" };
        let took = run
            .finished_at
            .map(|end| format!("{}s", (end - run.started_at).num_seconds()))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "#{:<5} {} {:>5}  {:<6}  pages={:<3} offers={:<4} new={} price={} removed={} {}",
            run.id,
            run.started_at.format("%Y-%m-%d %H:%M"),
            took,
            status,
            run.pages_fetched.unwrap_or(0),
            run.records_seen.unwrap_or(0),
            run.new_count.unwrap_or(0),
            run.price_changed_count.unwrap_or(0),
            run.removed_count.unwrap_or(0),
            run.error_message.unwrap_or_default()
        );
        log::debug!("run #{} query: {}", run.id, run.query);
    }
    Ok(())
}
