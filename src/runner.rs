// src/runner.rs

use crate::db::{RunJournal, RunStats, SnapshotStore, StoreError};
use crate::domain::{classify_outcome, diff, reconcile_set, Change, ChangeSet, RunOutcome, Snapshot};
use crate::errors::AppError;
use crate::notifier::format::format_rub;
use crate::notifier::{Channel, DeliveryReport, Dispatcher, RetryPolicy};
use crate::scraper::{crawl, PageFetcher};
use crate::trigger::write_trigger;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub max_pages: usize,
    /// Crawl, diff and save as usual, but send nothing.
    pub dry_run: bool,
    /// Follow the change messages with a counts message.
    pub summary: bool,
    pub trigger_file: Option<PathBuf>,
}

#[derive(Debug)]
pub struct RunSummary {
    pub pages_fetched: usize,
    pub records_seen: usize,
    pub changes: ChangeSet,
    pub outcome: RunOutcome,
    pub delivery: Option<DeliveryReport>,
}

impl RunSummary {
    fn stats(&self) -> RunStats {
        RunStats {
            pages_fetched: self.pages_fetched,
            records_seen: self.records_seen,
            new_count: self.changes.new.len(),
            removed_count: self.changes.removed.len(),
            price_changed_count: self.changes.price_changed.len(),
            outcome: Some(self.outcome.as_str()),
        }
    }
}

/// Diff, then fold re-posted offers out of the new/removed lists.
pub fn detect_changes(current: &Snapshot, previous: &Snapshot) -> ChangeSet {
    reconcile_set(diff(current, previous))
}

/// Everything one run needs, injected.
pub struct Runner<'a> {
    pub fetcher: &'a dyn PageFetcher,
    pub store: &'a dyn SnapshotStore,
    pub journal: Option<&'a dyn RunJournal>,
    pub channel: Option<&'a dyn Channel>,
    pub retry: RetryPolicy,
    pub options: RunOptions,
}

impl<'a> Runner<'a> {
    pub fn run(&self, query: &str) -> Result<RunSummary, AppError> {
        let run_id = self.journal.and_then(|j| match j.start_run(query) {
            Ok(id) => Some(id),
            Err(e) => {
                log::warn!("Could not record run start: {e}");
                None
            }
        });

        let result = self.run_inner(query);

        if let (Some(journal), Some(run_id)) = (self.journal, run_id) {
            let (stats, error) = match &result {
                Ok(summary) => (summary.stats(), None),
                Err(e) => (RunStats::default(), Some(e.to_string())),
            };
            if let Err(e) = journal.end_run(run_id, &stats, error) {
                log::warn!("Could not record run end: {e}");
            }
        }

        result
    }

    fn run_inner(&self, query: &str) -> Result<RunSummary, AppError> {
        log::info!("🔍 Search: {query}");

        // Read once up front; a store we cannot read means we cannot diff.
        let previous = match self.store.load_previous() {
            Ok(snapshot) => {
                log::info!("Loaded previous snapshot: {} offers", snapshot.len());
                snapshot
            }
            Err(StoreError::NotFound) => {
                log::info!("No previous snapshot, starting from empty");
                Snapshot::new()
            }
            Err(e) => return Err(e.into()),
        };

        let crawled = crawl(self.fetcher, query, self.options.max_pages)?;
        let changes = detect_changes(&crawled.snapshot, &previous);
        show_changes(&changes);

        // Persist before notifying: never announce something we failed to record.
        self.store.save_current(&crawled.snapshot)?;
        log::info!("💾 Saved {} offers", crawled.snapshot.len());

        let delivery = match self.channel {
            Some(channel) if !self.options.dry_run => {
                let dispatcher = Dispatcher::new(channel, self.retry.clone());
                let report = dispatcher.dispatch(&changes, self.options.summary);
                if report.failed > 0 {
                    log::warn!(
                        "{} of {} deliveries failed",
                        report.failed,
                        report.failed + report.delivered
                    );
                }
                Some(report)
            }
            _ => {
                if !changes.is_empty() {
                    log::info!("🔕 Notifications disabled, {} change(s) not sent", changes.len());
                }
                None
            }
        };

        let outcome = classify_outcome(&changes);
        if let Some(path) = &self.options.trigger_file {
            write_trigger(path, outcome).map_err(AppError::Trigger)?;
        }

        Ok(RunSummary {
            pages_fetched: crawled.pages_fetched,
            records_seen: crawled.snapshot.len(),
            changes,
            outcome,
            delivery,
        })
    }
}

fn price_or_dash(price: Option<i64>) -> String {
    price.map(format_rub).unwrap_or_else(|| "—".to_string())
}

fn show_changes(changes: &ChangeSet) {
    for change in changes.iter() {
        let record = change.record();
        let metro = record.attr("metro").unwrap_or("");
        match change {
            Change::New { .. } => {
                log::info!("🆕 New: {} {} {metro}", record.id, price_or_dash(record.price))
            }
            Change::PriceChanged { current, previous } => log::info!(
                "💰 Price change: {} {} → {}",
                current.id,
                price_or_dash(previous.price),
                price_or_dash(current.price)
            ),
            Change::Removed { .. } => {
                log::info!("❌ Removed: {} {} {metro}", record.id, price_or_dash(record.price))
            }
        }
    }

    log::info!("🆕 NEW OFFERS: {}", changes.new.len());
    log::info!("💰 PRICE CHANGES: {}", changes.price_changed.len());
    log::info!("❌ REMOVED OFFERS: {}", changes.removed.len());
}
