// src/tests/utils.rs
use crate::db::{SnapshotStore, StoreError};
use crate::domain::{Record, Snapshot};
use crate::notifier::{Channel, DeliveryError, RetryPolicy};
use crate::runner::{RunOptions, Runner};
use crate::scraper::{PageFetcher, ScraperError};
use std::cell::{Cell, RefCell};
use std::path::PathBuf;

/// Offer with every identity field filled.
pub fn offer(id: &str, price: i64, building: &str, floor: i32, rooms: i32) -> Record {
    Record {
        building_id: Some(building.to_string()),
        floor: Some(floor),
        rooms: Some(rooms),
        ..Record::new(id, Some(price))
    }
}

/// Serves fixed pages; pages past the script repeat the last one,
/// the way the site does once results run out.
pub struct PagedFetcher {
    pages: Vec<Vec<Record>>,
    fail_on: Option<usize>,
    pub calls: Cell<usize>,
}

impl PagedFetcher {
    pub fn new(pages: Vec<Vec<Record>>) -> Self {
        Self {
            pages,
            fail_on: None,
            calls: Cell::new(0),
        }
    }

    pub fn failing_on(mut self, page: usize) -> Self {
        self.fail_on = Some(page);
        self
    }
}

impl PageFetcher for PagedFetcher {
    fn fetch_page(&self, _query: &str, page: usize) -> Result<Vec<Record>, ScraperError> {
        self.calls.set(self.calls.get() + 1);
        if self.fail_on == Some(page) {
            return Err(ScraperError::HttpStatus {
                status: 503,
                url: format!("https://example.test/?p={page}"),
            });
        }
        let idx = (page - 1).min(self.pages.len().saturating_sub(1));
        Ok(self.pages.get(idx).cloned().unwrap_or_default())
    }
}

/// In-memory store; `fail_save` simulates a disk that refuses writes.
#[derive(Default)]
pub struct MemoryStore {
    pub saved: RefCell<Option<Snapshot>>,
    pub fail_save: bool,
    pub saves: Cell<usize>,
}

impl MemoryStore {
    pub fn with(snapshot: Snapshot) -> Self {
        Self {
            saved: RefCell::new(Some(snapshot)),
            ..Default::default()
        }
    }

    pub fn ids(&self) -> Vec<String> {
        self.saved
            .borrow()
            .as_ref()
            .map(|s| s.iter().map(|r| r.id.clone()).collect())
            .unwrap_or_default()
    }
}

impl SnapshotStore for MemoryStore {
    fn load_previous(&self) -> Result<Snapshot, StoreError> {
        self.saved.borrow().clone().ok_or(StoreError::NotFound)
    }

    fn save_current(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        if self.fail_save {
            return Err(StoreError::Internal("disk full".into()));
        }
        self.saves.set(self.saves.get() + 1);
        *self.saved.borrow_mut() = Some(snapshot.clone());
        Ok(())
    }
}

/// Keeps every message it is asked to send.
pub struct RecordingChannel {
    recipients: Vec<String>,
    pub sent: RefCell<Vec<(String, String)>>,
}

impl RecordingChannel {
    pub fn new(recipients: &[&str]) -> Self {
        Self {
            recipients: recipients.iter().map(|r| r.to_string()).collect(),
            sent: RefCell::new(Vec::new()),
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent.borrow().iter().map(|(_, t)| t.clone()).collect()
    }
}

impl Channel for RecordingChannel {
    fn recipients(&self) -> &[String] {
        &self.recipients
    }

    fn send(&self, recipient: &str, text: &str) -> Result<(), DeliveryError> {
        self.sent
            .borrow_mut()
            .push((recipient.to_string(), text.to_string()));
        Ok(())
    }
}

pub fn no_wait() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 2,
        base_delay_ms: 0,
        max_delay_ms: 0,
    }
}

pub fn runner<'a>(
    fetcher: &'a PagedFetcher,
    store: &'a MemoryStore,
    channel: &'a RecordingChannel,
    trigger_file: Option<PathBuf>,
) -> Runner<'a> {
    Runner {
        fetcher,
        store,
        journal: None,
        channel: Some(channel),
        retry: no_wait(),
        options: RunOptions {
            max_pages: 10,
            dry_run: false,
            summary: false,
            trigger_file,
        },
    }
}
