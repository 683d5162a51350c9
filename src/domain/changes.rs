// src/domain/changes.rs

use crate::domain::listing::Record;

/// A single reportable event between two snapshots.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    New { current: Record },
    Removed { previous: Record },
    /// Both prices are present and differ.
    PriceChanged { current: Record, previous: Record },
}

impl Change {
    /// The record the change is about, from the newest side available.
    pub fn record(&self) -> &Record {
        match self {
            Change::New { current } | Change::PriceChanged { current, .. } => current,
            Change::Removed { previous } => previous,
        }
    }

    /// `current - previous` for price changes.
    pub fn price_delta(&self) -> Option<i64> {
        match self {
            Change::PriceChanged { current, previous } => Some(current.price? - previous.price?),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Change::New { .. } => "new",
            Change::Removed { .. } => "removed",
            Change::PriceChanged { .. } => "price_changed",
        }
    }
}

/// DiffEngine output, one list per category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub new: Vec<Change>,
    pub removed: Vec<Change>,
    pub price_changed: Vec<Change>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.removed.is_empty() && self.price_changed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.new.len() + self.removed.len() + self.price_changed.len()
    }

    /// Delivery order: new offers, then price changes, then removals.
    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.new
            .iter()
            .chain(self.price_changed.iter())
            .chain(self.removed.iter())
    }
}

/// Overall classification of a run, handed to the external workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    NoChange,
    NewOrPriceChange,
    RemovedPresent,
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::NoChange => "none",
            RunOutcome::NewOrPriceChange => "new",
            RunOutcome::RemovedPresent => "update",
        }
    }
}
