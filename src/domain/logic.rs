// src/domain/logic.rs

use crate::domain::changes::{ChangeSet, RunOutcome};

/// Classifies a run for the downstream workflow.
/// A removal outranks new offers and price changes.
pub fn classify_outcome(changes: &ChangeSet) -> RunOutcome {
    if !changes.removed.is_empty() {
        return RunOutcome::RemovedPresent;
    }
    if !changes.new.is_empty() || !changes.price_changed.is_empty() {
        return RunOutcome::NewOrPriceChange;
    }
    RunOutcome::NoChange
}
