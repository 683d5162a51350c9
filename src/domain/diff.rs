// src/domain/diff.rs

use crate::domain::changes::{Change, ChangeSet};
use crate::domain::snapshot::Snapshot;

/// Compares two crawls keyed by offer id.
///
/// - ids only in `current` are `New`, in `current` order
/// - ids only in `previous` are `Removed`, in `previous` order
/// - shared ids are `PriceChanged` when both prices are known and differ
///
/// A price that disappears or stays the same is not reported.
pub fn diff(current: &Snapshot, previous: &Snapshot) -> ChangeSet {
    let previous_by_id = previous.by_id();
    let current_by_id = current.by_id();

    let mut changes = ChangeSet::default();

    for offer in current {
        match previous_by_id.get(offer.id.as_str()) {
            None => changes.new.push(Change::New {
                current: offer.clone(),
            }),
            Some(old) => {
                if let (Some(now), Some(before)) = (offer.price, old.price) {
                    if now != before {
                        changes.price_changed.push(Change::PriceChanged {
                            current: offer.clone(),
                            previous: (*old).clone(),
                        });
                    }
                }
            }
        }
    }

    for offer in previous {
        if !current_by_id.contains_key(offer.id.as_str()) {
            changes.removed.push(Change::Removed {
                previous: offer.clone(),
            });
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::listing::Record;

    fn snap(records: &[(&str, Option<i64>)]) -> Snapshot {
        records
            .iter()
            .map(|(id, price)| Record::new(*id, *price))
            .collect()
    }

    fn ids(changes: &[Change]) -> Vec<&str> {
        changes.iter().map(|c| c.record().id.as_str()).collect()
    }

    #[test]
    fn detects_new_removed_and_price_changes() {
        let current = snap(&[("A", Some(100)), ("B", Some(200))]);
        let previous = snap(&[("B", Some(150)), ("C", Some(300))]);

        let changes = diff(&current, &previous);

        assert_eq!(ids(&changes.new), vec!["A"]);
        assert_eq!(ids(&changes.removed), vec!["C"]);
        assert_eq!(changes.price_changed.len(), 1);
        match &changes.price_changed[0] {
            Change::PriceChanged { current, previous } => {
                assert_eq!(current.id, "B");
                assert_eq!(previous.price, Some(150));
                assert_eq!(current.price, Some(200));
            }
            other => panic!("expected PriceChanged, got: {:?}", other),
        }
    }

    #[test]
    fn null_price_is_not_a_price_change() {
        let changes = diff(&snap(&[("X", None)]), &snap(&[("X", Some(500))]));
        assert!(changes.is_empty());

        let changes = diff(&snap(&[("X", Some(500))]), &snap(&[("X", None)]));
        assert!(changes.is_empty());
    }

    #[test]
    fn equal_prices_produce_nothing() {
        let s = snap(&[("A", Some(1)), ("B", None)]);
        assert!(diff(&s, &s).is_empty());
    }

    #[test]
    fn preserves_snapshot_order_within_categories() {
        let current = snap(&[("n3", None), ("n1", None), ("n2", None)]);
        let previous = snap(&[("r2", None), ("r9", None), ("r1", None)]);

        let changes = diff(&current, &previous);
        assert_eq!(ids(&changes.new), vec!["n3", "n1", "n2"]);
        assert_eq!(ids(&changes.removed), vec!["r2", "r9", "r1"]);
    }

    #[test]
    fn empty_previous_reports_everything_new() {
        let current = snap(&[("A", Some(1)), ("B", Some(2))]);
        let changes = diff(&current, &Snapshot::new());
        assert_eq!(changes.new.len(), 2);
        assert!(changes.removed.is_empty());
    }
}
