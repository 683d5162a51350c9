// src/domain/duplicates.rs

use crate::domain::changes::{Change, ChangeSet};

/// Drops `New`/`Removed` pairs that are the same flat re-posted under a new id.
///
/// Each new entry takes the first not-yet-used removed entry with an equal
/// identity key. Matched pairs disappear from both lists; nothing is emitted in
/// their place. Entries without a complete identity key never match.
pub fn reconcile(new_changes: Vec<Change>, removed_changes: Vec<Change>) -> (Vec<Change>, Vec<Change>) {
    let mut consumed = vec![false; removed_changes.len()];
    let mut matched_new = vec![false; new_changes.len()];

    for (n, new_change) in new_changes.iter().enumerate() {
        let Some(key) = new_change.record().identity_key() else {
            continue;
        };

        let hit = removed_changes.iter().enumerate().position(|(r, removed)| {
            !consumed[r] && removed.record().identity_key().as_ref() == Some(&key)
        });

        if let Some(r) = hit {
            log::debug!(
                "♻️ {} looks like a re-post of {}, skipping both",
                new_change.record().id,
                removed_changes[r].record().id
            );
            consumed[r] = true;
            matched_new[n] = true;
        }
    }

    let filtered_new = new_changes
        .into_iter()
        .zip(matched_new)
        .filter_map(|(change, matched)| (!matched).then_some(change))
        .collect();
    let filtered_removed = removed_changes
        .into_iter()
        .zip(consumed)
        .filter_map(|(change, matched)| (!matched).then_some(change))
        .collect();

    (filtered_new, filtered_removed)
}

/// Runs `reconcile` over a whole change set. Price changes pass through.
pub fn reconcile_set(changes: ChangeSet) -> ChangeSet {
    let ChangeSet {
        new,
        removed,
        price_changed,
    } = changes;
    let (new, removed) = reconcile(new, removed);
    ChangeSet {
        new,
        removed,
        price_changed,
    }
}
