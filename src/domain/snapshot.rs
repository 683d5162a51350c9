// src/domain/snapshot.rs

use crate::domain::listing::Record;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Every offer seen in one crawl, in the order it was first seen.
/// No two records share an id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Record>", into = "Vec<Record>")]
pub struct Snapshot {
    records: Vec<Record>,
    ids: HashSet<String>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the record unless its id is already present. Returns whether it was added.
    pub fn insert(&mut self, record: Record) -> bool {
        if self.ids.contains(&record.id) {
            return false;
        }
        self.ids.insert(record.id.clone());
        self.records.push(record);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn by_id(&self) -> HashMap<&str, &Record> {
        self.records.iter().map(|r| (r.id.as_str(), r)).collect()
    }
}

// First occurrence wins, same as `insert`.
impl From<Vec<Record>> for Snapshot {
    fn from(records: Vec<Record>) -> Self {
        records.into_iter().collect()
    }
}

impl From<Snapshot> for Vec<Record> {
    fn from(snapshot: Snapshot) -> Self {
        snapshot.records
    }
}

impl FromIterator<Record> for Snapshot {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        for record in iter {
            snapshot.insert(record);
        }
        snapshot
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
