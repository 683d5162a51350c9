use crate::db::connection::Database;
use crate::db::StoreError;
use crate::domain::{Record, Snapshot};
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Where the previous crawl lives between runs.
pub trait SnapshotStore {
    /// `StoreError::NotFound` when nothing was ever saved.
    fn load_previous(&self) -> Result<Snapshot, StoreError>;
    fn save_current(&self, snapshot: &Snapshot) -> Result<(), StoreError>;
}

/// Snapshot kept in the `snapshot_records` table.
pub struct SqliteSnapshotStore {
    db: Database,
}

impl SqliteSnapshotStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn load_previous(&self) -> Result<Snapshot, StoreError> {
        self.db.with_conn(|conn| {
            let saved: Option<i64> = conn
                .query_row(
                    "SELECT record_count FROM snapshot_meta WHERE id = 1",
                    [],
                    |row| row.get(0),
                )
                .optional()?;
            if saved.is_none() {
                return Err(StoreError::NotFound);
            }

            let mut stmt = conn.prepare(
                r#"
                SELECT offer_id, price, building_id, floor, rooms, attributes
                FROM snapshot_records
                ORDER BY position
                "#,
            )?;

            let rows = stmt.query_map([], |row| {
                Ok((
                    Record {
                        building_id: row.get(2)?,
                        floor: row.get(3)?,
                        rooms: row.get(4)?,
                        ..Record::new(row.get::<_, String>(0)?, row.get(1)?)
                    },
                    row.get::<_, String>(5)?,
                ))
            })?;

            let mut snapshot = Snapshot::new();
            for row in rows {
                let (mut record, attributes) = row?;
                record.attributes = serde_json::from_str::<Map<String, Value>>(&attributes)?;
                snapshot.insert(record);
            }
            Ok(snapshot)
        })
    }

    fn save_current(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let tx = conn.transaction()?;

            tx.execute("DELETE FROM snapshot_records", [])?;
            {
                let mut insert = tx.prepare(
                    r#"
                    INSERT INTO snapshot_records (
                        offer_id, position, price, building_id, floor, rooms, attributes
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    "#,
                )?;
                for (position, record) in snapshot.iter().enumerate() {
                    let attributes = serde_json::to_string(&record.attributes)?;
                    insert.execute(params![
                        record.id,
                        position as i64,
                        record.price,
                        record.building_id,
                        record.floor,
                        record.rooms,
                        attributes
                    ])?;
                }
            }
            tx.execute(
                r#"
                INSERT INTO snapshot_meta (id, saved_at, record_count) VALUES (1, ?1, ?2)
                ON CONFLICT(id) DO UPDATE SET
                    saved_at = excluded.saved_at,
                    record_count = excluded.record_count
                "#,
                params![Utc::now(), snapshot.len() as i64],
            )?;

            tx.commit()?;
            Ok(())
        })
    }
}

/// Snapshot kept as a pretty-printed JSON array of offers.
pub struct JsonSnapshotStore {
    path: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotStore for JsonSnapshotStore {
    fn load_previous(&self) -> Result<Snapshot, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StoreError::NotFound),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&text)?)
    }

    /// Written next to the target first, then renamed over it.
    fn save_current(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(snapshot.records())?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
