use crate::db::snapshots::SqliteSnapshotStore;
use crate::db::StoreError;
use chrono::{DateTime, Utc};
use rusqlite::params;

#[derive(Debug)]
pub struct ScrapeRun {
    pub id: i64,
    pub query: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub pages_fetched: Option<i64>,
    pub records_seen: Option<i64>,
    pub new_count: Option<i64>,
    pub removed_count: Option<i64>,
    pub price_changed_count: Option<i64>,
    pub outcome: Option<String>,
    pub success: bool,
    pub error_message: Option<String>,
}

/// What a finished run reports back to the journal.
#[derive(Debug, Default, Clone)]
pub struct RunStats {
    pub pages_fetched: usize,
    pub records_seen: usize,
    pub new_count: usize,
    pub removed_count: usize,
    pub price_changed_count: usize,
    pub outcome: Option<&'static str>,
}

/// Bookkeeping of crawl runs. Failures here never fail a run.
pub trait RunJournal {
    fn start_run(&self, query: &str) -> Result<i64, StoreError>;
    fn end_run(
        &self,
        run_id: i64,
        stats: &RunStats,
        error: Option<String>,
    ) -> Result<(), StoreError>;
}

impl RunJournal for SqliteSnapshotStore {
    fn start_run(&self, query: &str) -> Result<i64, StoreError> {
        self.database().with_conn(|conn| {
            conn.execute(
                "INSERT INTO scrape_runs (query, started_at, success) VALUES (?1, ?2, 0)",
                params![query, Utc::now()],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn end_run(
        &self,
        run_id: i64,
        stats: &RunStats,
        error: Option<String>,
    ) -> Result<(), StoreError> {
        self.database().with_conn(|conn| {
            conn.execute(
                r#"
                UPDATE scrape_runs SET
                    finished_at = ?1,
                    pages_fetched = ?2,
                    records_seen = ?3,
                    new_count = ?4,
                    removed_count = ?5,
                    price_changed_count = ?6,
                    outcome = ?7,
                    success = ?8,
                    error_message = ?9
                WHERE id = ?10
                "#,
                params![
                    Utc::now(),
                    stats.pages_fetched as i64,
                    stats.records_seen as i64,
                    stats.new_count as i64,
                    stats.removed_count as i64,
                    stats.price_changed_count as i64,
                    stats.outcome,
                    error.is_none(),
                    error,
                    run_id
                ],
            )?;
            Ok(())
        })
    }
}

pub fn get_recent_runs(store: &SqliteSnapshotStore, limit: usize) -> Result<Vec<ScrapeRun>, StoreError> {
    store.database().with_conn(|conn| {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, query, started_at, finished_at, pages_fetched, records_seen,
                   new_count, removed_count, price_changed_count, outcome, success, error_message
            FROM scrape_runs
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(ScrapeRun {
                id: row.get(0)?,
                query: row.get(1)?,
                started_at: row.get(2)?,
                finished_at: row.get(3)?,
                pages_fetched: row.get(4)?,
                records_seen: row.get(5)?,
                new_count: row.get(6)?,
                removed_count: row.get(7)?,
                price_changed_count: row.get(8)?,
                outcome: row.get(9)?,
                success: row.get(10)?,
                error_message: row.get(11)?,
            })
        })?;

        let mut runs = Vec::new();
        for r in rows {
            runs.push(r?);
        }
        Ok(runs)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[test]
    fn runs_are_journaled_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteSnapshotStore::new(Database::new(dir.path().join("runs.sqlite3")));

        let first = store.start_run("https://example.test/?a=1").unwrap();
        store
            .end_run(
                first,
                &RunStats {
                    pages_fetched: 3,
                    records_seen: 42,
                    new_count: 2,
                    outcome: Some("new"),
                    ..Default::default()
                },
                None,
            )
            .unwrap();

        let second = store.start_run("https://example.test/?a=1").unwrap();
        store
            .end_run(second, &RunStats::default(), Some("Page 3 failed".into()))
            .unwrap();

        let runs = get_recent_runs(&store, 10).unwrap();
        assert_eq!(runs.len(), 2);

        assert_eq!(runs[0].id, second);
        assert!(!runs[0].success);
        assert_eq!(runs[0].error_message.as_deref(), Some("Page 3 failed"));

        assert_eq!(runs[1].id, first);
        assert!(runs[1].success);
        assert_eq!(runs[1].pages_fetched, Some(3));
        assert_eq!(runs[1].records_seen, Some(42));
        assert_eq!(runs[1].outcome.as_deref(), Some("new"));
        assert!(runs[1].finished_at.is_some());
    }
}
