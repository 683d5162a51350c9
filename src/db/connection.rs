use crate::db::StoreError;
use rusqlite::Connection;
use std::cell::RefCell;
use std::path::{Path, PathBuf};

const SCHEMA: &str = include_str!("../../sql/schema.sql");

// Thread-local connection slot, tagged with the file it was opened for.
thread_local! {
    static DB_CONN: RefCell<Option<(PathBuf, Connection)>> = RefCell::new(None);
}

#[derive(Clone, Debug)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Provides a mutable connection to the closure.
    /// The connection is opened (and the schema applied) on first use per thread.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError>,
    {
        DB_CONN
            .try_with(|cell| -> Result<T, StoreError> {
                let mut slot = cell.borrow_mut();
                let reuse = matches!(slot.as_ref(), Some((path, _)) if *path == self.path);
                if !reuse {
                    let conn = Connection::open(&self.path)?;
                    init_schema(&conn)?;
                    *slot = Some((self.path.clone(), conn));
                }
                match slot.as_mut() {
                    Some((_, conn)) => f(conn),
                    None => Err(StoreError::Internal("connection slot empty".into())),
                }
            })
            .map_err(|_| StoreError::Internal("thread-local connection unavailable".into()))?
    }
}

/// Applies the schema to an already-open connection (tests, tooling).
pub fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_applies_twice() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('snapshot_meta', 'snapshot_records', 'scrape_runs')",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
    }

    #[test]
    fn switching_paths_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let a = Database::new(dir.path().join("a.sqlite3"));
        let b = Database::new(dir.path().join("b.sqlite3"));

        a.with_conn(|conn| {
            conn.execute(
                "INSERT INTO snapshot_meta (id, saved_at, record_count) VALUES (1, 'x', 5)",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        let in_b: i64 = b
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM snapshot_meta", [], |r| r.get(0))?))
            .unwrap();
        let in_a: i64 = a
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM snapshot_meta", [], |r| r.get(0))?))
            .unwrap();

        assert_eq!(in_b, 0);
        assert_eq!(in_a, 1);
    }
}
