//! SQLite persistence for the import pipeline.
//!
//! All uniqueness invariants (location tuples, photo file paths, tags,
//! metadata keys) are enforced by `ON CONFLICT` clauses in single
//! statements rather than check-then-insert sequences, so re-imports and
//! concurrent workers converge without races.

mod schema;

pub mod locations;
pub mod photos;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

pub use photos::{MetadataNamespace, NewPhoto, PhotoRow};

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("opening database at {}", path.display()))?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(schema::SCHEMA)?;
        Ok(())
    }

    /// Cheap liveness check, run once before a walk starts.
    pub fn ping(&self) -> Result<()> {
        self.conn()
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    /// Borrow the connection for one statement. Workers hold the guard only
    /// for the duration of a single SQL operation, never across image work.
    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::geo::GeoInfo;
    use std::sync::Arc;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    fn geo(continent: &str, country: &str) -> GeoInfo {
        GeoInfo {
            continent: Some(continent.to_string()),
            country: Some(country.to_string()),
            ..GeoInfo::default()
        }
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deep/gallery.db");
        let db = Database::open(&path).unwrap();
        db.initialize().unwrap();
        db.ping().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn resolve_location_is_stable_across_calls() {
        let db = test_db();
        let first = db.resolve_location(&geo("Europe", "France")).unwrap();
        let second = db.resolve_location(&geo("Europe", "France")).unwrap();
        assert_eq!(first, second);
        assert_eq!(db.location_count().unwrap(), 1);
    }

    #[test]
    fn distinct_tuples_get_distinct_ids() {
        let db = test_db();
        let fr = db.resolve_location(&geo("Europe", "France")).unwrap();
        let de = db.resolve_location(&geo("Europe", "Germany")).unwrap();
        assert_ne!(fr, de);
        assert_eq!(db.location_count().unwrap(), 2);
    }

    #[test]
    fn empty_tuple_is_a_single_canonical_location() {
        let db = test_db();
        let a = db.resolve_location(&GeoInfo::default()).unwrap();
        let b = db.resolve_location(&GeoInfo::default()).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, db.resolve_location(&geo("Europe", "France")).unwrap());
    }

    #[test]
    fn tuple_matching_is_case_sensitive() {
        let db = test_db();
        let upper = db.resolve_location(&geo("Europe", "France")).unwrap();
        let lower = db.resolve_location(&geo("Europe", "france")).unwrap();
        assert_ne!(upper, lower);
    }

    #[test]
    fn concurrent_resolvers_converge_on_one_id() {
        let db = Arc::new(test_db());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let db = Arc::clone(&db);
            handles.push(std::thread::spawn(move || {
                db.resolve_location(&GeoInfo {
                    continent: Some("Asia".to_string()),
                    country: Some("Japan".to_string()),
                    province: Some("Kanto".to_string()),
                    city: Some("Tokyo".to_string()),
                    fallback_date: None,
                })
                .unwrap()
            }));
        }
        let ids: Vec<i64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(db.location_count().unwrap(), 1);
    }

    #[test]
    fn find_location_returns_none_for_unknown_tuple() {
        let db = test_db();
        assert!(db.find_location(&geo("Europe", "France")).unwrap().is_none());
        let id = db.resolve_location(&geo("Europe", "France")).unwrap();
        assert_eq!(db.find_location(&geo("Europe", "France")).unwrap(), Some(id));
    }
}
