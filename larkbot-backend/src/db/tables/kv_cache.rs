//! Generic key/value cache table.
//!
//! Holds the last-checked marker and per-candidate debug transcripts.

use crate::db::Database;
use chrono::Utc;

impl Database {
    /// Get a cached value by key.
    pub fn get_cached_value(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let conn = self.conn();
        let result = conn.query_row(
            "SELECT value FROM kv_cache WHERE key = ?1",
            rusqlite::params![key],
            |row| row.get(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a key to a value, replacing any previous value.
    pub fn set_cached_value(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO kv_cache (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                            updated_at = excluded.updated_at",
            rusqlite::params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::db::test_support::temp_db;

    #[test]
    fn test_missing_key_returns_none() {
        let (_dir, db) = temp_db();
        assert_eq!(db.get_cached_value("absent").unwrap(), None);
    }

    #[test]
    fn test_set_then_get() {
        let (_dir, db) = temp_db();
        db.set_cached_value("twitter/larkbot/last_checked", "12345")
            .unwrap();
        assert_eq!(
            db.get_cached_value("twitter/larkbot/last_checked").unwrap(),
            Some("12345".to_string())
        );
    }

    #[test]
    fn test_set_overwrites() {
        let (_dir, db) = temp_db();
        db.set_cached_value("k", "first").unwrap();
        db.set_cached_value("k", "second").unwrap();
        assert_eq!(db.get_cached_value("k").unwrap(), Some("second".to_string()));
    }
}
