//! Database operations for the `memories` table.
//!
//! Rows are keyed by deterministic UUIDs, so insertion is idempotent: the
//! same post ingested twice lands on the same row and the second write is
//! dropped.

use crate::db::Database;
use crate::models::InteractionMemory;
use uuid::Uuid;

impl Database {
    /// Get a single memory by its deterministic id.
    pub fn get_memory(&self, id: &Uuid) -> Result<Option<InteractionMemory>, rusqlite::Error> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, room_id, user_id, text, source, in_reply_to, image_urls, created_at
             FROM memories WHERE id = ?1",
        )?;
        let result = stmt.query_row(rusqlite::params![id.to_string()], row_to_memory);
        match result {
            Ok(row) => Ok(Some(row)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Insert a memory unless a row with its id already exists.
    /// Returns true if a row was inserted.
    pub fn create_memory(&self, memory: &InteractionMemory) -> Result<bool, rusqlite::Error> {
        let conn = self.conn();
        let image_urls =
            serde_json::to_string(&memory.image_urls).unwrap_or_else(|_| "[]".to_string());
        let changed = conn.execute(
            "INSERT OR IGNORE INTO memories (
                id, room_id, user_id, text, source, in_reply_to, image_urls, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                memory.id.to_string(),
                memory.room_id.to_string(),
                memory.user_id.to_string(),
                memory.text,
                memory.source,
                memory.in_reply_to.map(|id| id.to_string()),
                image_urls,
                memory.created_at_epoch,
            ],
        )?;
        Ok(changed > 0)
    }

    /// Count total memories in the table.
    pub fn count_memories(&self) -> Result<i64, rusqlite::Error> {
        let conn = self.conn();
        conn.query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))
    }
}

fn row_to_memory(row: &rusqlite::Row<'_>) -> Result<InteractionMemory, rusqlite::Error> {
    let id: String = row.get(0)?;
    let room_id: String = row.get(1)?;
    let user_id: String = row.get(2)?;
    let in_reply_to: Option<String> = row.get(5)?;
    let image_urls: String = row.get(6)?;
    Ok(InteractionMemory {
        id: parse_uuid(&id, 0)?,
        room_id: parse_uuid(&room_id, 1)?,
        user_id: parse_uuid(&user_id, 2)?,
        text: row.get(3)?,
        source: row.get(4)?,
        in_reply_to: in_reply_to.as_deref().and_then(|s| Uuid::parse_str(s).ok()),
        image_urls: serde_json::from_str(&image_urls).unwrap_or_default(),
        created_at_epoch: row.get(7)?,
    })
}

fn parse_uuid(raw: &str, column: usize) -> Result<Uuid, rusqlite::Error> {
    Uuid::parse_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}
