//! Conversation-context upserts: accounts, rooms, participants.
//!
//! Every memory write is preceded by an `ensure_conversation_context` call so
//! the identity/room linkage exists before the row referencing it. All three
//! inserts are idempotent.

use crate::db::Database;
use chrono::Utc;
use uuid::Uuid;

impl Database {
    /// Upsert the account, room, and participant linkage for one post.
    pub fn ensure_conversation_context(
        &self,
        user_id: &Uuid,
        room_id: &Uuid,
        display_name: &str,
        handle: &str,
        source: &str,
    ) -> Result<(), rusqlite::Error> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT OR IGNORE INTO accounts (id, name, username, source, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![user_id.to_string(), display_name, handle, source, now],
        )?;

        conn.execute(
            "INSERT OR IGNORE INTO rooms (id, created_at) VALUES (?1, ?2)",
            rusqlite::params![room_id.to_string(), now],
        )?;

        conn.execute(
            "INSERT OR IGNORE INTO participants (user_id, room_id, created_at)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![user_id.to_string(), room_id.to_string(), now],
        )?;

        Ok(())
    }

    #[cfg(test)]
    pub fn count_participants(&self) -> Result<i64, rusqlite::Error> {
        let conn = self.conn();
        conn.query_row("SELECT COUNT(*) FROM participants", [], |row| row.get(0))
    }
}

#[cfg(test)]
mod tests {
    use crate::db::test_support::temp_db;
    use crate::ids;

    #[test]
    fn test_ensure_conversation_context_is_idempotent() {
        let (_dir, db) = temp_db();
        let user = ids::participant_id("larkbot", "42");
        let room = ids::room_id("larkbot", "conv-1");

        db.ensure_conversation_context(&user, &room, "Alice", "alice", "twitter")
            .unwrap();
        db.ensure_conversation_context(&user, &room, "Alice", "alice", "twitter")
            .unwrap();

        assert_eq!(db.count_participants().unwrap(), 1);
    }

    #[test]
    fn test_same_user_in_two_rooms() {
        let (_dir, db) = temp_db();
        let user = ids::participant_id("larkbot", "42");
        let room_a = ids::room_id("larkbot", "conv-a");
        let room_b = ids::room_id("larkbot", "conv-b");

        db.ensure_conversation_context(&user, &room_a, "Alice", "alice", "twitter")
            .unwrap();
        db.ensure_conversation_context(&user, &room_b, "Alice", "alice", "twitter")
            .unwrap();

        assert_eq!(db.count_participants().unwrap(), 2);
    }
}
