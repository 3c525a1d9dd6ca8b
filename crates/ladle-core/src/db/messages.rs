//! Message persistence
//!
//! Messages are immutable once written and ordered by creation time (rowid
//! breaks same-timestamp ties) within their conversation.

use super::ids::generate_id;
use super::Database;
use crate::error::Result;
use chrono::Utc;
use rusqlite::params;
use serde_json::{Map, Value};

/// Message record
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: String,
    pub conversation_id: String,
    pub role: String,
    pub content: String,
    pub kind: String,
    pub metadata: Map<String, Value>,
    pub created_at: String,
}

/// Parameters for inserting a message
#[derive(Debug, Clone)]
pub struct MessageInsert<'a> {
    pub conversation_id: &'a str,
    pub role: &'a str,
    pub content: &'a str,
    pub kind: &'a str,
    pub metadata: Map<String, Value>,
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRecord> {
    let metadata_json: Option<String> = row.get(5)?;
    let metadata = metadata_json
        .and_then(|j| serde_json::from_str::<Map<String, Value>>(&j).ok())
        .unwrap_or_default();
    Ok(MessageRecord {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        role: row.get(2)?,
        content: row.get(3)?,
        kind: row.get(4)?,
        metadata,
        created_at: row.get(6)?,
    })
}

impl Database {
    /// Insert a message and bump the owning conversation
    pub fn insert_message(&self, insert: &MessageInsert<'_>) -> Result<MessageRecord> {
        let id = generate_id();
        let now = Utc::now().to_rfc3339();
        let metadata_json = serde_json::to_string(&insert.metadata)?;

        self.conn().execute(
            "INSERT INTO messages (id, conversation_id, role, content, kind, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                insert.conversation_id,
                insert.role,
                insert.content,
                insert.kind,
                metadata_json,
                now
            ],
        )?;
        self.touch_conversation(insert.conversation_id)?;

        Ok(MessageRecord {
            id,
            conversation_id: insert.conversation_id.to_string(),
            role: insert.role.to_string(),
            content: insert.content.to_string(),
            kind: insert.kind.to_string(),
            metadata: insert.metadata.clone(),
            created_at: now,
        })
    }

    /// Full ordered history for a conversation (oldest first)
    pub fn get_messages(&self, conversation_id: &str, limit: usize) -> Result<Vec<MessageRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, role, content, kind, metadata, created_at
             FROM messages WHERE conversation_id = ?1
             ORDER BY created_at, rowid
             LIMIT ?2",
        )?;

        let results = stmt
            .query_map(params![conversation_id, limit as i64], row_to_message)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(results)
    }

    /// The most recent messages for a conversation, returned oldest-first
    /// so they can be replayed as chat history.
    pub fn recent_messages(&self, conversation_id: &str, limit: usize) -> Result<Vec<MessageRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, role, content, kind, metadata, created_at
             FROM messages WHERE conversation_id = ?1
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?2",
        )?;

        let mut results = stmt
            .query_map(params![conversation_id, limit as i64], row_to_message)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        results.reverse();
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert(db: &Database, conversation_id: &str, role: &str, content: &str) -> MessageRecord {
        db.insert_message(&MessageInsert {
            conversation_id,
            role,
            content,
            kind: "text",
            metadata: Map::new(),
        })
        .unwrap()
    }

    #[test]
    fn test_messages_ordered_within_conversation() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let conv = db.resolve_or_create_conversation("u1", "s", None).unwrap();

        insert(&db, &conv.id, "user", "first");
        insert(&db, &conv.id, "assistant", "second");
        insert(&db, &conv.id, "user", "third");

        let messages = db.get_messages(&conv.id, 50).unwrap();
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_recent_messages_window_is_oldest_first() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let conv = db.resolve_or_create_conversation("u1", "s", None).unwrap();

        for i in 0..15 {
            insert(&db, &conv.id, "user", &format!("m{}", i));
        }

        let window = db.recent_messages(&conv.id, 10).unwrap();
        assert_eq!(window.len(), 10);
        assert_eq!(window.first().unwrap().content, "m5");
        assert_eq!(window.last().unwrap().content, "m14");
    }

    #[test]
    fn test_history_read_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let conv = db.resolve_or_create_conversation("u1", "s", None).unwrap();
        insert(&db, &conv.id, "user", "hello");
        insert(&db, &conv.id, "assistant", "hi");

        let first = db.get_messages(&conv.id, 50).unwrap();
        let second = db.get_messages(&conv.id, 50).unwrap();
        let ids_first: Vec<&str> = first.iter().map(|m| m.id.as_str()).collect();
        let ids_second: Vec<&str> = second.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids_first, ids_second);
    }

    #[test]
    fn test_cascade_delete_with_conversation() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let conv = db.resolve_or_create_conversation("u1", "s", None).unwrap();
        insert(&db, &conv.id, "user", "hello");

        db.delete_conversation("u1", &conv.id).unwrap();
        let remaining = db.get_messages(&conv.id, 50).unwrap();
        assert!(remaining.is_empty());
    }
}
