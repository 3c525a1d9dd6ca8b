//! Conversation persistence
//!
//! Conversations are exclusively owned by their user; every query here is
//! scoped by `user_id`.

use super::ids::generate_id;
use super::Database;
use crate::error::Result;
use chrono::Utc;
use rusqlite::params;
use serde_json::{Map, Value};

/// Conversation record
#[derive(Debug, Clone, serde::Serialize)]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub session_key: String,
    pub pinned_intent: Option<String>,
    pub metadata: Map<String, Value>,
    pub created_at: String,
    pub updated_at: String,
}

/// Conversation summary for history listings
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub session_key: String,
    pub selected_intent: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub message_count: usize,
}

fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    let metadata_json: Option<String> = row.get(4)?;
    let metadata = metadata_json
        .and_then(|j| serde_json::from_str::<Map<String, Value>>(&j).ok())
        .unwrap_or_default();
    Ok(Conversation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        session_key: row.get(2)?,
        pinned_intent: row.get(3)?,
        metadata,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

impl Database {
    /// Resolve the conversation for (user, session key), creating it on the
    /// first message of a session.
    ///
    /// Resolution is last-created-wins: when several conversations share a
    /// session key, the most recently created one is used. A supplied
    /// `pinned_intent` overwrites the stored one even for a pre-existing
    /// conversation.
    pub fn resolve_or_create_conversation(
        &self,
        user_id: &str,
        session_key: &str,
        pinned_intent: Option<&str>,
    ) -> Result<Conversation> {
        let existing = self.conn().query_row(
            "SELECT id, user_id, session_key, pinned_intent, metadata, created_at, updated_at
             FROM conversations
             WHERE user_id = ?1 AND session_key = ?2
             ORDER BY created_at DESC, rowid DESC
             LIMIT 1",
            params![user_id, session_key],
            row_to_conversation,
        );

        match existing {
            Ok(mut conversation) => {
                if let Some(intent) = pinned_intent {
                    self.set_pinned_intent(&conversation.id, intent)?;
                    conversation.pinned_intent = Some(intent.to_string());
                }
                Ok(conversation)
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                let id = generate_id();
                let now = Utc::now().to_rfc3339();
                self.conn().execute(
                    "INSERT INTO conversations (id, user_id, session_key, pinned_intent, metadata, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, '{}', ?5, ?5)",
                    params![id, user_id, session_key, pinned_intent, now],
                )?;
                Ok(Conversation {
                    id,
                    user_id: user_id.to_string(),
                    session_key: session_key.to_string(),
                    pinned_intent: pinned_intent.map(str::to_string),
                    metadata: Map::new(),
                    created_at: now.clone(),
                    updated_at: now,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get a conversation by id, scoped to its owner
    pub fn get_conversation(&self, user_id: &str, id: &str) -> Result<Option<Conversation>> {
        let result = self.conn().query_row(
            "SELECT id, user_id, session_key, pinned_intent, metadata, created_at, updated_at
             FROM conversations WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
            row_to_conversation,
        );
        match result {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Overwrite the pinned routing intent
    pub fn set_pinned_intent(&self, conversation_id: &str, intent: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn().execute(
            "UPDATE conversations SET pinned_intent = ?2, updated_at = ?3 WHERE id = ?1",
            params![conversation_id, intent, now],
        )?;
        Ok(())
    }

    /// Bump a conversation's updated_at
    pub fn touch_conversation(&self, conversation_id: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn().execute(
            "UPDATE conversations SET updated_at = ?2 WHERE id = ?1",
            params![conversation_id, now],
        )?;
        Ok(())
    }

    /// List conversation summaries for a user, most recently active first.
    ///
    /// The title is derived from the first user message (truncated) so the
    /// message rows stay immutable.
    pub fn list_conversation_summaries(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationSummary>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT c.id, c.session_key, c.pinned_intent, c.created_at, c.updated_at,
                    (SELECT COUNT(*) FROM messages m WHERE m.conversation_id = c.id),
                    (SELECT m.content FROM messages m
                     WHERE m.conversation_id = c.id AND m.role = 'user'
                     ORDER BY m.created_at, m.rowid LIMIT 1)
             FROM conversations c
             WHERE c.user_id = ?1
             ORDER BY c.updated_at DESC
             LIMIT ?2",
        )?;

        let results = stmt
            .query_map(params![user_id, limit as i64], |row| {
                let first_message: Option<String> = row.get(6)?;
                Ok(ConversationSummary {
                    id: row.get(0)?,
                    title: derive_title(first_message.as_deref()),
                    session_key: row.get(1)?,
                    selected_intent: row.get(2)?,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                    message_count: row.get::<_, i64>(5)? as usize,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(results)
    }

    /// Delete one conversation (and its messages, via cascade)
    pub fn delete_conversation(&self, user_id: &str, id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM conversations WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(rows > 0)
    }

    /// Delete all conversations for a user, returning the count removed
    pub fn delete_all_conversations(&self, user_id: &str) -> Result<usize> {
        let rows = self
            .conn()
            .execute("DELETE FROM conversations WHERE user_id = ?1", params![user_id])?;
        Ok(rows)
    }
}

const TITLE_MAX_CHARS: usize = 80;

fn derive_title(first_message: Option<&str>) -> String {
    let text = first_message.unwrap_or("New conversation").trim();
    if text.is_empty() {
        return "New conversation".to_string();
    }
    if text.chars().count() <= TITLE_MAX_CHARS {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(TITLE_MAX_CHARS).collect();
        format!("{}…", truncated.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_creates_then_reuses() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        let first = db
            .resolve_or_create_conversation("u1", "session-a", None)
            .unwrap();
        let second = db
            .resolve_or_create_conversation("u1", "session-a", None)
            .unwrap();
        assert_eq!(first.id, second.id);

        let other_session = db
            .resolve_or_create_conversation("u1", "session-b", None)
            .unwrap();
        assert_ne!(first.id, other_session.id);
    }

    #[test]
    fn test_resolve_last_created_wins() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        // Two conversations sharing a session key; the newer one resolves.
        db.conn()
            .execute(
                "INSERT INTO conversations (id, user_id, session_key, metadata, created_at, updated_at)
                 VALUES ('old', 'u1', 's', '{}', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
                [],
            )
            .unwrap();
        db.conn()
            .execute(
                "INSERT INTO conversations (id, user_id, session_key, metadata, created_at, updated_at)
                 VALUES ('new', 'u1', 's', '{}', '2024-06-01T00:00:00Z', '2024-06-01T00:00:00Z')",
                [],
            )
            .unwrap();

        let resolved = db.resolve_or_create_conversation("u1", "s", None).unwrap();
        assert_eq!(resolved.id, "new");
    }

    #[test]
    fn test_manual_intent_overwrites_existing_pin() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        let created = db
            .resolve_or_create_conversation("u1", "s", Some("general_chat"))
            .unwrap();
        assert_eq!(created.pinned_intent.as_deref(), Some("general_chat"));

        let repinned = db
            .resolve_or_create_conversation("u1", "s", Some("rag_search"))
            .unwrap();
        assert_eq!(repinned.id, created.id);
        assert_eq!(repinned.pinned_intent.as_deref(), Some("rag_search"));

        let stored = db.get_conversation("u1", &created.id).unwrap().unwrap();
        assert_eq!(stored.pinned_intent.as_deref(), Some("rag_search"));
    }

    #[test]
    fn test_ownership_scoping() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        let mine = db.resolve_or_create_conversation("u1", "s", None).unwrap();
        assert!(db.get_conversation("u2", &mine.id).unwrap().is_none());
        assert!(!db.delete_conversation("u2", &mine.id).unwrap());
        assert!(db.delete_conversation("u1", &mine.id).unwrap());
    }

    #[test]
    fn test_derive_title_truncates() {
        assert_eq!(derive_title(None), "New conversation");
        assert_eq!(derive_title(Some("Quick pasta?")), "Quick pasta?");
        let long = "x".repeat(200);
        let title = derive_title(Some(&long));
        assert!(title.chars().count() <= TITLE_MAX_CHARS + 1);
        assert!(title.ends_with('…'));
    }
}
