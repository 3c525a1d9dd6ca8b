//! Database schema and initialization

use crate::error::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Main database handle.
///
/// The connection is behind a mutex so the handle can be shared across
/// request handlers; each query locks for its own synchronous call and the
/// guard is never held across an await point.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

const SCHEMA_VERSION: i32 = 1;

const CREATE_TABLES: &str = r#"
-- Conversations: one row per (user, session) chat thread
CREATE TABLE IF NOT EXISTS conversations (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    session_key TEXT NOT NULL,
    pinned_intent TEXT,
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Messages: immutable once written, ordered by created_at within a conversation
CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
    role TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
    content TEXT NOT NULL,
    kind TEXT NOT NULL DEFAULT 'text' CHECK (kind IN ('text', 'recipe')),
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL
);

-- Recipe corpus (the retrieval engine's read model)
CREATE TABLE IF NOT EXISTS recipes (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    ingredients TEXT NOT NULL,
    instructions TEXT NOT NULL,
    prep_time_minutes INTEGER,
    cook_time_minutes INTEGER,
    servings INTEGER,
    difficulty TEXT,
    tags TEXT,
    search_text TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Full-text search index over the searchable-text projection
CREATE VIRTUAL TABLE IF NOT EXISTS recipes_fts USING fts5(
    title,
    description,
    search_text,
    tokenize='porter unicode61'
);

-- One embedding per recipe
CREATE TABLE IF NOT EXISTS recipe_embeddings (
    recipe_id TEXT PRIMARY KEY REFERENCES recipes(id) ON DELETE CASCADE,
    model TEXT NOT NULL,
    embedding BLOB NOT NULL,
    created_at TEXT NOT NULL
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_conversations_user ON conversations(user_id);
CREATE INDEX IF NOT EXISTS idx_conversations_session ON conversations(user_id, session_key);
CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id);
CREATE INDEX IF NOT EXISTS idx_recipes_user ON recipes(user_id);
"#;

const CREATE_TRIGGERS: &str = r#"
-- Sync FTS on insert
CREATE TRIGGER IF NOT EXISTS recipes_ai
AFTER INSERT ON recipes
BEGIN
    INSERT INTO recipes_fts(rowid, title, description, search_text)
    VALUES (new.rowid, new.title, new.description, new.search_text);
END;

-- Sync FTS on update
CREATE TRIGGER IF NOT EXISTS recipes_au
AFTER UPDATE ON recipes
BEGIN
    DELETE FROM recipes_fts WHERE rowid = old.rowid;
    INSERT INTO recipes_fts(rowid, title, description, search_text)
    VALUES (new.rowid, new.title, new.description, new.search_text);
END;

-- Sync FTS on delete
CREATE TRIGGER IF NOT EXISTS recipes_ad
AFTER DELETE ON recipes
BEGIN
    DELETE FROM recipes_fts WHERE rowid = old.rowid;
END;
"#;

impl Database {
    /// Open database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory database (tests)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Create tables, triggers, and record the schema version
    pub fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        self.conn().execute_batch(CREATE_TABLES)?;
        self.conn().execute_batch(CREATE_TRIGGERS)?;
        self.conn().execute(
            "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
            [SCHEMA_VERSION],
        )?;
        Ok(())
    }

    /// Current schema version, if initialized
    pub fn schema_version(&self) -> Result<Option<i32>> {
        let result = self
            .conn()
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get::<_, Option<i32>>(0)
            });
        match result {
            Ok(v) => Ok(v),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db.initialize().unwrap();
        assert_eq!(db.schema_version().unwrap(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_open_creates_parents_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ladle.sqlite");

        {
            let db = Database::open(&path).unwrap();
            db.initialize().unwrap();
            db.resolve_or_create_conversation("u1", "s1", None).unwrap();
        }

        let reopened = Database::open(&path).unwrap();
        assert_eq!(reopened.schema_version().unwrap(), Some(SCHEMA_VERSION));
        let conversation = reopened
            .resolve_or_create_conversation("u1", "s1", None)
            .unwrap();
        // Same conversation row survives the reopen.
        let summaries = reopened.list_conversation_summaries("u1", 10).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, conversation.id);
    }
}
