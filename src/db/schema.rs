// SQLite schema for users, groups, chat, uploads and summaries.
//
// The base tables are created with IF NOT EXISTS. Columns added later are
// numbered migrations recorded in `schema_version`, so older database files
// pick them up on the next open.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Bring a connection's schema up to date. Runs on every open.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;

        -- One row per applied migration
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,        -- stored lower-cased
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'member',
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS study_groups (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT,
            created_by INTEGER NOT NULL REFERENCES users(id),
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Membership is a join table rather than an array column
        CREATE TABLE IF NOT EXISTS group_members (
            group_id INTEGER NOT NULL REFERENCES study_groups(id),
            user_id INTEGER NOT NULL REFERENCES users(id),
            joined_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (group_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            group_id INTEGER NOT NULL REFERENCES study_groups(id),
            sender_id INTEGER NOT NULL REFERENCES users(id),
            text TEXT NOT NULL,
            kind TEXT NOT NULL DEFAULT 'text', -- 'text' or 'file'
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            group_id INTEGER NOT NULL REFERENCES study_groups(id),
            uploaded_by INTEGER NOT NULL REFERENCES users(id),
            original_name TEXT NOT NULL,
            file_name TEXT NOT NULL,           -- name inside the upload directory
            file_type TEXT,                    -- MIME type reported at upload
            file_path TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS summaries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            group_id INTEGER NOT NULL REFERENCES study_groups(id),
            generated_by INTEGER NOT NULL REFERENCES users(id),
            content TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_members_user
            ON group_members(user_id);

        CREATE INDEX IF NOT EXISTS idx_messages_group
            ON messages(group_id, created_at);

        CREATE INDEX IF NOT EXISTS idx_files_group
            ON files(group_id, created_at);

        CREATE INDEX IF NOT EXISTS idx_summaries_group
            ON summaries(group_id, created_at);
        ",
    )
    .context("Failed to create database tables")?;

    // The base tables are version 1
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [1],
    )?;

    // Migration v2: record upload size so listings don't need to stat files.
    run_migration(conn, 2, |c| {
        c.execute_batch("ALTER TABLE files ADD COLUMN size INTEGER NOT NULL DEFAULT 0;")
    })?;

    // Migration v3: distinguish chat summaries from document summaries.
    run_migration(conn, 3, |c| {
        c.execute_batch("ALTER TABLE summaries ADD COLUMN source TEXT NOT NULL DEFAULT 'chat';")
    })?;

    Ok(())
}

/// Apply `migrate` once, recording `version` when it succeeds.
fn run_migration<F>(conn: &Connection, version: i64, migrate: F) -> Result<()>
where
    F: FnOnce(&Connection) -> rusqlite::Result<()>,
{
    let already_applied: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM schema_version WHERE version = ?1",
        [version],
        |row| row.get(0),
    )?;

    if !already_applied {
        migrate(conn).with_context(|| format!("Migration v{version} failed"))?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )?;
    }

    Ok(())
}

/// Number of user tables, printed by `studyhub init`.
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}
