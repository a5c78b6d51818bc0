// PostgreSQL backend for multi-instance deployments.
//
// Queries are built at runtime with sqlx's query() and bind(), so building
// the crate never needs a live database.
//
// Where it differs from the SQLite backend:
// - TIMESTAMPTZ timestamps, formatted back to text in SELECTs
// - BIGINT GENERATED ALWAYS AS IDENTITY for ids, returned with RETURNING
// - $1/$2 parameter syntax

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx_core::pool::Pool;
use sqlx_core::row::Row;
use sqlx_postgres::{PgRow, Postgres};

use super::models::{
    ChatMessage, DbStats, GroupMember, GroupWithMembers, MessageKind, NewFile, SavedSummary,
    StoredFile, StudyGroup, SummarySource, User, UserCredentials, UserRole,
};
use super::traits::{Database, DbError};

pub type PgPool = Pool<Postgres>;

const TS: &str = "'YYYY-MM-DD HH24:MI:SS'";

/// SQLSTATE for a unique-constraint violation.
const UNIQUE_VIOLATION: &str = "23505";

pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    /// Open a pool and apply any migrations this database hasn't seen.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Holds a session-level advisory lock so two servers starting together
    /// don't apply the same migration twice. Session locks belong to one
    /// backend connection, so lock and unlock both run on `lock_conn`; the
    /// unlock runs even when a migration fails.
    async fn run_migrations(&self) -> Result<()> {
        // ASCII "STUDYHUB" as a big-endian i64.
        const MIGRATION_LOCK_KEY: i64 = 0x5354554459485542_u64 as i64;

        let mut lock_conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire connection for migration advisory lock")?;

        sqlx_core::query::query("SELECT pg_advisory_lock($1)")
            .bind(MIGRATION_LOCK_KEY)
            .execute(&mut *lock_conn)
            .await
            .context("Failed to acquire migration advisory lock")?;

        let migration_result: Result<()> = async {
            sqlx_core::query::query(
                "CREATE TABLE IF NOT EXISTS schema_version (
                    version INTEGER PRIMARY KEY,
                    applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )",
            )
            .execute(&self.pool)
            .await?;

            let migrations = [
                (1, include_str!("../../migrations/postgres/0001_initial.sql")),
                (2, include_str!("../../migrations/postgres/0002_summary_source.sql")),
            ];

            for (version, sql) in migrations {
                let applied: bool = sqlx_core::query::query(
                    "SELECT COUNT(*) > 0 FROM schema_version WHERE version = $1",
                )
                .bind(version)
                .fetch_one(&self.pool)
                .await
                .map(|row| row.get::<bool, _>(0))
                .unwrap_or(false);

                if !applied {
                    // Schema change and schema_version insert commit together
                    let mut tx = self.pool.begin().await?;
                    sqlx_core::raw_sql::raw_sql(sql)
                        .execute(&mut *tx)
                        .await
                        .with_context(|| format!("Migration v{version} failed"))?;
                    tx.commit().await?;
                }
            }

            Ok(())
        }
        .await;

        let unlock_result = sqlx_core::query::query("SELECT pg_advisory_unlock($1)")
            .bind(MIGRATION_LOCK_KEY)
            .execute(&mut *lock_conn)
            .await
            .context("Failed to release migration advisory lock");

        // Migration error takes priority over unlock error.
        migration_result?;
        unlock_result?;

        Ok(())
    }

    async fn member_ids(&self, group_id: i64) -> Result<Vec<i64>> {
        let rows = sqlx_core::query::query(
            "SELECT user_id FROM group_members WHERE group_id = $1 ORDER BY joined_at, user_id",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|r| r.get::<i64, _>(0)).collect())
    }

    async fn fetch_message(&self, id: i64) -> Result<ChatMessage> {
        let row = sqlx_core::query::query(&format!(
            "SELECT m.id, m.group_id, m.sender_id, u.name, u.email, m.text, m.kind,
                    to_char(m.created_at, {TS})
             FROM messages m JOIN users u ON u.id = m.sender_id
             WHERE m.id = $1"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(message_from_row(&row))
    }
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get(0),
        name: row.get(1),
        email: row.get(2),
        role: UserRole::parse(&row.get::<String, _>(3)),
        created_at: row.get(4),
    }
}

fn message_from_row(row: &PgRow) -> ChatMessage {
    ChatMessage {
        id: row.get(0),
        group_id: row.get(1),
        sender_id: row.get(2),
        sender_name: row.get(3),
        sender_email: row.get(4),
        text: row.get(5),
        kind: MessageKind::parse(&row.get::<String, _>(6)),
        created_at: row.get(7),
    }
}

fn file_from_row(row: &PgRow) -> StoredFile {
    StoredFile {
        id: row.get(0),
        group_id: row.get(1),
        uploaded_by: row.get(2),
        uploader_name: row.get(3),
        original_name: row.get(4),
        file_name: row.get(5),
        file_type: row.get(6),
        file_path: row.get(7),
        size: row.get(8),
        created_at: row.get(9),
    }
}

fn summary_from_row(row: &PgRow) -> SavedSummary {
    SavedSummary {
        id: row.get(0),
        group_id: row.get(1),
        generated_by: row.get(2),
        source: SummarySource::parse(&row.get::<String, _>(3)),
        content: row.get(4),
        created_at: row.get(5),
    }
}

fn file_select() -> String {
    format!(
        "SELECT f.id, f.group_id, f.uploaded_by, u.name, f.original_name, f.file_name,
                f.file_type, f.file_path, f.size, to_char(f.created_at, {TS})
         FROM files f JOIN users u ON u.id = f.uploaded_by"
    )
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl Database for PgDatabase {
    async fn table_count(&self) -> Result<i64> {
        let row = sqlx_core::query::query(
            "SELECT COUNT(*)::bigint FROM information_schema.tables
             WHERE table_schema = 'public' AND table_type = 'BASE TABLE'",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>(0))
    }

    async fn stats(&self) -> Result<DbStats> {
        let row = sqlx_core::query::query(
            "SELECT (SELECT COUNT(*) FROM users),
                    (SELECT COUNT(*) FROM study_groups),
                    (SELECT COUNT(*) FROM messages),
                    (SELECT COUNT(*) FROM files),
                    (SELECT COUNT(*) FROM summaries)",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(DbStats {
            users: row.get(0),
            groups: row.get(1),
            messages: row.get(2),
            files: row.get(3),
            summaries: row.get(4),
        })
    }

    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: UserRole,
    ) -> Result<User> {
        let row = sqlx_core::query::query(&format!(
            "INSERT INTO users (name, email, password_hash, role) VALUES ($1, $2, $3, $4)
             RETURNING id, name, email, role, to_char(created_at, {TS})"
        ))
        .bind(name.trim())
        .bind(normalize_email(email))
        .bind(password_hash)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await;
        match row {
            Ok(row) => Ok(user_from_row(&row)),
            Err(sqlx_core::error::Error::Database(e))
                if e.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                Err(DbError::DuplicateEmail.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx_core::query::query(&format!(
            "SELECT id, name, email, role, to_char(created_at, {TS}) FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| user_from_row(&r)))
    }

    async fn get_credentials_by_email(&self, email: &str) -> Result<Option<UserCredentials>> {
        let row = sqlx_core::query::query(&format!(
            "SELECT id, name, email, role, to_char(created_at, {TS}), password_hash
             FROM users WHERE email = $1"
        ))
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| UserCredentials {
            user: user_from_row(&r),
            password_hash: r.get(5),
        }))
    }

    async fn set_user_role(&self, email: &str, role: UserRole) -> Result<bool> {
        let result = sqlx_core::query::query("UPDATE users SET role = $1 WHERE email = $2")
            .bind(role.as_str())
            .bind(normalize_email(email))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_group(
        &self,
        name: &str,
        description: Option<&str>,
        created_by: i64,
    ) -> Result<StudyGroup> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx_core::query::query(
            "INSERT INTO study_groups (name, description, created_by) VALUES ($1, $2, $3)
             RETURNING id",
        )
        .bind(name.trim())
        .bind(description)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;
        let id: i64 = row.get(0);

        sqlx_core::query::query("INSERT INTO group_members (group_id, user_id) VALUES ($1, $2)")
            .bind(id)
            .bind(created_by)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        self.get_group(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Group {id} vanished after insert"))
    }

    async fn get_group(&self, id: i64) -> Result<Option<StudyGroup>> {
        let row = sqlx_core::query::query(&format!(
            "SELECT id, name, description, created_by, to_char(created_at, {TS})
             FROM study_groups WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(StudyGroup {
                id: r.get(0),
                name: r.get(1),
                description: r.get(2),
                created_by: r.get(3),
                members: self.member_ids(id).await?,
                created_at: r.get(4),
            })),
            None => Ok(None),
        }
    }

    async fn add_group_member(&self, group_id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx_core::query::query(
            "INSERT INTO group_members (group_id, user_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(group_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_group_member(&self, group_id: i64, user_id: i64) -> Result<bool> {
        let row = sqlx_core::query::query(
            "SELECT COUNT(*) > 0 FROM group_members WHERE group_id = $1 AND user_id = $2",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<bool, _>(0))
    }

    async fn list_groups_for_user(&self, user_id: i64) -> Result<Vec<StudyGroup>> {
        let rows = sqlx_core::query::query(
            "SELECT g.id FROM study_groups g
             JOIN group_members m ON m.group_id = g.id
             WHERE m.user_id = $1
             ORDER BY g.created_at, g.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut groups = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(group) = self.get_group(row.get(0)).await? {
                groups.push(group);
            }
        }
        Ok(groups)
    }

    async fn list_all_groups(&self) -> Result<Vec<GroupWithMembers>> {
        let rows = sqlx_core::query::query(&format!(
            "SELECT id, name, description, to_char(created_at, {TS})
             FROM study_groups ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut groups = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.get(0);
            let members = sqlx_core::query::query(
                "SELECT u.id, u.name, u.email FROM group_members m
                 JOIN users u ON u.id = m.user_id
                 WHERE m.group_id = $1
                 ORDER BY m.joined_at, u.id",
            )
            .bind(id)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(|m| GroupMember {
                id: m.get(0),
                name: m.get(1),
                email: m.get(2),
            })
            .collect();

            groups.push(GroupWithMembers {
                id,
                name: row.get(1),
                description: row.get(2),
                members,
                created_at: row.get(3),
            });
        }
        Ok(groups)
    }

    async fn insert_message(
        &self,
        group_id: i64,
        sender_id: i64,
        text: &str,
        kind: MessageKind,
    ) -> Result<ChatMessage> {
        let row = sqlx_core::query::query(
            "INSERT INTO messages (group_id, sender_id, text, kind) VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(group_id)
        .bind(sender_id)
        .bind(text)
        .bind(kind.as_str())
        .fetch_one(&self.pool)
        .await?;
        self.fetch_message(row.get(0)).await
    }

    async fn get_group_messages(&self, group_id: i64) -> Result<Vec<ChatMessage>> {
        let rows = sqlx_core::query::query(&format!(
            "SELECT m.id, m.group_id, m.sender_id, u.name, u.email, m.text, m.kind,
                    to_char(m.created_at, {TS})
             FROM messages m JOIN users u ON u.id = m.sender_id
             WHERE m.group_id = $1
             ORDER BY m.created_at ASC, m.id ASC"
        ))
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(message_from_row).collect())
    }

    async fn insert_file(&self, file: &NewFile) -> Result<StoredFile> {
        let row = sqlx_core::query::query(
            "INSERT INTO files
                (group_id, uploaded_by, original_name, file_name, file_type, file_path, size)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id",
        )
        .bind(file.group_id)
        .bind(file.uploaded_by)
        .bind(&file.original_name)
        .bind(&file.file_name)
        .bind(&file.file_type)
        .bind(&file.file_path)
        .bind(file.size)
        .fetch_one(&self.pool)
        .await?;
        let id: i64 = row.get(0);
        self.get_file(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("File {id} vanished after insert"))
    }

    async fn get_file(&self, id: i64) -> Result<Option<StoredFile>> {
        let row = sqlx_core::query::query(&format!("{} WHERE f.id = $1", file_select()))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| file_from_row(&r)))
    }

    async fn list_group_files(&self, group_id: i64) -> Result<Vec<StoredFile>> {
        let rows = sqlx_core::query::query(&format!(
            "{} WHERE f.group_id = $1 ORDER BY f.created_at DESC, f.id DESC",
            file_select()
        ))
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(file_from_row).collect())
    }

    async fn save_summary(
        &self,
        group_id: i64,
        generated_by: i64,
        source: SummarySource,
        content: &str,
    ) -> Result<SavedSummary> {
        let row = sqlx_core::query::query(&format!(
            "INSERT INTO summaries (group_id, generated_by, source, content)
             VALUES ($1, $2, $3, $4)
             RETURNING id, group_id, generated_by, source, content, to_char(created_at, {TS})"
        ))
        .bind(group_id)
        .bind(generated_by)
        .bind(source.as_str())
        .bind(content)
        .fetch_one(&self.pool)
        .await?;
        Ok(summary_from_row(&row))
    }

    async fn get_group_summaries(&self, group_id: i64, limit: u32) -> Result<Vec<SavedSummary>> {
        let rows = sqlx_core::query::query(&format!(
            "SELECT id, group_id, generated_by, source, content, to_char(created_at, {TS})
             FROM summaries
             WHERE group_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2"
        ))
        .bind(group_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(summary_from_row).collect())
    }
}
