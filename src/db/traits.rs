// Database trait — backend-agnostic async interface for all DB operations.
//
// Implementors: SqliteDatabase (wraps rusqlite), PgDatabase (wraps sqlx).
// All methods are async so both sync (rusqlite via Mutex) and native async
// (sqlx) backends fit behind a single interface.

use anyhow::Result;
use async_trait::async_trait;

use super::models::{
    ChatMessage, DbStats, GroupWithMembers, MessageKind, NewFile, SavedSummary, StoredFile,
    StudyGroup, SummarySource, User, UserCredentials, UserRole,
};

/// Failures callers handle by kind rather than as a generic 500. They
/// travel inside `anyhow::Error`; match them with `downcast_ref`.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Email already registered")]
    DuplicateEmail,
}

impl DbError {
    pub fn is_duplicate_email(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<DbError>(), Some(DbError::DuplicateEmail))
    }
}

#[async_trait]
pub trait Database: Send + Sync {
    // --- Lifecycle ---

    /// Count the number of user-created tables in the database.
    async fn table_count(&self) -> Result<i64>;

    /// Row counts per table, for `studyhub status`.
    async fn stats(&self) -> Result<DbStats>;

    // --- Users ---

    /// Register a user. Emails are stored lower-cased and must be unique;
    /// a taken email fails with [`DbError::DuplicateEmail`].
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: UserRole,
    ) -> Result<User>;

    async fn get_user(&self, id: i64) -> Result<Option<User>>;

    /// Fetch a user with their password hash, for login.
    async fn get_credentials_by_email(&self, email: &str) -> Result<Option<UserCredentials>>;

    /// Change a user's role. Returns false when no user has that email.
    async fn set_user_role(&self, email: &str, role: UserRole) -> Result<bool>;

    // --- Groups ---

    /// Create a group; the creator becomes its first member.
    async fn create_group(
        &self,
        name: &str,
        description: Option<&str>,
        created_by: i64,
    ) -> Result<StudyGroup>;

    async fn get_group(&self, id: i64) -> Result<Option<StudyGroup>>;

    /// Add a member. Returns false if they already belonged to the group.
    async fn add_group_member(&self, group_id: i64, user_id: i64) -> Result<bool>;

    async fn is_group_member(&self, group_id: i64, user_id: i64) -> Result<bool>;

    async fn list_groups_for_user(&self, user_id: i64) -> Result<Vec<StudyGroup>>;

    async fn list_all_groups(&self) -> Result<Vec<GroupWithMembers>>;

    // --- Messages ---

    async fn insert_message(
        &self,
        group_id: i64,
        sender_id: i64,
        text: &str,
        kind: MessageKind,
    ) -> Result<ChatMessage>;

    /// All messages in a group in chronological order.
    async fn get_group_messages(&self, group_id: i64) -> Result<Vec<ChatMessage>>;

    // --- Files ---

    async fn insert_file(&self, file: &NewFile) -> Result<StoredFile>;

    async fn get_file(&self, id: i64) -> Result<Option<StoredFile>>;

    /// Files uploaded to a group, newest first.
    async fn list_group_files(&self, group_id: i64) -> Result<Vec<StoredFile>>;

    // --- Summaries ---

    async fn save_summary(
        &self,
        group_id: i64,
        generated_by: i64,
        source: SummarySource,
        content: &str,
    ) -> Result<SavedSummary>;

    /// Most recent summaries for a group, newest first.
    async fn get_group_summaries(&self, group_id: i64, limit: u32) -> Result<Vec<SavedSummary>>;
}
