// SqliteDatabase — rusqlite backend implementing the Database trait.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Send.
// Trait methods lock the mutex, do synchronous rusqlite work, and return.
// The lock is never held across an .await on anything else.

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::models::{
    ChatMessage, DbStats, GroupWithMembers, MessageKind, NewFile, SavedSummary, StoredFile,
    StudyGroup, SummarySource, User, UserCredentials, UserRole,
};
use super::queries;
use super::traits::Database;

pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// A fresh in-memory database with the schema applied.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        super::schema::create_tables(&conn)?;
        Ok(Self::new(conn))
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    async fn stats(&self) -> Result<DbStats> {
        let conn = self.conn.lock().await;
        queries::stats(&conn)
    }

    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: UserRole,
    ) -> Result<User> {
        let conn = self.conn.lock().await;
        queries::create_user(&conn, name, email, password_hash, role)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn.lock().await;
        queries::get_user(&conn, id)
    }

    async fn get_credentials_by_email(&self, email: &str) -> Result<Option<UserCredentials>> {
        let conn = self.conn.lock().await;
        queries::get_credentials_by_email(&conn, email)
    }

    async fn set_user_role(&self, email: &str, role: UserRole) -> Result<bool> {
        let conn = self.conn.lock().await;
        queries::set_user_role(&conn, email, role)
    }

    async fn create_group(
        &self,
        name: &str,
        description: Option<&str>,
        created_by: i64,
    ) -> Result<StudyGroup> {
        let conn = self.conn.lock().await;
        queries::create_group(&conn, name, description, created_by)
    }

    async fn get_group(&self, id: i64) -> Result<Option<StudyGroup>> {
        let conn = self.conn.lock().await;
        queries::get_group(&conn, id)
    }

    async fn add_group_member(&self, group_id: i64, user_id: i64) -> Result<bool> {
        let conn = self.conn.lock().await;
        queries::add_group_member(&conn, group_id, user_id)
    }

    async fn is_group_member(&self, group_id: i64, user_id: i64) -> Result<bool> {
        let conn = self.conn.lock().await;
        queries::is_group_member(&conn, group_id, user_id)
    }

    async fn list_groups_for_user(&self, user_id: i64) -> Result<Vec<StudyGroup>> {
        let conn = self.conn.lock().await;
        queries::list_groups_for_user(&conn, user_id)
    }

    async fn list_all_groups(&self) -> Result<Vec<GroupWithMembers>> {
        let conn = self.conn.lock().await;
        queries::list_all_groups(&conn)
    }

    async fn insert_message(
        &self,
        group_id: i64,
        sender_id: i64,
        text: &str,
        kind: MessageKind,
    ) -> Result<ChatMessage> {
        let conn = self.conn.lock().await;
        queries::insert_message(&conn, group_id, sender_id, text, kind)
    }

    async fn get_group_messages(&self, group_id: i64) -> Result<Vec<ChatMessage>> {
        let conn = self.conn.lock().await;
        queries::get_group_messages(&conn, group_id)
    }

    async fn insert_file(&self, file: &NewFile) -> Result<StoredFile> {
        let conn = self.conn.lock().await;
        queries::insert_file(&conn, file)
    }

    async fn get_file(&self, id: i64) -> Result<Option<StoredFile>> {
        let conn = self.conn.lock().await;
        queries::get_file(&conn, id)
    }

    async fn list_group_files(&self, group_id: i64) -> Result<Vec<StoredFile>> {
        let conn = self.conn.lock().await;
        queries::list_group_files(&conn, group_id)
    }

    async fn save_summary(
        &self,
        group_id: i64,
        generated_by: i64,
        source: SummarySource,
        content: &str,
    ) -> Result<SavedSummary> {
        let conn = self.conn.lock().await;
        queries::save_summary(&conn, group_id, generated_by, source, content)
    }

    async fn get_group_summaries(&self, group_id: i64, limit: u32) -> Result<Vec<SavedSummary>> {
        let conn = self.conn.lock().await;
        queries::get_group_summaries(&conn, group_id, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trait_table_count() {
        let db = SqliteDatabase::in_memory().unwrap();
        assert_eq!(db.table_count().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_trait_group_lifecycle() {
        let db = SqliteDatabase::in_memory().unwrap();
        let admin = db
            .create_user("Admin", "admin@example.com", "h", UserRole::Admin)
            .await
            .unwrap();
        let member = db
            .create_user("Kai", "kai@example.com", "h", UserRole::Member)
            .await
            .unwrap();

        let group = db.create_group("Databases", None, admin.id).await.unwrap();
        assert!(db.is_group_member(group.id, admin.id).await.unwrap());
        assert!(!db.is_group_member(group.id, member.id).await.unwrap());

        assert!(db.add_group_member(group.id, member.id).await.unwrap());
        let group = db.get_group(group.id).await.unwrap().unwrap();
        assert!(group.has_member(member.id));

        assert!(db.get_group(group.id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_trait_promote_user() {
        let db = SqliteDatabase::in_memory().unwrap();
        db.create_user("Lin", "lin@example.com", "h", UserRole::Member)
            .await
            .unwrap();
        assert!(db.set_user_role("LIN@example.com", UserRole::Admin).await.unwrap());
        assert!(!db.set_user_role("ghost@example.com", UserRole::Admin).await.unwrap());

        let creds = db.get_credentials_by_email("lin@example.com").await.unwrap().unwrap();
        assert_eq!(creds.user.role, UserRole::Admin);
    }

    #[tokio::test]
    async fn test_trait_stats_counts_rows() {
        let db = SqliteDatabase::in_memory().unwrap();
        let user = db
            .create_user("Mo", "mo@example.com", "h", UserRole::Admin)
            .await
            .unwrap();
        let group = db.create_group("Stats", None, user.id).await.unwrap();
        db.insert_message(group.id, user.id, "hello", MessageKind::Text)
            .await
            .unwrap();
        db.save_summary(group.id, user.id, SummarySource::Chat, "hi")
            .await
            .unwrap();

        let stats = db.stats().await.unwrap();
        assert_eq!(
            stats,
            DbStats {
                users: 1,
                groups: 1,
                messages: 1,
                files: 0,
                summaries: 1,
            }
        );
    }
}
