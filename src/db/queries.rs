// Database queries — CRUD operations for all tables.
//
// Every SQLite interaction goes through this module. This keeps SQL
// contained in one place and gives the rest of the app clean Rust interfaces.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::models::{
    ChatMessage, DbStats, GroupMember, GroupWithMembers, MessageKind, NewFile, SavedSummary,
    StoredFile, StudyGroup, SummarySource, User, UserCredentials, UserRole,
};
use super::traits::DbError;

/// Emails are compared case-insensitively; we store them lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// --- Stats ---

pub fn stats(conn: &Connection) -> Result<DbStats> {
    let count = |table: &str| -> Result<i64> {
        Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })?)
    };
    Ok(DbStats {
        users: count("users")?,
        groups: count("study_groups")?,
        messages: count("messages")?,
        files: count("files")?,
        summaries: count("summaries")?,
    })
}

// --- Users ---

const USER_COLUMNS: &str = "id, name, email, role, created_at";

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    let role: String = row.get(3)?;
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: UserRole::parse(&role),
        created_at: row.get(4)?,
    })
}

/// Insert a new user. Fails if the email is already registered.
pub fn create_user(
    conn: &Connection,
    name: &str,
    email: &str,
    password_hash: &str,
    role: UserRole,
) -> Result<User> {
    let inserted = conn.execute(
        "INSERT INTO users (name, email, password_hash, role) VALUES (?1, ?2, ?3, ?4)",
        params![name.trim(), normalize_email(email), password_hash, role.as_str()],
    );
    match inserted {
        Ok(_) => {}
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            return Err(DbError::DuplicateEmail.into())
        }
        Err(e) => return Err(e.into()),
    }
    let id = conn.last_insert_rowid();
    get_user(conn, id)?.ok_or_else(|| anyhow::anyhow!("User {id} vanished after insert"))
}

pub fn get_user(conn: &Connection, id: i64) -> Result<Option<User>> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))?;
    let result = stmt.query_row(params![id], user_from_row).optional()?;
    Ok(result)
}

/// Look up a user and their password hash by email (case-insensitive).
pub fn get_credentials_by_email(conn: &Connection, email: &str) -> Result<Option<UserCredentials>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = ?1"
    ))?;
    let result = stmt
        .query_row(params![normalize_email(email)], |row| {
            Ok(UserCredentials {
                user: user_from_row(row)?,
                password_hash: row.get(5)?,
            })
        })
        .optional()?;
    Ok(result)
}

/// Change a user's role. Returns false if no user has that email.
pub fn set_user_role(conn: &Connection, email: &str, role: UserRole) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE users SET role = ?1 WHERE email = ?2",
        params![role.as_str(), normalize_email(email)],
    )?;
    Ok(changed > 0)
}

// --- Groups ---

fn member_ids(conn: &Connection, group_id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT user_id FROM group_members WHERE group_id = ?1 ORDER BY joined_at, user_id",
    )?;
    let ids = stmt
        .query_map(params![group_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(ids)
}

/// Create a group with its creator as the first member.
pub fn create_group(
    conn: &Connection,
    name: &str,
    description: Option<&str>,
    created_by: i64,
) -> Result<StudyGroup> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO study_groups (name, description, created_by) VALUES (?1, ?2, ?3)",
        params![name.trim(), description, created_by],
    )?;
    let id = tx.last_insert_rowid();
    tx.execute(
        "INSERT INTO group_members (group_id, user_id) VALUES (?1, ?2)",
        params![id, created_by],
    )?;
    tx.commit()?;

    get_group(conn, id)?.ok_or_else(|| anyhow::anyhow!("Group {id} vanished after insert"))
}

pub fn get_group(conn: &Connection, id: i64) -> Result<Option<StudyGroup>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, created_by, created_at FROM study_groups WHERE id = ?1",
    )?;
    let row = stmt
        .query_row(params![id], |row| {
            Ok(StudyGroup {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                created_by: row.get(3)?,
                members: Vec::new(),
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    match row {
        Some(mut group) => {
            group.members = member_ids(conn, id)?;
            Ok(Some(group))
        }
        None => Ok(None),
    }
}

/// Add a member. Returns false if they were already in the group.
pub fn add_group_member(conn: &Connection, group_id: i64, user_id: i64) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO group_members (group_id, user_id) VALUES (?1, ?2)",
        params![group_id, user_id],
    )?;
    Ok(inserted > 0)
}

pub fn is_group_member(conn: &Connection, group_id: i64, user_id: i64) -> Result<bool> {
    let is_member: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM group_members WHERE group_id = ?1 AND user_id = ?2",
        params![group_id, user_id],
        |row| row.get(0),
    )?;
    Ok(is_member)
}

/// Groups the user belongs to, oldest first.
pub fn list_groups_for_user(conn: &Connection, user_id: i64) -> Result<Vec<StudyGroup>> {
    let mut stmt = conn.prepare(
        "SELECT g.id FROM study_groups g
         JOIN group_members m ON m.group_id = g.id
         WHERE m.user_id = ?1
         ORDER BY g.created_at, g.id",
    )?;
    let ids = stmt
        .query_map(params![user_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;

    let mut groups = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(group) = get_group(conn, id)? {
            groups.push(group);
        }
    }
    Ok(groups)
}

/// Every group with member names and emails, for the "join a group" listing.
pub fn list_all_groups(conn: &Connection) -> Result<Vec<GroupWithMembers>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, created_at FROM study_groups ORDER BY created_at, id",
    )?;
    let mut groups = stmt
        .query_map([], |row| {
            Ok(GroupWithMembers {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                members: Vec::new(),
                created_at: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut member_stmt = conn.prepare(
        "SELECT u.id, u.name, u.email FROM group_members m
         JOIN users u ON u.id = m.user_id
         WHERE m.group_id = ?1
         ORDER BY m.joined_at, u.id",
    )?;
    for group in &mut groups {
        group.members = member_stmt
            .query_map(params![group.id], |row| {
                Ok(GroupMember {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
    }
    Ok(groups)
}

// --- Messages ---

const MESSAGE_SELECT: &str = "SELECT m.id, m.group_id, m.sender_id, u.name, u.email, m.text, m.kind, m.created_at
     FROM messages m JOIN users u ON u.id = m.sender_id";

fn message_from_row(row: &Row) -> rusqlite::Result<ChatMessage> {
    let kind: String = row.get(6)?;
    Ok(ChatMessage {
        id: row.get(0)?,
        group_id: row.get(1)?,
        sender_id: row.get(2)?,
        sender_name: row.get(3)?,
        sender_email: row.get(4)?,
        text: row.get(5)?,
        kind: MessageKind::parse(&kind),
        created_at: row.get(7)?,
    })
}

/// Store a message and return it with the sender populated.
pub fn insert_message(
    conn: &Connection,
    group_id: i64,
    sender_id: i64,
    text: &str,
    kind: MessageKind,
) -> Result<ChatMessage> {
    conn.execute(
        "INSERT INTO messages (group_id, sender_id, text, kind) VALUES (?1, ?2, ?3, ?4)",
        params![group_id, sender_id, text, kind.as_str()],
    )?;
    let id = conn.last_insert_rowid();
    let mut stmt = conn.prepare(&format!("{MESSAGE_SELECT} WHERE m.id = ?1"))?;
    Ok(stmt.query_row(params![id], message_from_row)?)
}

/// All messages in a group, oldest first.
pub fn get_group_messages(conn: &Connection, group_id: i64) -> Result<Vec<ChatMessage>> {
    let mut stmt = conn.prepare(&format!(
        "{MESSAGE_SELECT} WHERE m.group_id = ?1 ORDER BY m.created_at ASC, m.id ASC"
    ))?;
    let messages = stmt
        .query_map(params![group_id], message_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(messages)
}

// --- Files ---

const FILE_SELECT: &str = "SELECT f.id, f.group_id, f.uploaded_by, u.name, f.original_name, f.file_name,
            f.file_type, f.file_path, f.size, f.created_at
     FROM files f JOIN users u ON u.id = f.uploaded_by";

fn file_from_row(row: &Row) -> rusqlite::Result<StoredFile> {
    Ok(StoredFile {
        id: row.get(0)?,
        group_id: row.get(1)?,
        uploaded_by: row.get(2)?,
        uploader_name: row.get(3)?,
        original_name: row.get(4)?,
        file_name: row.get(5)?,
        file_type: row.get(6)?,
        file_path: row.get(7)?,
        size: row.get(8)?,
        created_at: row.get(9)?,
    })
}

pub fn insert_file(conn: &Connection, file: &NewFile) -> Result<StoredFile> {
    conn.execute(
        "INSERT INTO files (group_id, uploaded_by, original_name, file_name, file_type, file_path, size)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            file.group_id,
            file.uploaded_by,
            file.original_name,
            file.file_name,
            file.file_type,
            file.file_path,
            file.size,
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_file(conn, id)?.ok_or_else(|| anyhow::anyhow!("File {id} vanished after insert"))
}

pub fn get_file(conn: &Connection, id: i64) -> Result<Option<StoredFile>> {
    let mut stmt = conn.prepare(&format!("{FILE_SELECT} WHERE f.id = ?1"))?;
    let result = stmt.query_row(params![id], file_from_row).optional()?;
    Ok(result)
}

/// Files uploaded to a group, newest first.
pub fn list_group_files(conn: &Connection, group_id: i64) -> Result<Vec<StoredFile>> {
    let mut stmt = conn.prepare(&format!(
        "{FILE_SELECT} WHERE f.group_id = ?1 ORDER BY f.created_at DESC, f.id DESC"
    ))?;
    let files = stmt
        .query_map(params![group_id], file_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(files)
}

// --- Summaries ---

fn summary_from_row(row: &Row) -> rusqlite::Result<SavedSummary> {
    let source: String = row.get(3)?;
    Ok(SavedSummary {
        id: row.get(0)?,
        group_id: row.get(1)?,
        generated_by: row.get(2)?,
        source: SummarySource::parse(&source),
        content: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub fn save_summary(
    conn: &Connection,
    group_id: i64,
    generated_by: i64,
    source: SummarySource,
    content: &str,
) -> Result<SavedSummary> {
    conn.execute(
        "INSERT INTO summaries (group_id, generated_by, source, content) VALUES (?1, ?2, ?3, ?4)",
        params![group_id, generated_by, source.as_str(), content],
    )?;
    let id = conn.last_insert_rowid();
    let mut stmt = conn.prepare(
        "SELECT id, group_id, generated_by, source, content, created_at FROM summaries WHERE id = ?1",
    )?;
    Ok(stmt.query_row(params![id], summary_from_row)?)
}

/// Most recent summaries for a group, newest first.
pub fn get_group_summaries(
    conn: &Connection,
    group_id: i64,
    limit: u32,
) -> Result<Vec<SavedSummary>> {
    let mut stmt = conn.prepare(
        "SELECT id, group_id, generated_by, source, content, created_at FROM summaries
         WHERE group_id = ?1
         ORDER BY created_at DESC, id DESC
         LIMIT ?2",
    )?;
    let summaries = stmt
        .query_map(params![group_id, limit], summary_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::create_tables;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn
    }

    #[test]
    fn test_duplicate_email_rejected_case_insensitively() {
        let conn = setup();
        create_user(&conn, "Ana", "ana@example.com", "h", UserRole::Member).unwrap();
        let err = create_user(&conn, "Ana Two", "ANA@example.com ", "h", UserRole::Member)
            .unwrap_err();
        assert!(DbError::is_duplicate_email(&err));
        assert_eq!(err.to_string(), "Email already registered");
    }

    #[test]
    fn test_credentials_lookup() {
        let conn = setup();
        let user = create_user(&conn, " Ben ", "Ben@Example.com", "hash", UserRole::Admin).unwrap();
        assert_eq!(user.name, "Ben");
        assert_eq!(user.email, "ben@example.com");

        let creds = get_credentials_by_email(&conn, "BEN@example.com").unwrap().unwrap();
        assert_eq!(creds.user.id, user.id);
        assert_eq!(creds.password_hash, "hash");
        assert_eq!(creds.user.role, UserRole::Admin);

        assert!(get_credentials_by_email(&conn, "nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn test_group_creator_is_member_and_join_is_idempotent() {
        let conn = setup();
        let admin = create_user(&conn, "Admin", "admin@example.com", "h", UserRole::Admin).unwrap();
        let student = create_user(&conn, "Cy", "cy@example.com", "h", UserRole::Member).unwrap();

        let group = create_group(&conn, "Physics", Some("Mechanics"), admin.id).unwrap();
        assert_eq!(group.members, vec![admin.id]);

        assert!(add_group_member(&conn, group.id, student.id).unwrap());
        assert!(!add_group_member(&conn, group.id, student.id).unwrap());
        assert!(is_group_member(&conn, group.id, student.id).unwrap());

        let mine = list_groups_for_user(&conn, student.id).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].members.len(), 2);

        let all = list_all_groups(&conn).unwrap();
        assert_eq!(all[0].members[1].email, "cy@example.com");
    }

    #[test]
    fn test_messages_ordered_oldest_first_with_sender() {
        let conn = setup();
        let user = create_user(&conn, "Dee", "dee@example.com", "h", UserRole::Admin).unwrap();
        let group = create_group(&conn, "Chem", None, user.id).unwrap();

        let first = insert_message(&conn, group.id, user.id, "first", MessageKind::Text).unwrap();
        insert_message(&conn, group.id, user.id, "second", MessageKind::File).unwrap();
        assert_eq!(first.sender_name, "Dee");

        let messages = get_group_messages(&conn, group.id).unwrap();
        let texts: Vec<&str> = messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(messages[1].kind, MessageKind::File);
    }

    #[test]
    fn test_files_and_summaries_newest_first() {
        let conn = setup();
        let user = create_user(&conn, "Eve", "eve@example.com", "h", UserRole::Admin).unwrap();
        let group = create_group(&conn, "Bio", None, user.id).unwrap();

        for name in ["a.pdf", "b.pdf"] {
            insert_file(
                &conn,
                &NewFile {
                    group_id: group.id,
                    uploaded_by: user.id,
                    original_name: name.to_string(),
                    file_name: format!("stored-{name}"),
                    file_type: Some("application/pdf".to_string()),
                    file_path: format!("uploads/stored-{name}"),
                    size: 10,
                },
            )
            .unwrap();
        }
        let files = list_group_files(&conn, group.id).unwrap();
        assert_eq!(files[0].original_name, "b.pdf");
        assert_eq!(files[0].uploader_name, "Eve");

        save_summary(&conn, group.id, user.id, SummarySource::Chat, "one").unwrap();
        save_summary(&conn, group.id, user.id, SummarySource::Document, "two").unwrap();
        let history = get_group_summaries(&conn, group.id, 1).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "two");
        assert_eq!(history[0].source, SummarySource::Document);

        let stats = stats(&conn).unwrap();
        assert_eq!(stats.files, 2);
        assert_eq!(stats.summaries, 2);
    }
}
