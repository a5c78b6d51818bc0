// Data models — Rust structs that map to database rows.
//
// These are the types that flow through the application. They're separate
// from the database queries so other modules can use them without depending
// on a particular backend.

use serde::{Deserialize, Serialize};

/// What a user is allowed to do. Only admins may create groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Member,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Member => "member",
            UserRole::Admin => "admin",
        }
    }

    /// Parse a stored role. Unknown values are treated as plain members.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => UserRole::Admin,
            _ => UserRole::Member,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A registered user. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: String,
}

/// A user together with their stored password hash, for login checks only.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// A study group and the ids of its members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyGroup {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_by: i64,
    pub members: Vec<i64>,
    pub created_at: String,
}

impl StudyGroup {
    pub fn has_member(&self, user_id: i64) -> bool {
        self.members.contains(&user_id)
    }
}

/// Member details shown in the "all groups" listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// A group with its members' names and emails filled in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupWithMembers {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub members: Vec<GroupMember>,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    File,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::File => "file",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "file" => MessageKind::File,
            _ => MessageKind::Text,
        }
    }
}

/// A chat message with the sender's name and email populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub group_id: i64,
    pub sender_id: i64,
    pub sender_name: String,
    pub sender_email: String,
    pub text: String,
    pub kind: MessageKind,
    pub created_at: String,
}

/// Metadata for a new upload, before it has an id.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub group_id: i64,
    pub uploaded_by: i64,
    pub original_name: String,
    /// Name of the file on disk inside the upload directory.
    pub file_name: String,
    pub file_type: Option<String>,
    pub file_path: String,
    pub size: i64,
}

/// An uploaded file, with the uploader's name populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: i64,
    pub group_id: i64,
    pub uploaded_by: i64,
    pub uploader_name: String,
    pub original_name: String,
    pub file_name: String,
    pub file_type: Option<String>,
    pub file_path: String,
    pub size: i64,
    pub created_at: String,
}

/// Where a saved summary came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummarySource {
    Chat,
    Document,
}

impl SummarySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummarySource::Chat => "chat",
            SummarySource::Document => "document",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "document" => SummarySource::Document,
            _ => SummarySource::Chat,
        }
    }
}

/// A summary that was generated and kept for the group's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSummary {
    pub id: i64,
    pub group_id: i64,
    pub generated_by: i64,
    pub source: SummarySource,
    pub content: String,
    pub created_at: String,
}

/// Row counts for the status display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DbStats {
    pub users: i64,
    pub groups: i64,
    pub messages: i64,
    pub files: i64,
    pub summaries: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_and_display() {
        assert_eq!(UserRole::parse("Admin"), UserRole::Admin);
        assert_eq!(UserRole::parse("member"), UserRole::Member);
        assert_eq!(UserRole::parse("superuser"), UserRole::Member);
        assert_eq!(UserRole::Admin.to_string(), "admin");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&UserRole::Admin).unwrap();
        assert_eq!(json, r#""admin""#);
    }

    #[test]
    fn test_group_membership() {
        let group = StudyGroup {
            id: 1,
            name: "Algorithms".to_string(),
            description: None,
            created_by: 7,
            members: vec![7, 9],
            created_at: String::new(),
        };
        assert!(group.has_member(9));
        assert!(!group.has_member(3));
    }
}
