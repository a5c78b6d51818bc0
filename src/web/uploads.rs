// Upload storage — writes multipart files into the upload directory under
// collision-free names.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use rand::RngCore;

/// Name the stored copy `{unix_millis}-{random_hex}{.ext}`, keeping the
/// original extension so type detection still works.
pub fn stored_file_name(original_name: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();

    let mut suffix = [0u8; 4];
    rand::rng().fill_bytes(&mut suffix);

    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();

    format!("{millis}-{}{ext}", hex::encode(suffix))
}

/// Strip any directory components a client put in the file name.
pub fn clean_original_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    if base.is_empty() {
        "upload".to_string()
    } else {
        base.to_string()
    }
}

/// Path under which the router serves a stored upload.
pub fn upload_url(file_name: &str) -> String {
    format!("/uploads/{file_name}")
}

/// Chat text announcing an upload: the name people see, then the link to
/// the stored copy on its own line.
pub fn file_announcement(original_name: &str, file_name: &str) -> String {
    format!("{original_name}\n{}", upload_url(file_name))
}

/// Write an upload to disk and return where it went.
pub async fn save_upload(upload_dir: &Path, original_name: &str, bytes: &[u8]) -> Result<(String, PathBuf)> {
    tokio::fs::create_dir_all(upload_dir)
        .await
        .with_context(|| format!("Failed to create upload directory {}", upload_dir.display()))?;

    let file_name = stored_file_name(original_name);
    let path = upload_dir.join(&file_name);
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("Failed to write upload {}", path.display()))?;

    Ok((file_name, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_name_keeps_extension() {
        let name = stored_file_name("Lecture Notes.PDF");
        assert!(name.ends_with(".pdf"));
        let (millis, rest) = name.split_once('-').unwrap();
        assert!(millis.parse::<u128>().is_ok());
        assert_eq!(rest.len(), 8 + ".pdf".len());
    }

    #[test]
    fn test_stored_name_drops_odd_extension() {
        assert!(!stored_file_name("notes.p df").contains(' '));
        assert!(!stored_file_name("README").contains('.'));
    }

    #[test]
    fn test_clean_original_name() {
        assert_eq!(clean_original_name("../../etc/passwd"), "passwd");
        assert_eq!(clean_original_name("C:\\Users\\me\\notes.pdf"), "notes.pdf");
        assert_eq!(clean_original_name("  "), "upload");
    }

    #[test]
    fn test_file_announcement_links_stored_copy() {
        let text = file_announcement("Week 3.pdf", "1700000000000-0badf00d.pdf");
        let (name, link) = text.split_once('\n').unwrap();
        assert_eq!(name, "Week 3.pdf");
        assert_eq!(link, "/uploads/1700000000000-0badf00d.pdf");
    }

    #[tokio::test]
    async fn test_save_upload_writes_file() {
        let dir = std::env::temp_dir().join(format!("studyhub_uploads_{}", std::process::id()));
        let (file_name, path) = save_upload(&dir, "a.txt", b"hello").await.unwrap();
        assert!(file_name.ends_with(".txt"));
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
        std::fs::remove_dir_all(&dir).ok();
    }
}
