use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

pub const RESULT_PREFIX: &str = "result_";

/// Owns the static-asset directory that uploads and annotated results are
/// written to, and that the server serves back under `/static`.
#[derive(Clone)]
pub struct AssetStore {
    directory: PathBuf,
}

impl AssetStore {
    pub fn new(directory: PathBuf) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.directory.join(filename)
    }

    pub fn static_url(&self, filename: &str) -> String {
        format!("/static/{}", filename)
    }

    /// Sanitized original name behind a fresh hex token, so two uploads of
    /// `car.jpg` never collide in the shared directory.
    pub fn unique_filename(&self, original: &str) -> String {
        format!("{}_{}", Uuid::new_v4().simple(), sanitize_filename(original))
    }

    pub fn result_filename(&self, unique: &str) -> String {
        format!("{}{}", RESULT_PREFIX, unique)
    }

    pub async fn save_upload(&self, filename: &str, data: &[u8]) -> std::io::Result<PathBuf> {
        let path = self.path_for(filename);
        tokio::fs::write(&path, data).await?;
        Ok(path)
    }
}

/// Extension allow-list check: text after the last `.`, case-insensitive.
/// A name without a `.` is rejected outright.
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

/// Strips path components and anything outside `[A-Za-z0-9._-]`, so a
/// client-supplied name can never escape the asset directory.
pub fn sanitize_filename(original: &str) -> String {
    let basename = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original);

    let cleaned: String = basename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_file_accepts_listed_extensions_case_insensitively() {
        assert!(allowed_file("car.jpg"));
        assert!(allowed_file("car.JPEG"));
        assert!(allowed_file("car.Png"));
    }

    #[test]
    fn allowed_file_rejects_unlisted_extensions() {
        assert!(!allowed_file("car.gif"));
        assert!(!allowed_file("car.jpg.exe"));
    }

    #[test]
    fn allowed_file_rejects_names_without_a_dot() {
        assert!(!allowed_file("car"));
        assert!(!allowed_file(""));
    }

    #[test]
    fn sanitize_strips_path_components() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\uploads\\car.jpg"), "car.jpg");
    }

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_filename("my car (1).jpg"), "my_car__1_.jpg");
        assert_eq!(sanitize_filename("héllo.png"), "h_llo.png");
    }

    #[test]
    fn sanitize_never_returns_an_empty_name() {
        assert_eq!(sanitize_filename("..."), "upload");
        assert_eq!(sanitize_filename("///"), "upload");
    }

    #[test]
    fn unique_filenames_differ_for_identical_originals() {
        let store = AssetStore::new(PathBuf::from("static"));
        let first = store.unique_filename("car.jpg");
        let second = store.unique_filename("car.jpg");

        assert_ne!(first, second);
        assert!(first.ends_with("_car.jpg"));
        assert!(second.ends_with("_car.jpg"));
    }

    #[tokio::test]
    async fn save_upload_writes_into_the_store_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = AssetStore::new(dir.path().to_path_buf());

        let path = store.save_upload("abc_car.jpg", b"bytes").await.unwrap();

        assert_eq!(path, dir.path().join("abc_car.jpg"));
        assert_eq!(std::fs::read(path).unwrap(), b"bytes");
    }
}
