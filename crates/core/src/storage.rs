//! File storage for uploaded attachments.
//!
//! Uploads are stored under a root directory, grouped by category:
//! `<root>/<category>/<category>_<millis>_<rand><ext>`. The returned path is
//! relative to the root so it can be served from `/uploads/<path>`.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use rand::Rng;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const CATEGORY_PRE_PROJECTS: &str = "pre_projects";
pub const CATEGORY_BOOKS: &str = "books";
pub const CATEGORY_POSTS: &str = "posts";
pub const CATEGORY_MESSAGES: &str = "messages";
pub const CATEGORY_USERS: &str = "users";

/// Valid upload categories.
pub const VALID_CATEGORIES: &[&str] = &[
    CATEGORY_PRE_PROJECTS,
    CATEGORY_BOOKS,
    CATEGORY_POSTS,
    CATEGORY_MESSAGES,
    CATEGORY_USERS,
];

/// Maximum accepted upload size (20 MiB).
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Unknown upload category '{0}'")]
    UnknownCategory(String),

    #[error("File is too large ({size} bytes, max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("Invalid stored path '{0}'")]
    InvalidPath(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Storage backend for uploaded files.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Persist `bytes` and return the stored relative path.
    async fn save(
        &self,
        bytes: &[u8],
        category: &str,
        original_name: &str,
    ) -> Result<String, StorageError>;

    /// Remove a previously stored file. Missing files are not an error.
    async fn delete(&self, path: &str) -> Result<(), StorageError>;
}

// ---------------------------------------------------------------------------
// Local filesystem backend
// ---------------------------------------------------------------------------

/// Stores files on the local filesystem under `root`.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf, StorageError> {
        let rel = Path::new(relative);
        let safe = !relative.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StorageError::InvalidPath(relative.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn save(
        &self,
        bytes: &[u8],
        category: &str,
        original_name: &str,
    ) -> Result<String, StorageError> {
        if !VALID_CATEGORIES.contains(&category) {
            return Err(StorageError::UnknownCategory(category.to_string()));
        }
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(StorageError::TooLarge {
                size: bytes.len(),
                max: MAX_UPLOAD_BYTES,
            });
        }

        let dir = self.root.join(category);
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = stored_file_name(category, original_name);
        tokio::fs::write(dir.join(&file_name), bytes).await?;

        let relative = format!("{category}/{file_name}");
        tracing::debug!(path = %relative, size = bytes.len(), "Stored upload");
        Ok(relative)
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let full = self.resolve(path)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Build `<category>_<millis>_<rand><ext>` for an upload.
///
/// The extension is taken from the client's file name, lowercased and
/// limited to alphanumerics.
pub fn stored_file_name(category: &str, original_name: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::rng().random_range(100_000..1_000_000);
    format!("{category}_{millis}_{suffix}{}", extension_of(original_name))
}

fn extension_of(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 10 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}
