//! Multipart form parsing for endpoints that accept an optional upload.
//!
//! Text fields are collected into a map; the single `file` part is kept in
//! memory until the handler decides to store it.

use std::collections::HashMap;

use axum::extract::Multipart;
use gradhub_core::storage::FileStorage;
use gradhub_core::types::DbId;
use gradhub_core::validation::FieldErrors;
use gradhub_db::repositories::UserRepo;
use gradhub_db::DbPool;

use crate::error::{AppError, AppResult};

/// Name of the multipart part carrying the upload.
pub const FILE_FIELD: &str = "file";

/// An uploaded file held in memory.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Parsed multipart body.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
}

impl FormData {
    /// Drain a multipart stream. An empty file part counts as no file.
    pub async fn from_multipart(multipart: Multipart) -> AppResult<Self> {
        Self::with_file_field(multipart, FILE_FIELD).await
    }

    /// Like [`FormData::from_multipart`], with the upload under `file_field`.
    pub async fn with_file_field(mut multipart: Multipart, file_field: &str) -> AppResult<Self> {
        let mut form = FormData::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or("").to_string();
            if name == file_field {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                if !data.is_empty() {
                    form.file = Some(UploadedFile {
                        file_name,
                        bytes: data.to_vec(),
                    });
                }
            } else if !name.is_empty() {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.fields.insert(name, text);
            }
        }

        Ok(form)
    }

    /// Build a form from plain key/value pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            file: None,
        }
    }

    /// Trimmed value, `None` when absent or blank.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Trimmed value or an empty string.
    pub fn text_or_empty(&self, key: &str) -> String {
        self.text(key).unwrap_or_default().to_string()
    }

    /// Optional integer. A malformed value is recorded in `errors`.
    pub fn int(&self, key: &str, errors: &mut FieldErrors) -> Option<i32> {
        let raw = self.text(key)?;
        match raw.parse::<i32>() {
            Ok(value) => Some(value),
            Err(_) => {
                errors.add(key, format!("{key} must be a whole number"));
                None
            }
        }
    }

    /// Required integer. Absence or a malformed value is recorded in `errors`.
    pub fn required_int(&self, key: &str, errors: &mut FieldErrors) -> i32 {
        if self.text(key).is_none() {
            errors.add(key, format!("{key} is required"));
            return 0;
        }
        self.int(key, errors).unwrap_or_default()
    }

    /// Required entity id.
    pub fn required_id(&self, key: &str, errors: &mut FieldErrors) -> DbId {
        match self.text(key).map(str::parse::<DbId>) {
            Some(Ok(id)) => id,
            Some(Err(_)) => {
                errors.add(key, format!("{key} must be a valid id"));
                0
            }
            None => {
                errors.add(key, format!("{key} is required"));
                0
            }
        }
    }

    /// `true` for `true`, `1`, `yes`, or `on` (case-insensitive).
    pub fn flag(&self, key: &str) -> bool {
        self.text(key)
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on"))
            .unwrap_or(false)
    }

    /// The raw comma-separated participant list, `None` when the field is
    /// absent. A present but blank field yields `Some("")`.
    pub fn list(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(|v| v.trim())
    }
}

/// Split a comma-separated participant list into tokens.
pub fn split_tokens(raw: &str) -> Vec<&str> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Resolve participant tokens to user ids.
///
/// Numeric tokens are ids, anything else is looked up as an email. Unknown
/// or inactive users are reported under `field`.
pub async fn resolve_users(pool: &DbPool, field: &str, raw: &str) -> AppResult<Vec<DbId>> {
    let mut ids = Vec::new();
    let mut unknown = Vec::new();

    for token in split_tokens(raw) {
        if let Ok(id) = token.parse::<DbId>() {
            ids.push(id);
            continue;
        }
        match UserRepo::find_by_email(pool, token).await? {
            Some(user) if user.is_active => ids.push(user.id),
            _ => unknown.push(token.to_string()),
        }
    }

    if !ids.is_empty() {
        let missing = UserRepo::missing_ids(pool, &ids).await?;
        unknown.extend(missing.iter().map(DbId::to_string));
    }

    if unknown.is_empty() {
        Ok(ids)
    } else {
        let mut errors = FieldErrors::new();
        errors.add(field, format!("Unknown user(s): {}", unknown.join(", ")));
        Err(errors.into())
    }
}

/// Resolve an optional list field: absent stays `None`.
pub async fn resolve_optional_users(
    pool: &DbPool,
    form: &FormData,
    field: &str,
) -> AppResult<Option<Vec<DbId>>> {
    match form.list(field) {
        Some(raw) => Ok(Some(resolve_users(pool, field, raw).await?)),
        None => Ok(None),
    }
}

/// Persist the form's upload, if any, and return its stored path.
/// Oversized files surface as a field error on `file`.
pub async fn store_upload(
    storage: &dyn FileStorage,
    category: &str,
    file: Option<&UploadedFile>,
) -> AppResult<Option<String>> {
    let Some(file) = file else {
        return Ok(None);
    };
    let path = storage.save(&file.bytes, category, &file.file_name).await?;
    Ok(Some(path))
}

/// Best-effort removal of a stored file; failures are only logged.
pub async fn discard_upload(storage: &dyn FileStorage, path: &str) {
    if let Err(e) = storage.delete(path).await {
        tracing::warn!(path, error = %e, "Failed to delete stored file");
    }
}
