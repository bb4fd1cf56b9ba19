//! Shared fixtures for database integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Datelike;
use gradhub_core::storage::{FileStorage, StorageError};
use gradhub_core::types::DbId;
use gradhub_db::lifecycle::PreProjectLifecycle;
use gradhub_db::models::pre_project::CreatePreProject;
use gradhub_db::models::user::CreateUser;
use gradhub_db::repositories::{UserRepo, UserRoleRepo};
use sqlx::PgPool;

/// Storage double that records deletions instead of touching disk.
#[derive(Default)]
pub struct RecordingStorage {
    pub deleted: Mutex<Vec<String>>,
}

impl RecordingStorage {
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileStorage for RecordingStorage {
    async fn save(
        &self,
        _bytes: &[u8],
        category: &str,
        original_name: &str,
    ) -> Result<String, StorageError> {
        Ok(format!("{category}/{original_name}"))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.deleted.lock().unwrap().push(path.to_string());
        Ok(())
    }
}

pub fn lifecycle(pool: &PgPool) -> (PreProjectLifecycle, Arc<RecordingStorage>) {
    let storage = Arc::new(RecordingStorage::default());
    (PreProjectLifecycle::new(pool.clone(), storage.clone()), storage)
}

/// Insert a user and grant the given roles.
pub async fn user(pool: &PgPool, name: &str, roles: &[&str]) -> DbId {
    let created = UserRepo::create(
        pool,
        &CreateUser {
            name: name.to_string(),
            email: format!("{}@uni.test", name.to_lowercase().replace(' ', ".")),
            password_hash: "not-a-real-hash".to_string(),
            image: None,
        },
    )
    .await
    .unwrap();
    for role in roles {
        UserRoleRepo::grant(pool, created.id, role).await.unwrap();
    }
    created.id
}

pub fn this_year() -> i32 {
    chrono::Utc::now().year()
}

pub fn description() -> String {
    "A platform that follows graduation projects from first proposal to the archived book."
        .to_string()
}

pub fn proposal(name: &str) -> CreatePreProject {
    CreatePreProject {
        name: name.to_string(),
        description: description(),
        file: Some(format!("pre_projects/{}.pdf", name.to_lowercase().replace(' ', "_"))),
        file_description: None,
        year: this_year(),
        season: "fall".to_string(),
    }
}
