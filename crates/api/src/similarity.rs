//! HTTP client and request gate for the external similarity service.
//!
//! The service is POSTed `{project_name, project_description,
//! similarity_threshold}` and answers with 200 or 409, both carrying a
//! `similar_projects` list. Any other outcome counts as unreachable.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gradhub_core::roles::{ROLE_ADMIN, ROLE_TEACHER};
use gradhub_core::similarity::{
    blocking_for_update, filter_blocking, SimilarityRequest, SimilarityResponse,
};
use gradhub_core::types::DbId;
use reqwest::StatusCode;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;

/// Request timeout for the similarity service.
const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum SimilarityError {
    #[error("Similarity service is offline or unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    #[error("Similarity service returned unexpected status {0}")]
    UnexpectedStatus(u16),
}

/// Scores a proposal against existing projects.
#[async_trait]
pub trait SimilarityChecker: Send + Sync {
    async fn check(
        &self,
        name: &str,
        description: &str,
    ) -> Result<SimilarityResponse, SimilarityError>;
}

/// [`SimilarityChecker`] backed by the HTTP service.
pub struct HttpSimilarityClient {
    client: reqwest::Client,
    url: String,
}

impl HttpSimilarityClient {
    pub fn new(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl SimilarityChecker for HttpSimilarityClient {
    async fn check(
        &self,
        name: &str,
        description: &str,
    ) -> Result<SimilarityResponse, SimilarityError> {
        let response = self
            .client
            .post(&self.url)
            .json(&SimilarityRequest::new(name, description))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::CONFLICT => Ok(response.json().await?),
            other => Err(SimilarityError::UnexpectedStatus(other.as_u16())),
        }
    }
}

/// Reject the mutation when the proposal is too close to existing work.
///
/// Does nothing when no checker is configured. Admins and teachers can
/// bypass with `confirm`. When `updating` is set the project itself is
/// ignored as the top match.
pub async fn enforce(
    checker: Option<&Arc<dyn SimilarityChecker>>,
    user: &AuthUser,
    confirm: bool,
    name: &str,
    description: &str,
    updating: Option<DbId>,
) -> AppResult<()> {
    let Some(checker) = checker else {
        return Ok(());
    };

    if confirm && (user.has_role(ROLE_ADMIN) || user.has_role(ROLE_TEACHER)) {
        tracing::info!(user_id = user.user_id, "Similarity check bypassed by confirmation");
        return Ok(());
    }

    let response = checker
        .check(name, description)
        .await
        .map_err(|e| AppError::ServiceUnavailable(e.to_string()))?;

    let blocking = match updating {
        Some(id) => blocking_for_update(response, id),
        None => filter_blocking(response),
    };

    if blocking.is_empty() {
        Ok(())
    } else {
        tracing::info!(
            user_id = user.user_id,
            matches = blocking.len(),
            "Mutation blocked by similarity gate"
        );
        Err(AppError::SimilarProjects(blocking))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    struct Fixed(serde_json::Value);

    #[async_trait]
    impl SimilarityChecker for Fixed {
        async fn check(&self, _: &str, _: &str) -> Result<SimilarityResponse, SimilarityError> {
            Ok(serde_json::from_value(self.0.clone()).unwrap())
        }
    }

    struct Offline;

    #[async_trait]
    impl SimilarityChecker for Offline {
        async fn check(&self, _: &str, _: &str) -> Result<SimilarityResponse, SimilarityError> {
            Err(SimilarityError::UnexpectedStatus(502))
        }
    }

    fn user(roles: &[&str]) -> AuthUser {
        AuthUser {
            user_id: 1,
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn close_match(id: i64, table: &str) -> Arc<dyn SimilarityChecker> {
        Arc::new(Fixed(json!({
            "similar_projects": [
                {"project_id": id, "name": "x", "similarity_score": 80.0, "source_table": table}
            ]
        })))
    }

    #[tokio::test]
    async fn disabled_gate_allows_everything() {
        assert!(enforce(None, &user(&["student"]), false, "n", "d", None).await.is_ok());
    }

    #[tokio::test]
    async fn close_match_blocks_students_even_with_confirm() {
        let checker = close_match(5, "books");
        assert_matches!(
            enforce(Some(&checker), &user(&["student"]), true, "n", "d", None).await,
            Err(AppError::SimilarProjects(p)) if p.len() == 1
        );
    }

    #[tokio::test]
    async fn teacher_can_confirm_past_the_gate() {
        let checker = close_match(5, "books");
        assert!(enforce(Some(&checker), &user(&["teacher"]), true, "n", "d", None)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn update_ignores_self_match() {
        let checker = close_match(9, "pre_projects");
        assert!(enforce(Some(&checker), &user(&["student"]), false, "n", "d", Some(9))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn unreachable_service_is_503() {
        let checker: Arc<dyn SimilarityChecker> = Arc::new(Offline);
        assert_matches!(
            enforce(Some(&checker), &user(&["student"]), false, "n", "d", None).await,
            Err(AppError::ServiceUnavailable(_))
        );
    }
}
