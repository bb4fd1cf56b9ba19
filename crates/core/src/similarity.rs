//! Similarity gate for project proposals.
//!
//! An external service scores a proposed name/description against existing
//! projects and books. Candidates scoring above [`SIMILARITY_THRESHOLD`] block
//! the mutation unless a privileged caller confirms it.

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// Score (0..=100) above which a candidate blocks the mutation.
pub const SIMILARITY_THRESHOLD: f64 = 50.0;

/// Threshold sent to the service so it can pre-filter on its side.
pub const REQUEST_THRESHOLD: i32 = 50;

/// Body POSTed to the similarity service.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarityRequest<'a> {
    pub project_name: &'a str,
    pub project_description: &'a str,
    pub similarity_threshold: i32,
}

impl<'a> SimilarityRequest<'a> {
    pub fn new(project_name: &'a str, project_description: &'a str) -> Self {
        Self {
            project_name,
            project_description,
            similarity_threshold: REQUEST_THRESHOLD,
        }
    }
}

/// One candidate as returned by the service. Entries missing a score or a
/// source table are dropped during filtering.
#[derive(Debug, Clone, Deserialize)]
pub struct SimilarityCandidate {
    #[serde(default)]
    pub project_id: serde_json::Value,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub similarity_score: Option<f64>,
    #[serde(default)]
    pub source_table: Option<String>,
}

/// Service response body (returned with either 200 or 409).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimilarityResponse {
    #[serde(default)]
    pub similar_projects: Vec<SimilarityCandidate>,
}

/// A candidate that blocks the mutation, as reported back to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarProject {
    pub project_id: serde_json::Value,
    pub project_name: Option<String>,
    pub project_description: Option<String>,
    pub similarity_score: f64,
    pub source_table: String,
}

impl SimilarProject {
    /// Whether this match points at the pre-project with the given id.
    pub fn refers_to_pre_project(&self, id: DbId) -> bool {
        if self.source_table != "pre_projects" {
            return false;
        }
        match &self.project_id {
            serde_json::Value::Number(n) => n.as_i64() == Some(id),
            serde_json::Value::String(s) => s.trim().parse::<DbId>().ok() == Some(id),
            _ => false,
        }
    }
}

/// Keep only candidates scoring strictly above the threshold, preserving
/// the service's order (highest first).
pub fn filter_blocking(response: SimilarityResponse) -> Vec<SimilarProject> {
    response
        .similar_projects
        .into_iter()
        .filter_map(|c| {
            let score = c.similarity_score?;
            let source_table = c.source_table?;
            (score > SIMILARITY_THRESHOLD).then(|| SimilarProject {
                project_id: c.project_id,
                project_name: c.name,
                project_description: c.description,
                similarity_score: score,
                source_table,
            })
        })
        .collect()
}

/// Blocking matches for an update of pre-project `id`.
///
/// When the top match is the project itself the edit is allowed through,
/// since the service indexes the stored version too.
pub fn blocking_for_update(response: SimilarityResponse, id: DbId) -> Vec<SimilarProject> {
    let blocking = filter_blocking(response);
    match blocking.first() {
        Some(top) if top.refers_to_pre_project(id) => Vec::new(),
        _ => blocking,
    }
}
