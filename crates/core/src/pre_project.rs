//! Pre-project proposal rules and advisor arbitration.
//!
//! Pure functions only; the transactional side lives in
//! `gradhub_db::lifecycle`.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::DbId;
use crate::validation::{char_len, FieldErrors};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const NAME_MIN_CHARS: usize = 3;
pub const NAME_MAX_CHARS: usize = 600;
pub const DESCRIPTION_MIN_CHARS: usize = 60;
pub const DESCRIPTION_MAX_CHARS: usize = 3000;

pub const MAX_STUDENTS: usize = 3;
pub const MAX_ADVISORS: usize = 3;

pub const SEASON_SPRING: &str = "spring";
pub const SEASON_FALL: &str = "fall";

/// Valid season values.
pub const VALID_SEASONS: &[&str] = &[SEASON_SPRING, SEASON_FALL];

// ---------------------------------------------------------------------------
// Advisor response status
// ---------------------------------------------------------------------------

/// An advisor's stance on a pre-project invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ResponseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseStatus::Pending => "pending",
            ResponseStatus::Accepted => "accepted",
            ResponseStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for ResponseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(ResponseStatus::Pending),
            "accepted" => Ok(ResponseStatus::Accepted),
            "rejected" => Ok(ResponseStatus::Rejected),
            other => Err(format!(
                "Invalid status '{other}'. Must be one of: pending, accepted, rejected"
            )),
        }
    }
}

impl std::fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Arbitration
// ---------------------------------------------------------------------------

/// What a response from an advisor should do, given the current pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// Upsert the advisor's row with a non-accepting status.
    Record(ResponseStatus),
    /// Attempt the compare-and-set on `accepted_advisor`.
    Accept,
    /// The caller already holds the acceptance.
    AlreadyAccepted,
    /// A different advisor holds the acceptance.
    AcceptedByOther,
}

/// Decide the outcome of `advisor_id` answering with `status`.
///
/// This is only the pre-check. A `Accept` outcome must still win the
/// conditional update inside the transaction.
pub fn arbitrate(
    accepted_advisor: Option<DbId>,
    advisor_id: DbId,
    status: ResponseStatus,
) -> ResponseOutcome {
    match (accepted_advisor, status) {
        (Some(holder), _) if holder == advisor_id => ResponseOutcome::AlreadyAccepted,
        (Some(_), ResponseStatus::Accepted) => ResponseOutcome::AcceptedByOther,
        (None, ResponseStatus::Accepted) => ResponseOutcome::Accept,
        (_, other) => ResponseOutcome::Record(other),
    }
}

/// Whether a supplied advisor list differs from the current set.
/// Order and duplicates are ignored.
pub fn advisor_set_changed(current: &[DbId], supplied: &[DbId]) -> bool {
    let a: BTreeSet<DbId> = current.iter().copied().collect();
    let b: BTreeSet<DbId> = supplied.iter().copied().collect();
    a != b
}

/// Ids in `supplied` that are not in `current`.
pub fn newly_added(current: &[DbId], supplied: &[DbId]) -> Vec<DbId> {
    let existing: BTreeSet<DbId> = current.iter().copied().collect();
    let mut seen = BTreeSet::new();
    supplied
        .iter()
        .copied()
        .filter(|id| !existing.contains(id) && seen.insert(*id))
        .collect()
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Fields of a new proposal.
#[derive(Debug, Clone, Copy)]
pub struct ProposalDraft<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub year: i32,
    pub season: &'a str,
    pub file: Option<&'a str>,
    pub student_ids: &'a [DbId],
    pub advisor_ids: &'a [DbId],
}

/// Fields of a partial update. `None` means "leave unchanged".
#[derive(Debug, Clone, Copy, Default)]
pub struct ProposalPatch<'a> {
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub year: Option<i32>,
    pub season: Option<&'a str>,
    pub degree: Option<i32>,
    pub file: Option<&'a str>,
    pub student_ids: Option<&'a [DbId]>,
    pub advisor_ids: Option<&'a [DbId]>,
}

pub fn validate_proposal(draft: &ProposalDraft<'_>, current_year: i32) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    check_name(&mut errors, draft.name);
    check_description(&mut errors, draft.description);
    check_year(&mut errors, draft.year, current_year);
    check_season(&mut errors, draft.season);
    if let Some(file) = draft.file {
        check_file(&mut errors, file);
    }
    check_id_list(&mut errors, "students", draft.student_ids, MAX_STUDENTS);
    check_id_list(&mut errors, "advisors", draft.advisor_ids, MAX_ADVISORS);
    errors.into_result()
}

pub fn validate_proposal_patch(
    patch: &ProposalPatch<'_>,
    current_year: i32,
) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if let Some(name) = patch.name {
        check_name(&mut errors, name);
    }
    if let Some(description) = patch.description {
        check_description(&mut errors, description);
    }
    if let Some(year) = patch.year {
        check_year(&mut errors, year, current_year);
    }
    if let Some(season) = patch.season {
        check_season(&mut errors, season);
    }
    if let Some(degree) = patch.degree {
        errors.check(degree > 0, "degree", "Degree must be a positive number");
    }
    if let Some(file) = patch.file {
        check_file(&mut errors, file);
    }
    if let Some(ids) = patch.student_ids {
        check_id_list(&mut errors, "students", ids, MAX_STUDENTS);
    }
    if let Some(ids) = patch.advisor_ids {
        check_id_list(&mut errors, "advisors", ids, MAX_ADVISORS);
    }
    errors.into_result()
}

pub(crate) fn check_name(errors: &mut FieldErrors, name: &str) {
    let len = char_len(name.trim());
    errors.check(len > 0, "name", "Project name is required");
    errors.check(
        len >= NAME_MIN_CHARS,
        "name",
        format!("Project name must be at least {NAME_MIN_CHARS} characters"),
    );
    errors.check(
        len <= NAME_MAX_CHARS,
        "name",
        format!("Project name must be at most {NAME_MAX_CHARS} characters"),
    );
}

pub(crate) fn check_description(errors: &mut FieldErrors, description: &str) {
    let len = char_len(description.trim());
    errors.check(
        len >= DESCRIPTION_MIN_CHARS,
        "description",
        format!("Project description must be at least {DESCRIPTION_MIN_CHARS} characters"),
    );
    errors.check(
        len <= DESCRIPTION_MAX_CHARS,
        "description",
        format!("Project description must be at most {DESCRIPTION_MAX_CHARS} characters"),
    );
}

pub(crate) fn check_season(errors: &mut FieldErrors, season: &str) {
    errors.check(!season.is_empty(), "season", "Season is required");
    errors.check(
        VALID_SEASONS.contains(&season),
        "season",
        "Season must be spring or fall",
    );
}

fn check_year(errors: &mut FieldErrors, year: i32, current_year: i32) {
    errors.check(
        year >= current_year,
        "year",
        "Project year must be the current year or later",
    );
}

fn check_file(errors: &mut FieldErrors, file: &str) {
    errors.check(!file.trim().is_empty(), "file", "Invalid file path");
}

/// `ids` must hold between 1 and `max` distinct entries.
pub(crate) fn check_id_list(errors: &mut FieldErrors, field: &str, ids: &[DbId], max: usize) {
    errors.check(!ids.is_empty(), field, format!("At least one entry is required in {field}"));
    errors.check(
        ids.len() <= max,
        field,
        format!("No more than {max} entries are allowed in {field}"),
    );
    let distinct: BTreeSet<&DbId> = ids.iter().collect();
    errors.check(
        distinct.len() == ids.len(),
        field,
        format!("Duplicate entries in {field}"),
    );
}
