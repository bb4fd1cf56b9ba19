//! Validation for finalized project records (books) and for the
//! pre-project to book migration.

use crate::pre_project::{check_description, check_id_list, check_name, check_season};
use crate::types::DbId;
use crate::validation::FieldErrors;

pub const MAX_BOOK_STUDENTS: usize = 5;
pub const MAX_BOOK_ADVISORS: usize = 3;
pub const MAX_DISCUSSANTS: usize = 3;

/// Fields of a book, as created by an admin or by migration.
#[derive(Debug, Clone, Copy)]
pub struct BookDraft<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub year: i32,
    pub season: &'a str,
    pub degree: Option<i32>,
    pub student_ids: &'a [DbId],
    pub advisor_ids: &'a [DbId],
    pub discussant_ids: &'a [DbId],
}

pub fn validate_book(draft: &BookDraft<'_>) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    check_name(&mut errors, draft.name);
    check_description(&mut errors, draft.description);
    errors.check(draft.year > 0, "year", "Year is required");
    check_season(&mut errors, draft.season);
    if let Some(degree) = draft.degree {
        errors.check(degree > 0, "degree", "Degree must be a positive number");
    }
    check_id_list(&mut errors, "students", draft.student_ids, MAX_BOOK_STUDENTS);
    check_id_list(&mut errors, "advisors", draft.advisor_ids, MAX_BOOK_ADVISORS);
    check_id_list(&mut errors, "discussants", draft.discussant_ids, MAX_DISCUSSANTS);
    errors.into_result()
}

/// Inputs the admin supplies when migrating an accepted pre-project.
pub fn validate_migration(degree: i32, discussant_ids: &[DbId]) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    errors.check(degree > 0, "degree", "Degree must be a positive number");
    check_id_list(&mut errors, "discussants", discussant_ids, MAX_DISCUSSANTS);
    errors.into_result()
}

/// Validate a discussant list supplied on a pre-project update.
pub fn validate_discussants(discussant_ids: &[DbId]) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    errors.check(
        discussant_ids.len() <= MAX_DISCUSSANTS,
        "discussants",
        format!("No more than {MAX_DISCUSSANTS} entries are allowed in discussants"),
    );
    errors.into_result()
}
