//! Direct-messaging rules.

use crate::types::DbId;
use crate::validation::{char_len, FieldErrors};

pub const MESSAGE_MAX_CHARS: usize = 5000;

/// Canonical storage order for a conversation pair (`user1_id < user2_id`).
pub fn ordered_pair(a: DbId, b: DbId) -> (DbId, DbId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// The participant of `(user1, user2)` that is not `me`, or `None` if `me`
/// is not part of the pair.
pub fn other_participant(pair: (DbId, DbId), me: DbId) -> Option<DbId> {
    match pair {
        (a, b) if a == me => Some(b),
        (a, b) if b == me => Some(a),
        _ => None,
    }
}

pub fn validate_message(
    sender_id: DbId,
    receiver_id: DbId,
    body: Option<&str>,
    has_file: bool,
) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    errors.check(
        sender_id != receiver_id,
        "receiver_id",
        "You cannot send a message to yourself",
    );
    let body = body.map(str::trim).filter(|b| !b.is_empty());
    match body {
        None => errors.check(has_file, "body", "A message needs text or a file"),
        Some(text) => errors.check(
            char_len(text) <= MESSAGE_MAX_CHARS,
            "body",
            format!("Message must be at most {MESSAGE_MAX_CHARS} characters"),
        ),
    }
    errors.into_result()
}
