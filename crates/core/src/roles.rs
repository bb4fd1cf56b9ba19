//! Well-known role name constants.
//!
//! These must match the seed data in `20260301000002_create_roles.sql`.
//! A user holds a set of roles; JWT claims carry the names.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_TEACHER: &str = "teacher";
pub const ROLE_STUDENT: &str = "student";
pub const ROLE_GRADUATION_STUDENT: &str = "graduation_student";
pub const ROLE_GRADUATED: &str = "graduated";

/// All seeded role names.
pub const ALL_ROLES: &[&str] = &[
    ROLE_ADMIN,
    ROLE_TEACHER,
    ROLE_STUDENT,
    ROLE_GRADUATION_STUDENT,
    ROLE_GRADUATED,
];

/// Returns `true` if `roles` contains `role`.
pub fn has_role<S: AsRef<str>>(roles: &[S], role: &str) -> bool {
    roles.iter().any(|r| r.as_ref() == role)
}

/// Returns `true` if `roles` contains any of `wanted`.
pub fn has_any_role<S: AsRef<str>>(roles: &[S], wanted: &[&str]) -> bool {
    wanted.iter().any(|w| has_role(roles, w))
}

pub fn is_known_role(name: &str) -> bool {
    ALL_ROLES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_role_matches_exact_names() {
        let roles = vec!["student".to_string(), "graduation_student".to_string()];
        assert!(has_role(&roles, ROLE_GRADUATION_STUDENT));
        assert!(!has_role(&roles, ROLE_ADMIN));
    }

    #[test]
    fn has_any_role_checks_each_candidate() {
        let roles = ["teacher"];
        assert!(has_any_role(&roles, &[ROLE_ADMIN, ROLE_TEACHER]));
        assert!(!has_any_role(&roles, &[ROLE_ADMIN, ROLE_GRADUATED]));
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!(is_known_role("graduated"));
        assert!(!is_known_role("superuser"));
    }
}
