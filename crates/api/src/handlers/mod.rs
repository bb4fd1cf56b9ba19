//! Request handlers.
//!
//! Each submodule provides the async handler functions for one resource.
//! Handlers delegate to the repositories in `gradhub_db` (or to the
//! pre-project lifecycle controller) and map errors via [`AppError`].
//!
//! [`AppError`]: crate::error::AppError

pub mod auth;
pub mod books;
pub mod messaging;
pub mod posts;
pub mod pre_projects;
pub mod roles;
pub mod users;
