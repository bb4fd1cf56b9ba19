//! Domain rules for the graduation-project backend.
//!
//! Everything here is free of database access: constants, validation,
//! error taxonomy, the similarity gate, and the file-storage seam.

pub mod book;
pub mod error;
pub mod messaging;
pub mod post;
pub mod pre_project;
pub mod roles;
pub mod search;
pub mod similarity;
pub mod storage;
pub mod types;
pub mod validation;
