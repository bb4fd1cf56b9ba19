//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument. Methods that must run
//! inside a caller-owned transaction take `&mut Transaction` instead and
//! carry a `_tx` suffix.

pub mod advisor_response_repo;
pub mod book_repo;
pub mod conversation_repo;
pub mod message_repo;
pub mod post_repo;
pub mod pre_project_repo;
pub mod role_repo;
pub mod user_repo;
pub mod user_role_repo;

pub use advisor_response_repo::AdvisorResponseRepo;
pub use book_repo::BookRepo;
pub use conversation_repo::ConversationRepo;
pub use message_repo::MessageRepo;
pub use post_repo::PostRepo;
pub use pre_project_repo::PreProjectRepo;
pub use role_repo::RoleRepo;
pub use user_repo::UserRepo;
pub use user_role_repo::UserRoleRepo;
