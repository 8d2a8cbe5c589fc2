//! User directory (collaborator)
//!
//! Accounts are managed elsewhere. The booking core only resolves owners
//! for admin search.

pub mod model;
pub mod repository;

pub use model::User;
pub use repository::UserRepository;
