//! Domain layer: entities, policies and ports

pub mod car;
pub mod identity;
pub mod payment;
pub mod repositories;
pub mod reservation;
pub mod user;

pub use identity::Identity;
pub use repositories::{DomainResult, RepositoryProvider};

// Re-export DomainError from shared for convenience
pub use crate::shared::errors::DomainError;
