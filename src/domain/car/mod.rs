//! Car catalog (collaborator)

pub mod model;
pub mod repository;

pub use model::{Car, CarStatus};
pub use repository::CarRepository;
