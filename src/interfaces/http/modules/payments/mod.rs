//! Payments module: charging reservations through the gateway

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
