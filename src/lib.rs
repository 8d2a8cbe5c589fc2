//! # Car rental service
//!
//! Booking backend for a car rental fleet: reservations by calendar day,
//! per-car availability, pricing, payments through Moyasar, and a sweeper
//! for unpaid bookings.
//!
//! ## Architecture
//!
//! - **domain**: entities, status machines, availability and pricing rules, ports
//! - **application**: reservation and payment use cases, expiry task, per-car locks
//! - **infrastructure**: SeaORM persistence, in-memory repositories, Moyasar client, JWT
//! - **interfaces**: REST API with Swagger documentation
//! - **shared**: errors, business calendar, pagination, shutdown

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};

pub use infrastructure::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};

pub use interfaces::http::create_api_router;
