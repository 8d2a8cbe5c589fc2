//! Infrastructure layer - external concerns

pub mod crypto;
pub mod database;
pub mod gateway;
pub mod storage;

pub use database::{init_database, run_migrations, DatabaseConfig, SeaOrmRepositoryProvider};
pub use gateway::MoyasarGateway;
pub use storage::InMemoryRepositoryProvider;
