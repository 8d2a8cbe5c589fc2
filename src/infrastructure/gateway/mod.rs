//! Payment gateway clients

mod moyasar;

pub use moyasar::{MoyasarConfig, MoyasarGateway};
