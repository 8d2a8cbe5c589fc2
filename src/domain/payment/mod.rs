//! Payment aggregate
//!
//! Contains the Payment entity, the gateway port, and repository interface.

pub mod gateway;
pub mod model;
pub mod repository;

pub use gateway::{ChargeRequest, GatewayPayment, PaymentGateway};
pub use model::{validate_transaction_id, Payment, PaymentMethod, PaymentStatus};
pub use repository::PaymentRepository;
