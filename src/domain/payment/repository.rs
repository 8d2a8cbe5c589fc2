//! Payment repository interface

use async_trait::async_trait;

use super::model::Payment;
use crate::domain::DomainResult;

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Save a new payment
    async fn save(&self, payment: Payment) -> DomainResult<()>;

    /// Update an existing payment
    async fn update(&self, payment: Payment) -> DomainResult<()>;

    /// Payment record of a reservation
    async fn find_by_reservation(&self, reservation_id: &str) -> DomainResult<Option<Payment>>;

    /// Payment record by gateway transaction id
    async fn find_by_transaction_id(&self, transaction_id: &str)
        -> DomainResult<Option<Payment>>;
}
