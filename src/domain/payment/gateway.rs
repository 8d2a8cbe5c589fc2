//! Payment gateway port

use async_trait::async_trait;

use super::model::PaymentStatus;
use crate::domain::DomainResult;

/// Charge request sent to the gateway
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    /// Minor currency units
    pub amount: i64,
    pub description: Option<String>,
    /// Gateway-specific payment source (card token, wallet, ...)
    pub source: serde_json::Value,
}

/// Gateway view of a payment
#[derive(Debug, Clone)]
pub struct GatewayPayment {
    /// Gateway transaction id
    pub id: String,
    pub status: PaymentStatus,
    /// Where the customer must go to finish authentication (`initiated`)
    pub redirect_url: Option<String>,
    /// Raw gateway payload, kept for diagnostics
    pub raw: serde_json::Value,
}

/// External payment provider.
///
/// Implementations enforce their own request timeout and surface it as
/// `DomainError::GatewayUnavailable`. The core never retries on its own.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a charge
    async fn charge(&self, request: ChargeRequest) -> DomainResult<GatewayPayment>;

    /// Fetch the authoritative state of a payment
    async fn fetch_payment(&self, transaction_id: &str) -> DomainResult<GatewayPayment>;
}
