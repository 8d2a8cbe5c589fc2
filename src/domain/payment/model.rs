//! Payment domain entity

use chrono::{DateTime, Utc};

use crate::domain::{DomainError, DomainResult};

/// Longest gateway transaction id accepted from outside.
pub const MAX_TRANSACTION_ID_LEN: usize = 64;

/// Gateway transaction ids are opaque tokens of ASCII letters, digits, `-`
/// and `_`. Anything else never reaches the gateway.
pub fn validate_transaction_id(id: &str) -> DomainResult<()> {
    let well_formed = !id.is_empty()
        && id.len() <= MAX_TRANSACTION_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if well_formed {
        Ok(())
    } else {
        Err(DomainError::Validation("Invalid transaction id".into()))
    }
}

/// Payment status as reported by the gateway.
///
/// Only `paid` and `initiated` drive behaviour; everything else is kept
/// verbatim for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStatus {
    /// Recorded locally, gateway not contacted yet
    Pending,
    /// Waiting for the customer to finish 3-D Secure / wallet authentication
    Initiated,
    /// Money captured
    Paid,
    /// Declined or errored
    Failed,
    /// Any other gateway status (authorized, voided, refunded, ...)
    Other(String),
}

impl PaymentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Initiated => "initiated",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Other(s) => s.as_str(),
        }
    }

    pub fn from_gateway(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "initiated" => Self::Initiated,
            "paid" => Self::Paid,
            "failed" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, Self::Paid)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the customer paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaymentMethod {
    #[default]
    CreditCard,
    DebitCard,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreditCard => "Credit Card",
            Self::DebitCard => "Debit Card",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "Debit Card" => Self::DebitCard,
            _ => Self::CreditCard,
        }
    }
}

/// Payment record. One per reservation; retries and callbacks update it
/// in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub id: String,
    pub user_id: String,
    pub reservation_id: String,
    /// Gateway transaction id of the latest attempt
    pub transaction_id: String,
    /// Minor currency units
    pub amount: i64,
    pub currency: String,
    pub payment_date: DateTime<Utc>,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
}

impl Payment {
    pub fn new(
        user_id: impl Into<String>,
        reservation_id: impl Into<String>,
        transaction_id: impl Into<String>,
        amount: i64,
        currency: impl Into<String>,
        status: PaymentStatus,
        payment_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            reservation_id: reservation_id.into(),
            transaction_id: transaction_id.into(),
            amount,
            currency: currency.into(),
            payment_date,
            method: PaymentMethod::default(),
            status,
        }
    }

    /// Record the outcome of a new gateway attempt.
    pub fn record_attempt(
        &mut self,
        transaction_id: impl Into<String>,
        amount: i64,
        status: PaymentStatus,
        at: DateTime<Utc>,
    ) {
        self.transaction_id = transaction_id.into();
        self.amount = amount;
        self.status = status;
        self.payment_date = at;
    }
}
