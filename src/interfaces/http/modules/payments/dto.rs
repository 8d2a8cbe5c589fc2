//! Payment DTOs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::application::PaymentRequest;
use crate::domain::payment::Payment;

/// Charge details forwarded to the payment gateway
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePaymentRequest {
    #[validate(length(max = 255))]
    pub description: Option<String>,
    /// Gateway payment source, e.g. `{"type": "token", "token": "tok_..."}`
    #[validate(custom(function = "validate_source"))]
    #[schema(value_type = Object)]
    pub source: Value,
}

fn validate_source(source: &Value) -> Result<(), ValidationError> {
    if source.get("type").and_then(Value::as_str).is_some() {
        Ok(())
    } else {
        let mut err = ValidationError::new("source");
        err.message = Some("source.type is required".into());
        Err(err)
    }
}

impl From<CreatePaymentRequest> for PaymentRequest {
    fn from(r: CreatePaymentRequest) -> Self {
        Self {
            description: r.description,
            source: r.source,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackParams {
    /// Gateway transaction id
    pub id: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDto {
    pub id: String,
    pub user_id: String,
    pub reservation_id: String,
    pub transaction_id: String,
    /// Minor currency units (halalas)
    pub amount: i64,
    pub currency: String,
    pub payment_date: String,
    pub payment_method: String,
    pub status: String,
}

impl From<Payment> for PaymentDto {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id,
            user_id: p.user_id,
            reservation_id: p.reservation_id,
            transaction_id: p.transaction_id,
            amount: p.amount,
            currency: p.currency,
            payment_date: p.payment_date.to_rfc3339(),
            payment_method: p.method.as_str().to_string(),
            status: p.status.to_string(),
        }
    }
}

/// Charge result: the payment, plus where to send the customer when the
/// gateway needs further authentication.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResultDto {
    pub payment: PaymentDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}
