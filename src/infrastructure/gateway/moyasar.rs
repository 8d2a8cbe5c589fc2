//! Moyasar payments API client
//!
//! `POST {api_base}/payments` creates a charge and `GET {api_base}/payments/{id}`
//! reads it back. Requests authenticate with HTTP basic auth using the
//! secret key as the username and an empty password.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::domain::payment::{
    validate_transaction_id, ChargeRequest, GatewayPayment, PaymentGateway, PaymentStatus,
};
use crate::domain::{DomainError, DomainResult};
use crate::shared::errors::InfraError;

/// Moyasar connection settings
#[derive(Clone)]
pub struct MoyasarConfig {
    /// e.g. `https://api.moyasar.com/v1`
    pub api_base: String,
    pub secret_key: String,
    /// ISO currency code sent with every charge
    pub currency: String,
    /// Where Moyasar sends the customer after 3-D Secure
    pub callback_url: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for MoyasarConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MoyasarConfig")
            .field("api_base", &self.api_base)
            .field("secret_key", &"<redacted>")
            .field("currency", &self.currency)
            .field("callback_url", &self.callback_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for MoyasarConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.moyasar.com/v1".to_string(),
            secret_key: String::new(),
            currency: "SAR".to_string(),
            callback_url: "http://localhost:8080/api/payment/callback".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

/// HTTP client for the Moyasar payments API.
#[derive(Debug, Clone)]
pub struct MoyasarGateway {
    config: MoyasarConfig,
    base: Url,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct PaymentBody {
    id: String,
    status: String,
    #[serde(default)]
    source: Option<SourceBody>,
}

#[derive(Debug, Deserialize)]
struct SourceBody {
    #[serde(default)]
    transaction_url: Option<String>,
}

impl MoyasarGateway {
    pub fn new(config: MoyasarConfig) -> Result<Self, InfraError> {
        let invalid = |reason: String| InfraError::InvalidUrl {
            url: config.api_base.clone(),
            reason,
        };
        let base = Url::parse(&config.api_base).map_err(|e| invalid(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(invalid("not a base URL".into()));
        }
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, base, http })
    }

    /// `{api_base}/{segments...}`, each segment percent-encoded on its own.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Turn a response into a gateway payment, or a gateway error carrying
    /// the response body.
    async fn read_payment(response: reqwest::Response) -> DomainResult<GatewayPayment> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| DomainError::from(InfraError::Http(e)))?;
        let raw: Value = serde_json::from_str(&text).unwrap_or_else(|_| json!({ "body": text }));

        if !status.is_success() {
            warn!(http_status = %status, body = %raw, "Moyasar rejected the request");
            return Err(DomainError::Gateway {
                message: "Payment processing failed".into(),
                payload: Some(raw),
            });
        }

        parse_payment(raw)
    }
}

fn parse_payment(raw: Value) -> DomainResult<GatewayPayment> {
    let body: PaymentBody =
        serde_json::from_value(raw.clone()).map_err(|e| DomainError::Gateway {
            message: format!("Unexpected gateway response: {}", e),
            payload: Some(raw.clone()),
        })?;

    Ok(GatewayPayment {
        id: body.id,
        status: PaymentStatus::from_gateway(&body.status),
        redirect_url: body.source.and_then(|s| s.transaction_url),
        raw,
    })
}

#[async_trait]
impl PaymentGateway for MoyasarGateway {
    async fn charge(&self, request: ChargeRequest) -> DomainResult<GatewayPayment> {
        debug!(amount = request.amount, "Creating Moyasar payment");

        let body = json!({
            "amount": request.amount,
            "currency": self.config.currency,
            "description": request.description,
            "source": request.source,
            "callback_url": self.config.callback_url,
        });

        let response = self
            .http
            .post(self.endpoint(&["payments"]))
            .basic_auth(&self.config.secret_key, Some(""))
            .json(&body)
            .send()
            .await
            .map_err(|e| DomainError::from(InfraError::Http(e)))?;

        Self::read_payment(response).await
    }

    /// Fetch errors never carry the upstream body: this path is reachable
    /// without authentication.
    async fn fetch_payment(&self, transaction_id: &str) -> DomainResult<GatewayPayment> {
        validate_transaction_id(transaction_id)?;
        debug!(transaction_id, "Fetching Moyasar payment");

        let response = self
            .http
            .get(self.endpoint(&["payments", transaction_id]))
            .basic_auth(&self.config.secret_key, Some(""))
            .send()
            .await
            .map_err(|e| DomainError::from(InfraError::Http(e)))?;

        Self::read_payment(response).await.map_err(|e| match e {
            DomainError::Gateway { message, .. } => DomainError::Gateway {
                message,
                payload: None,
            },
            other => other,
        })
    }
}
