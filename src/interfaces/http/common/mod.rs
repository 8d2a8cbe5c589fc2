//! Response envelope and error mapping shared by all HTTP modules

pub mod validated_json;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use tracing::error;
use utoipa::ToSchema;

use crate::domain::DomainError;
use crate::shared::pagination::PaginatedResult;

pub use validated_json::ValidatedJson;

/// JSON body of every API response
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

/// One page of results plus paging metadata
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageDto<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> PageDto<T> {
    pub fn from_result<S>(result: PaginatedResult<S>, f: impl FnMut(S) -> T) -> Self {
        let PaginatedResult {
            items,
            total,
            page,
            limit,
            total_pages,
        } = result;
        Self {
            items: items.into_iter().map(f).collect(),
            total,
            page,
            limit,
            total_pages,
        }
    }
}

/// Error half of every handler's `Result`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ApiResponse<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ApiResponse::error(message),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        let status = status_for(&e);
        let (message, payload) = match e {
            DomainError::NotFound { entity, .. } => (format!("{} not found", entity), None),
            DomainError::Unauthorized(m) | DomainError::Forbidden(m) => (m, None),
            DomainError::Gateway { message, payload } => (message, payload),
            DomainError::Storage(m) => {
                error!(error = %m, "Storage failure");
                ("Internal server error".to_string(), None)
            }
            other => (other.to_string(), None),
        };

        Self {
            status,
            body: ApiResponse {
                success: false,
                message,
                data: payload,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// HTTP status class for a domain error.
pub fn status_for(e: &DomainError) -> StatusCode {
    match e {
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::Validation(_)
        | DomainError::Conflict(_)
        | DomainError::InvalidTransition { .. }
        | DomainError::NotAvailable(_)
        | DomainError::Gateway { .. } => StatusCode::BAD_REQUEST,
        DomainError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
        DomainError::GatewayUnavailable(_) => StatusCode::BAD_GATEWAY,
        DomainError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
