//! Payment HTTP handlers

use std::sync::Arc;

use axum::extract::{Extension, Path, Query, State};
use axum::Json;

use super::dto::*;
use crate::application::{PaymentOutcome, PaymentService};
use crate::domain::Identity;
use crate::interfaces::http::common::{ApiResponse, ApiResult, ValidatedJson};

#[derive(Clone)]
pub struct PaymentAppState {
    pub service: Arc<PaymentService>,
}

fn outcome_response(outcome: PaymentOutcome) -> Json<ApiResponse<PaymentResultDto>> {
    let (message, payment, redirect_url) = match outcome {
        PaymentOutcome::Paid(payment) => ("Payment successful", payment, None),
        PaymentOutcome::RequiresAction {
            payment,
            redirect_url,
        } => ("Payment requires authentication", payment, redirect_url),
    };
    Json(ApiResponse::success(
        message,
        PaymentResultDto {
            payment: PaymentDto::from(payment),
            redirect_url,
        },
    ))
}

#[utoipa::path(
    post,
    path = "/api/payment/{id}",
    tag = "Payments",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Reservation ID")),
    request_body = CreatePaymentRequest,
    responses(
        (status = 200, description = "Paid, or authentication required", body = ApiResponse<PaymentResultDto>),
        (status = 400, description = "Payment failed or car no longer available"),
        (status = 401, description = "Not the owner"),
        (status = 404, description = "Reservation or car not found"),
        (status = 502, description = "Payment gateway unreachable")
    )
)]
pub async fn create_payment(
    State(state): State<PaymentAppState>,
    Extension(identity): Extension<Identity>,
    Path(reservation_id): Path<String>,
    ValidatedJson(request): ValidatedJson<CreatePaymentRequest>,
) -> ApiResult<Json<ApiResponse<PaymentResultDto>>> {
    let outcome = state
        .service
        .create(&identity, &reservation_id, request.into())
        .await?;
    Ok(outcome_response(outcome))
}

#[utoipa::path(
    post,
    path = "/api/payment/retry/{id}",
    tag = "Payments",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Reservation ID")),
    request_body = CreatePaymentRequest,
    responses(
        (status = 200, description = "Paid, or authentication required", body = ApiResponse<PaymentResultDto>),
        (status = 400, description = "Payment failed or already successful"),
        (status = 404, description = "No earlier payment for this reservation")
    )
)]
pub async fn retry_payment(
    State(state): State<PaymentAppState>,
    Extension(identity): Extension<Identity>,
    Path(reservation_id): Path<String>,
    ValidatedJson(request): ValidatedJson<CreatePaymentRequest>,
) -> ApiResult<Json<ApiResponse<PaymentResultDto>>> {
    let outcome = state
        .service
        .retry(&identity, &reservation_id, request.into())
        .await?;
    Ok(outcome_response(outcome))
}

/// Landing point of the gateway redirect after 3-D Secure. Public: the
/// status is re-read from the gateway rather than trusted from the query.
#[utoipa::path(
    get,
    path = "/api/payment/callback",
    tag = "Payments",
    params(CallbackParams),
    responses(
        (status = 200, description = "Payment completed", body = ApiResponse<PaymentDto>),
        (status = 400, description = "Payment failed or malformed transaction id"),
        (status = 404, description = "Unknown transaction")
    )
)]
pub async fn payment_callback(
    State(state): State<PaymentAppState>,
    Query(params): Query<CallbackParams>,
) -> ApiResult<Json<ApiResponse<PaymentDto>>> {
    let payment = state.service.handle_callback(&params.id).await?;
    Ok(Json(ApiResponse::success(
        "Payment has been completed successfully",
        PaymentDto::from(payment),
    )))
}
