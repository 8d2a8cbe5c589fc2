//! Reservation HTTP handlers

use std::sync::Arc;

use axum::extract::{Extension, Path, Query, State};
use axum::Json;

use super::dto::*;
use crate::application::ReservationService;
use crate::domain::Identity;
use crate::interfaces::http::common::{ApiError, ApiResponse, ApiResult, PageDto, ValidatedJson};

#[derive(Clone)]
pub struct ReservationAppState {
    pub service: Arc<ReservationService>,
}

#[utoipa::path(
    post,
    path = "/api/reservation",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    request_body = CreateReservationRequest,
    responses(
        (status = 200, description = "Reservation created", body = ApiResponse<ReservationDto>),
        (status = 400, description = "Invalid dates or car not available"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Car not found")
    )
)]
pub async fn create_reservation(
    State(state): State<ReservationAppState>,
    Extension(identity): Extension<Identity>,
    ValidatedJson(request): ValidatedJson<CreateReservationRequest>,
) -> ApiResult<Json<ApiResponse<ReservationDto>>> {
    let reservation = state.service.create(&identity, request.into()).await?;
    Ok(Json(ApiResponse::success(
        "Reservation created successfully",
        ReservationDto::from(reservation),
    )))
}

#[utoipa::path(
    get,
    path = "/api/reservation",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(ListReservationsParams),
    responses(
        (status = 200, description = "One page of reservations", body = ApiResponse<PageDto<ReservationDto>>),
        (status = 404, description = "No reservations, or search matched no single user")
    )
)]
pub async fn list_reservations(
    State(state): State<ReservationAppState>,
    Extension(identity): Extension<Identity>,
    Query(params): Query<ListReservationsParams>,
) -> ApiResult<Json<ApiResponse<PageDto<ReservationDto>>>> {
    let page = state.service.list(&identity, params.into_query()?).await?;
    if page.items.is_empty() {
        return Err(ApiError::not_found("No reservations found"));
    }
    Ok(Json(ApiResponse::success(
        "Reservations retrieved",
        PageDto::from_result(page, ReservationDto::from),
    )))
}

#[utoipa::path(
    get,
    path = "/api/reservation/{id}",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation details", body = ApiResponse<ReservationDto>),
        (status = 401, description = "Not the owner"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn get_reservation(
    State(state): State<ReservationAppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<ReservationDto>>> {
    let reservation = state.service.get(&identity, &id).await?;
    Ok(Json(ApiResponse::success(
        "Reservation retrieved",
        ReservationDto::from(reservation),
    )))
}

#[utoipa::path(
    patch,
    path = "/api/reservation/{id}",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Reservation ID")),
    request_body = UpdateReservationRequest,
    responses(
        (status = 200, description = "Reservation updated", body = ApiResponse<ReservationDto>),
        (status = 400, description = "Invalid dates, transition or availability"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn update_reservation(
    State(state): State<ReservationAppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateReservationRequest>,
) -> ApiResult<Json<ApiResponse<ReservationDto>>> {
    let outcome = state
        .service
        .patch(&identity, &id, request.into_patch()?)
        .await?;
    Ok(Json(ApiResponse::success(
        outcome.message,
        ReservationDto::from(outcome.reservation),
    )))
}
