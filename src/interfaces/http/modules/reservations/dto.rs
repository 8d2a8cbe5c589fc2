//! Reservation DTOs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::application::{CreateReservation, ListReservations, PatchReservation};
use crate::domain::reservation::{Reservation, ReservationStatus};
use crate::domain::DomainResult;
use crate::shared::pagination::PaginationParams;

/// Book a car for a range of calendar days
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    #[validate(length(min = 1, message = "carId is required"))]
    pub car_id: String,
    /// `YYYY-MM-DD` or RFC 3339; first rental day
    #[validate(length(min = 1, message = "startDate is required"))]
    pub start_date: String,
    /// Return day, exclusive of billing
    #[validate(length(min = 1, message = "endDate is required"))]
    pub end_date: String,
}

impl From<CreateReservationRequest> for CreateReservation {
    fn from(r: CreateReservationRequest) -> Self {
        Self {
            car_id: r.car_id,
            start_date: r.start_date,
            end_date: r.end_date,
        }
    }
}

/// New dates, a status change, or both
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReservationRequest {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// `ongoing`, `completed` or `cancelled`
    pub status: Option<String>,
}

impl UpdateReservationRequest {
    pub fn into_patch(self) -> DomainResult<PatchReservation> {
        let status = self
            .status
            .as_deref()
            .map(str::parse::<ReservationStatus>)
            .transpose()?;
        Ok(PatchReservation {
            start_date: self.start_date,
            end_date: self.end_date,
            status,
        })
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListReservationsParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// Only reservations in this status
    pub status: Option<String>,
    /// Owner email or phone fragment (admins only)
    pub search: Option<String>,
}

impl ListReservationsParams {
    pub fn into_query(self) -> DomainResult<ListReservations> {
        let status = self
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::parse::<ReservationStatus>)
            .transpose()?;
        Ok(ListReservations {
            status,
            search: self.search,
            page: PaginationParams::new(self.page, self.limit),
        })
    }
}

/// Reservation as returned by the API
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationDto {
    pub id: String,
    pub user_id: String,
    pub car_id: String,
    pub payment_id: Option<String>,
    /// `YYYY-MM-DD`
    pub start_date: String,
    pub end_date: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub total_price: Decimal,
    pub status: String,
    pub cancel_reason: Option<String>,
    pub actual_start: Option<String>,
    pub actual_end: Option<String>,
    pub created_at: String,
}

impl From<Reservation> for ReservationDto {
    fn from(r: Reservation) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            car_id: r.car_id,
            payment_id: r.payment_id,
            start_date: r.start_date.to_string(),
            end_date: r.end_date.to_string(),
            total_price: r.total_price,
            status: r.status.as_str().to_string(),
            cancel_reason: r.cancel_reason,
            actual_start: r.actual_start.map(|d| d.to_rfc3339()),
            actual_end: r.actual_end.map(|d| d.to_rfc3339()),
            created_at: r.created_at.to_rfc3339(),
        }
    }
}
