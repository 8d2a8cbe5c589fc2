//! Reservation repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{Reservation, ReservationStatus};
use crate::domain::DomainResult;
use crate::shared::pagination::{PaginatedResult, PaginationParams};

/// Filter for reservation listings
#[derive(Debug, Clone, Default)]
pub struct ReservationFilter {
    /// Restrict to one owner
    pub user_id: Option<String>,
    pub status: Option<ReservationStatus>,
}

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Save a new reservation
    async fn save(&self, reservation: Reservation) -> DomainResult<()>;

    /// Find reservation by ID
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Reservation>>;

    /// Update an existing reservation
    async fn update(&self, reservation: Reservation) -> DomainResult<()>;

    /// Hard-delete a reservation
    async fn delete(&self, id: &str) -> DomainResult<()>;

    /// All `ongoing` / `upcoming` reservations for a car, by end date
    async fn find_active_for_car(&self, car_id: &str) -> DomainResult<Vec<Reservation>>;

    /// `pending` reservations created before `cutoff`
    async fn find_stale_pending(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<Reservation>>;

    /// Page through reservations, newest first
    async fn list(
        &self,
        filter: ReservationFilter,
        page: PaginationParams,
    ) -> DomainResult<PaginatedResult<Reservation>>;
}
