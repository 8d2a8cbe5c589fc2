//! Reservation lifecycle service
//!
//! Creation, date/status updates, and owner-scoped reads. Every sequence
//! that reads a car's active reservations and then writes runs under the
//! car's [`CarLocks`] entry.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use super::availability::AvailabilityChecker;
use super::car_locks::CarLocks;
use crate::domain::car::Car;
use crate::domain::reservation::{
    check_date, classify, rental_price, Reservation, ReservationFilter, ReservationStatus,
    MAX_ACTIVE_PER_CAR,
};
use crate::domain::{DomainError, DomainResult, Identity, RepositoryProvider};
use crate::shared::pagination::{PaginatedResult, PaginationParams};
use crate::shared::time::BusinessCalendar;

/// Booking request. Dates are raw client input.
#[derive(Debug, Clone)]
pub struct CreateReservation {
    pub car_id: String,
    pub start_date: String,
    pub end_date: String,
}

/// Partial update: new dates, a status change, or both.
#[derive(Debug, Clone, Default)]
pub struct PatchReservation {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: Option<ReservationStatus>,
}

/// Updated reservation plus the message shown to the caller.
#[derive(Debug, Clone)]
pub struct PatchOutcome {
    pub reservation: Reservation,
    pub message: &'static str,
}

/// Listing query
#[derive(Debug, Clone, Default)]
pub struct ListReservations {
    pub status: Option<ReservationStatus>,
    /// Owner email/phone fragment (admins only)
    pub search: Option<String>,
    pub page: PaginationParams,
}

pub struct ReservationService {
    repos: Arc<dyn RepositoryProvider>,
    availability: AvailabilityChecker,
    calendar: BusinessCalendar,
    locks: Arc<CarLocks>,
}

impl ReservationService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        calendar: BusinessCalendar,
        locks: Arc<CarLocks>,
    ) -> Self {
        Self {
            availability: AvailabilityChecker::new(repos.clone()),
            repos,
            calendar,
            locks,
        }
    }

    pub async fn create(
        &self,
        identity: &Identity,
        request: CreateReservation,
    ) -> DomainResult<Reservation> {
        let start = self.calendar.normalize(&request.start_date)?;
        let end = self.calendar.normalize(&request.end_date)?;

        let _guard = self.locks.lock(&request.car_id).await;

        let active = self
            .availability
            .active_reservations_for(&request.car_id)
            .await?;
        let today = self.calendar.today();
        check_date(start, end, active.len(), None, today)?;

        let car = self.find_car(&request.car_id).await?;

        let regime = classify(&active);
        regime.admit(start)?;
        if let Some(queue_after) = regime.queue_after() {
            check_date(start, end, active.len(), Some(queue_after), today)?;
        }

        let total_price = rental_price(car.price_per_day, start, end)?;
        let reservation = Reservation::new(
            identity.user_id.clone(),
            car.id,
            start,
            end,
            total_price,
            self.calendar.now(),
        );
        self.repos.reservations().save(reservation.clone()).await?;

        metrics::counter!("reservations_created_total").increment(1);
        info!(
            reservation_id = %reservation.id,
            car_id = %reservation.car_id,
            user_id = %reservation.user_id,
            start = %reservation.start_date,
            end = %reservation.end_date,
            total_price = %reservation.total_price,
            "Reservation created"
        );

        Ok(reservation)
    }

    pub async fn patch(
        &self,
        identity: &Identity,
        reservation_id: &str,
        request: PatchReservation,
    ) -> DomainResult<PatchOutcome> {
        if request.start_date.is_none() && request.end_date.is_none() && request.status.is_none()
        {
            return Err(DomainError::Validation(
                "At least one of startDate, endDate or status must be provided".into(),
            ));
        }
        if request.start_date.is_some() && request.end_date.is_none() {
            return Err(DomainError::Validation(
                "End date is required when start date is provided".into(),
            ));
        }

        let car_id = self.find_reservation(reservation_id).await?.car_id;
        let _guard = self.locks.lock(&car_id).await;
        let mut reservation = self.find_reservation(reservation_id).await?;

        if !identity.can_access(&reservation.user_id) {
            return Err(DomainError::Forbidden("Forbidden".into()));
        }

        let mut message = "";

        if request.status != Some(ReservationStatus::Cancelled) {
            let new_dates = self.requested_dates(&reservation, &request)?;

            if reservation.status.is_terminal() {
                return Err(DomainError::Conflict(
                    "Cannot update a cancelled or completed reservation".into(),
                ));
            }

            let active = self
                .availability
                .active_reservations_for(&reservation.car_id)
                .await?;
            if reservation.is_active() && !active.iter().any(|r| r.id == reservation.id) {
                // Cancelled as excess by the availability check.
                return Err(DomainError::NotAvailable("Car is not available".into()));
            }
            let others: Vec<Reservation> = active
                .into_iter()
                .filter(|r| r.id != reservation.id)
                .collect();

            if others.len() >= MAX_ACTIVE_PER_CAR {
                warn!(
                    reservation_id = %reservation.id,
                    car_id = %reservation.car_id,
                    "Car fully booked, cancelling reservation under update"
                );
                reservation.cancel("Car is not available");
                self.repos.reservations().update(reservation).await?;
                return Err(DomainError::NotAvailable("Car is not available".into()));
            }

            if let Some((start, end)) = new_dates {
                let regime = classify(&others);
                regime.admit(start)?;
                check_date(
                    start,
                    end,
                    others.len(),
                    regime.queue_after(),
                    self.calendar.today(),
                )?;

                if reservation.is_active() {
                    return Err(DomainError::Conflict("Cannot update this reservation".into()));
                }

                let car = self.find_car(&reservation.car_id).await?;
                reservation.start_date = start;
                reservation.end_date = end;
                reservation.total_price = rental_price(car.price_per_day, start, end)?;
                message = "Reservation updated successfully";
            }
        }

        if let Some(to) = request.status {
            reservation.transition_to(to, self.calendar.now())?;
            message = match to {
                ReservationStatus::Ongoing => "Reservation started successfully",
                ReservationStatus::Completed => "Reservation completed successfully",
                ReservationStatus::Cancelled => "Reservation cancelled successfully",
                _ => message,
            };
            metrics::counter!("reservation_transitions_total", "to" => to.as_str()).increment(1);
        }

        self.repos.reservations().update(reservation.clone()).await?;
        info!(
            reservation_id = %reservation.id,
            status = %reservation.status,
            start = %reservation.start_date,
            end = %reservation.end_date,
            "Reservation updated"
        );

        Ok(PatchOutcome {
            reservation,
            message,
        })
    }

    /// One reservation, visible to its owner and admins.
    pub async fn get(&self, identity: &Identity, reservation_id: &str) -> DomainResult<Reservation> {
        let reservation = self.find_reservation(reservation_id).await?;
        if !identity.can_access(&reservation.user_id) {
            return Err(DomainError::Unauthorized("Unauthorized".into()));
        }
        Ok(reservation)
    }

    /// Page through reservations. Non-admins only ever see their own; admins
    /// may narrow to the single user matching `search`.
    pub async fn list(
        &self,
        identity: &Identity,
        query: ListReservations,
    ) -> DomainResult<PaginatedResult<Reservation>> {
        let mut filter = ReservationFilter {
            user_id: None,
            status: query.status,
        };

        if !identity.is_admin {
            filter.user_id = Some(identity.user_id.clone());
        } else if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let users = self.repos.users().search_by_contact(term).await?;
            match users.as_slice() {
                [user] => filter.user_id = Some(user.id.clone()),
                _ => {
                    return Err(DomainError::NotFound {
                        entity: "User",
                        field: "contact",
                        value: term.to_string(),
                    })
                }
            }
        }

        self.repos.reservations().list(filter, query.page).await
    }

    // ── Helpers ────────────────────────────────────────────────

    async fn find_reservation(&self, id: &str) -> DomainResult<Reservation> {
        self.repos
            .reservations()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Reservation", id))
    }

    async fn find_car(&self, id: &str) -> DomainResult<Car> {
        self.repos
            .cars()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Car", id))
    }

    /// New (start, end) if the request changes dates. A lone end date keeps
    /// the current start.
    fn requested_dates(
        &self,
        current: &Reservation,
        request: &PatchReservation,
    ) -> DomainResult<Option<(NaiveDate, NaiveDate)>> {
        let start = request
            .start_date
            .as_deref()
            .map(|raw| self.calendar.normalize(raw))
            .transpose()?;
        let end = request
            .end_date
            .as_deref()
            .map(|raw| self.calendar.normalize(raw))
            .transpose()?;

        Ok(match (start, end) {
            (None, None) => None,
            (start, Some(end)) => Some((start.unwrap_or(current.start_date), end)),
            (Some(start), None) => Some((start, current.end_date)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::test_support::*;
    use rust_decimal::Decimal;

    fn create_req(car: &Car, start: u32, end: u32) -> CreateReservation {
        CreateReservation {
            car_id: car.id.clone(),
            start_date: day(start).to_string(),
            end_date: day(end).to_string(),
        }
    }

    #[tokio::test]
    async fn creates_pending_reservation_with_price() {
        let fx = Fixture::new();
        let car = fx.car(100).await;
        let svc = fx.reservation_service();

        let r = svc
            .create(&Identity::user("u1"), create_req(&car, 2, 5))
            .await
            .unwrap();

        assert_eq!(r.status, ReservationStatus::Pending);
        assert_eq!(r.total_price, Decimal::from(300));
        assert_eq!(r.user_id, "u1");
        assert_eq!(fx.stored(&r.id).await, r);
    }

    #[tokio::test]
    async fn rejects_window_violations_without_writing() {
        let fx = Fixture::new();
        let car = fx.car(100).await;
        let svc = fx.reservation_service();
        let id = Identity::user("u1");

        for (start, end) in [(8, 10), (3, 3), (2, 1)] {
            let err = svc.create(&id, create_req(&car, start, end)).await.unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)), "{:?}", err);
        }
        let err = svc
            .create(
                &id,
                CreateReservation {
                    car_id: car.id.clone(),
                    start_date: day(2).to_string(),
                    end_date: (day(2) + chrono::Days::new(31)).to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(fx.reservation_count().await, 0);
    }

    #[tokio::test]
    async fn unknown_car_is_not_found() {
        let fx = Fixture::new();
        let svc = fx.reservation_service();
        let err = svc
            .create(
                &Identity::user("u1"),
                CreateReservation {
                    car_id: "missing".into(),
                    start_date: day(2).to_string(),
                    end_date: day(4).to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "Car", .. }));
    }

    #[tokio::test]
    async fn overlapping_booking_names_blocking_end_date() {
        let fx = Fixture::new();
        let car = fx.car(100).await;
        fx.reservation(&car, "u1", 2, 5, ReservationStatus::Upcoming, 10).await;
        let svc = fx.reservation_service();

        let err = svc
            .create(&Identity::user("u2"), create_req(&car, 2, 5))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotAvailable(_)));
        assert_eq!(err.to_string(), "Car is not available until 05/05/2025");
    }

    #[tokio::test]
    async fn queued_booking_starts_on_handover_day() {
        let fx = Fixture::new();
        let car = fx.car(100).await;
        fx.reservation(&car, "u1", 2, 5, ReservationStatus::Upcoming, 10).await;
        let svc = fx.reservation_service();

        let r = svc
            .create(&Identity::user("u2"), create_req(&car, 5, 7))
            .await
            .unwrap();
        assert_eq!(r.total_price, Decimal::from(200));

        // Window is measured from the blocking end date, not today.
        let err = svc
            .create(&Identity::user("u3"), create_req(&car, 11, 12))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn full_car_reports_day_after_upcoming_ends() {
        let fx = Fixture::new();
        let car = fx.car(100).await;
        fx.reservation(&car, "u1", 1, 3, ReservationStatus::Ongoing, 20).await;
        fx.reservation(&car, "u2", 3, 6, ReservationStatus::Upcoming, 10).await;
        let svc = fx.reservation_service();

        let err = svc
            .create(&Identity::user("u3"), create_req(&car, 2, 4))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Car is not available until 07/05/2025");
        assert_eq!(fx.reservation_count().await, 2);
    }

    #[tokio::test]
    async fn date_change_recomputes_price() {
        let fx = Fixture::new();
        let car = fx.car(80).await;
        let r = fx.reservation(&car, "u1", 2, 4, ReservationStatus::Pending, 5).await;
        let svc = fx.reservation_service();

        let out = svc
            .patch(
                &Identity::user("u1"),
                &r.id,
                PatchReservation {
                    start_date: Some(day(3).to_string()),
                    end_date: Some(day(6).to_string()),
                    status: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(out.message, "Reservation updated successfully");
        let stored = fx.stored(&r.id).await;
        assert_eq!(stored.start_date, day(3));
        assert_eq!(stored.end_date, day(6));
        assert_eq!(stored.total_price, Decimal::from(240));
    }

    fn redate(start: u32, end: u32) -> PatchReservation {
        PatchReservation {
            start_date: Some(day(start).to_string()),
            end_date: Some(day(end).to_string()),
            status: None,
        }
    }

    #[tokio::test]
    async fn queued_update_cannot_start_before_blocking_end() {
        let fx = Fixture::new();
        let car = fx.car(80).await;
        fx.reservation(&car, "u1", 2, 5, ReservationStatus::Upcoming, 20).await;
        let r = fx.reservation(&car, "u2", 5, 7, ReservationStatus::Pending, 5).await;
        let svc = fx.reservation_service();

        let err = svc
            .patch(&Identity::user("u2"), &r.id, redate(3, 6))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotAvailable(_)));
        assert_eq!(err.to_string(), "Car is not available until 05/05/2025");

        let stored = fx.stored(&r.id).await;
        assert_eq!((stored.start_date, stored.end_date), (day(5), day(7)));
        assert_eq!(stored.status, ReservationStatus::Pending);
    }

    #[tokio::test]
    async fn queued_update_window_counts_from_blocking_end() {
        let fx = Fixture::new();
        let car = fx.car(80).await;
        fx.reservation(&car, "u1", 2, 5, ReservationStatus::Upcoming, 20).await;
        let r = fx.reservation(&car, "u2", 5, 7, ReservationStatus::Pending, 5).await;
        let svc = fx.reservation_service();
        let owner = Identity::user("u2");

        let err = svc.patch(&owner, &r.id, redate(11, 12)).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Start date must be between 05/05/2025 and the next 5 days"
        );
        assert_eq!(fx.stored(&r.id).await.start_date, day(5));

        // Past today's window (1st + 5) but inside the one after the handover.
        let out = svc.patch(&owner, &r.id, redate(10, 12)).await.unwrap();
        assert_eq!(out.reservation.start_date, day(10));
        assert_eq!(out.reservation.total_price, Decimal::from(160));
    }

    #[tokio::test]
    async fn queued_update_moves_dates_and_reprices() {
        let fx = Fixture::new();
        let car = fx.car(80).await;
        fx.reservation(&car, "u1", 2, 5, ReservationStatus::Upcoming, 20).await;
        let r = fx.reservation(&car, "u2", 6, 7, ReservationStatus::Pending, 5).await;
        let svc = fx.reservation_service();

        let out = svc
            .patch(&Identity::user("u2"), &r.id, redate(5, 8))
            .await
            .unwrap();
        assert_eq!(out.message, "Reservation updated successfully");

        let stored = fx.stored(&r.id).await;
        assert_eq!((stored.start_date, stored.end_date), (day(5), day(8)));
        assert_eq!(stored.total_price, Decimal::from(240));
        assert_eq!(stored.status, ReservationStatus::Pending);
    }

    #[tokio::test]
    async fn dates_are_frozen_once_active() {
        let fx = Fixture::new();
        let car = fx.car(80).await;
        let r = fx.reservation(&car, "u1", 2, 4, ReservationStatus::Upcoming, 5).await;
        let svc = fx.reservation_service();

        let err = svc
            .patch(
                &Identity::user("u1"),
                &r.id,
                PatchReservation {
                    start_date: Some(day(2).to_string()),
                    end_date: Some(day(5).to_string()),
                    status: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Cannot update this reservation");
        assert_eq!(fx.stored(&r.id).await.end_date, day(4));
    }

    #[tokio::test]
    async fn status_walk_stamps_times() {
        let fx = Fixture::new();
        let car = fx.car(80).await;
        let r = fx.reservation(&car, "u1", 2, 4, ReservationStatus::Upcoming, 5).await;
        let svc = fx.reservation_service();
        let admin = Identity::admin("root");

        let started = svc
            .patch(&admin, &r.id, status_patch(ReservationStatus::Ongoing))
            .await
            .unwrap();
        assert_eq!(started.message, "Reservation started successfully");
        assert_eq!(started.reservation.actual_start, Some(fx.now));

        let done = svc
            .patch(&admin, &r.id, status_patch(ReservationStatus::Completed))
            .await
            .unwrap();
        assert_eq!(done.message, "Reservation completed successfully");
        assert_eq!(fx.stored(&r.id).await.actual_end, Some(fx.now));
    }

    #[tokio::test]
    async fn terminal_reservations_are_immutable() {
        let fx = Fixture::new();
        let car = fx.car(80).await;
        let r = fx.reservation(&car, "u1", 2, 4, ReservationStatus::Completed, 5).await;
        let svc = fx.reservation_service();
        let id = Identity::user("u1");

        let err = svc
            .patch(&id, &r.id, status_patch(ReservationStatus::Ongoing))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot update a cancelled or completed reservation"
        );

        let err = svc
            .patch(&id, &r.id, status_patch(ReservationStatus::Cancelled))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn invalid_transition_is_rejected() {
        let fx = Fixture::new();
        let car = fx.car(80).await;
        let r = fx.reservation(&car, "u1", 2, 4, ReservationStatus::Pending, 5).await;
        let svc = fx.reservation_service();

        let err = svc
            .patch(&Identity::user("u1"), &r.id, status_patch(ReservationStatus::Completed))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid transition: pending → completed");
        assert_eq!(fx.stored(&r.id).await.status, ReservationStatus::Pending);
    }

    #[tokio::test]
    async fn strangers_cannot_patch() {
        let fx = Fixture::new();
        let car = fx.car(80).await;
        let r = fx.reservation(&car, "u1", 2, 4, ReservationStatus::Pending, 5).await;
        let svc = fx.reservation_service();

        for status in [ReservationStatus::Ongoing, ReservationStatus::Cancelled] {
            let err = svc
                .patch(&Identity::user("u2"), &r.id, status_patch(status))
                .await
                .unwrap_err();
            assert!(matches!(err, DomainError::Forbidden(_)));
        }
    }

    #[tokio::test]
    async fn pending_reservation_on_full_car_cancels_itself() {
        let fx = Fixture::new();
        let car = fx.car(80).await;
        fx.reservation(&car, "u1", 1, 3, ReservationStatus::Ongoing, 30).await;
        fx.reservation(&car, "u2", 3, 6, ReservationStatus::Upcoming, 20).await;
        let r = fx.reservation(&car, "u3", 2, 4, ReservationStatus::Pending, 10).await;
        let svc = fx.reservation_service();

        let err = svc
            .patch(&Identity::user("u3"), &r.id, status_patch(ReservationStatus::Ongoing))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotAvailable(_)));
        assert_eq!(fx.stored(&r.id).await.status, ReservationStatus::Cancelled);
    }

    #[tokio::test]
    async fn patch_requires_some_field() {
        let fx = Fixture::new();
        let svc = fx.reservation_service();
        let err = svc
            .patch(&Identity::user("u1"), "any", PatchReservation::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = svc
            .patch(
                &Identity::user("u1"),
                "any",
                PatchReservation {
                    start_date: Some(day(2).to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "End date is required when start date is provided"
        );
    }

    #[tokio::test]
    async fn get_is_owner_or_admin() {
        let fx = Fixture::new();
        let car = fx.car(80).await;
        let r = fx.reservation(&car, "u1", 2, 4, ReservationStatus::Pending, 5).await;
        let svc = fx.reservation_service();

        assert!(svc.get(&Identity::user("u1"), &r.id).await.is_ok());
        assert!(svc.get(&Identity::admin("a"), &r.id).await.is_ok());
        assert!(matches!(
            svc.get(&Identity::user("u2"), &r.id).await,
            Err(DomainError::Unauthorized(_))
        ));
        assert!(matches!(
            svc.get(&Identity::user("u1"), "nope").await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn listing_is_scoped_to_owner_unless_admin() {
        let fx = Fixture::new();
        let car = fx.car(80).await;
        fx.user("u1", "alice@example.com", Some("0500000001")).await;
        fx.user("u2", "bob@example.com", None).await;
        fx.reservation(&car, "u1", 2, 4, ReservationStatus::Pending, 5).await;
        fx.reservation(&car, "u2", 2, 4, ReservationStatus::Cancelled, 4).await;
        fx.reservation(&car, "u2", 5, 6, ReservationStatus::Pending, 3).await;
        let svc = fx.reservation_service();

        let mine = svc
            .list(&Identity::user("u1"), ListReservations::default())
            .await
            .unwrap();
        assert_eq!(mine.total, 1);

        let all = svc
            .list(&Identity::admin("a"), ListReservations::default())
            .await
            .unwrap();
        assert_eq!(all.total, 3);

        let bobs_pending = svc
            .list(
                &Identity::admin("a"),
                ListReservations {
                    status: Some(ReservationStatus::Pending),
                    search: Some("BOB@".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(bobs_pending.total, 1);
        assert_eq!(bobs_pending.items[0].user_id, "u2");

        let ambiguous = svc
            .list(
                &Identity::admin("a"),
                ListReservations {
                    search: Some("example.com".into()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(ambiguous, Err(DomainError::NotFound { entity: "User", .. })));
    }
}
