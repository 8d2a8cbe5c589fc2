//! In-memory repository provider
//!
//! Backs every repository trait with a `DashMap`. Service and HTTP tests run
//! against it; nothing is persisted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};

use crate::domain::car::{Car, CarRepository};
use crate::domain::payment::{Payment, PaymentRepository};
use crate::domain::reservation::{Reservation, ReservationFilter, ReservationRepository};
use crate::domain::user::{User, UserRepository};
use crate::domain::{DomainError, DomainResult, RepositoryProvider};
use crate::shared::pagination::{PaginatedResult, PaginationParams};

#[derive(Default)]
pub struct InMemoryRepositoryProvider {
    reservations: DashMap<String, Reservation>,
    payments: DashMap<String, Payment>,
    cars: DashMap<String, Car>,
    users: DashMap<String, User>,
    /// Reservation ids whose delete fails with a storage error
    failing_deletes: DashSet<String>,
}

impl InMemoryRepositoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a catalog car.
    pub fn insert_car(&self, car: Car) {
        self.cars.insert(car.id.clone(), car);
    }

    /// Seed a directory user.
    pub fn insert_user(&self, user: User) {
        self.users.insert(user.id.clone(), user);
    }

    /// Make every later delete of `reservation_id` fail.
    pub fn fail_deletes_of(&self, reservation_id: impl Into<String>) {
        self.failing_deletes.insert(reservation_id.into());
    }

    pub fn reservation_count(&self) -> usize {
        self.reservations.len()
    }
}

impl RepositoryProvider for InMemoryRepositoryProvider {
    fn reservations(&self) -> &dyn ReservationRepository {
        self
    }

    fn payments(&self) -> &dyn PaymentRepository {
        self
    }

    fn cars(&self) -> &dyn CarRepository {
        self
    }

    fn users(&self) -> &dyn UserRepository {
        self
    }
}

#[async_trait]
impl ReservationRepository for InMemoryRepositoryProvider {
    async fn save(&self, reservation: Reservation) -> DomainResult<()> {
        if self.reservations.contains_key(&reservation.id) {
            return Err(DomainError::Conflict(format!(
                "Reservation {} already exists",
                reservation.id
            )));
        }
        self.reservations.insert(reservation.id.clone(), reservation);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Reservation>> {
        Ok(self.reservations.get(id).map(|r| r.clone()))
    }

    async fn update(&self, reservation: Reservation) -> DomainResult<()> {
        match self.reservations.get_mut(&reservation.id) {
            Some(mut slot) => {
                *slot = reservation;
                Ok(())
            }
            None => Err(DomainError::not_found("Reservation", reservation.id)),
        }
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        if self.failing_deletes.contains(id) {
            return Err(DomainError::Storage(format!("delete of {} failed", id)));
        }
        self.reservations
            .remove(id)
            .ok_or_else(|| DomainError::not_found("Reservation", id))?;
        Ok(())
    }

    async fn find_active_for_car(&self, car_id: &str) -> DomainResult<Vec<Reservation>> {
        let mut active: Vec<Reservation> = self
            .reservations
            .iter()
            .filter(|r| r.car_id == car_id && r.is_active())
            .map(|r| r.clone())
            .collect();
        active.sort_by_key(|r| r.end_date);
        Ok(active)
    }

    async fn find_stale_pending(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<Reservation>> {
        Ok(self
            .reservations
            .iter()
            .filter(|r| {
                r.status == crate::domain::reservation::ReservationStatus::Pending
                    && r.created_at < cutoff
            })
            .map(|r| r.clone())
            .collect())
    }

    async fn list(
        &self,
        filter: ReservationFilter,
        page: PaginationParams,
    ) -> DomainResult<PaginatedResult<Reservation>> {
        let mut matching: Vec<Reservation> = self
            .reservations
            .iter()
            .filter(|r| filter.user_id.as_deref().map_or(true, |u| r.user_id == u))
            .filter(|r| filter.status.map_or(true, |s| r.status == s))
            .map(|r| r.clone())
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();
        Ok(PaginatedResult::new(items, total, page.page, page.limit))
    }
}

#[async_trait]
impl PaymentRepository for InMemoryRepositoryProvider {
    async fn save(&self, payment: Payment) -> DomainResult<()> {
        self.payments.insert(payment.id.clone(), payment);
        Ok(())
    }

    async fn update(&self, payment: Payment) -> DomainResult<()> {
        match self.payments.get_mut(&payment.id) {
            Some(mut slot) => {
                *slot = payment;
                Ok(())
            }
            None => Err(DomainError::not_found("Payment", payment.id)),
        }
    }

    async fn find_by_reservation(&self, reservation_id: &str) -> DomainResult<Option<Payment>> {
        Ok(self
            .payments
            .iter()
            .find(|p| p.reservation_id == reservation_id)
            .map(|p| p.clone()))
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> DomainResult<Option<Payment>> {
        Ok(self
            .payments
            .iter()
            .find(|p| p.transaction_id == transaction_id)
            .map(|p| p.clone()))
    }
}

#[async_trait]
impl CarRepository for InMemoryRepositoryProvider {
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Car>> {
        Ok(self.cars.get(id).map(|c| c.clone()))
    }
}

#[async_trait]
impl UserRepository for InMemoryRepositoryProvider {
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn search_by_contact(&self, term: &str) -> DomainResult<Vec<User>> {
        let needle = term.to_lowercase();
        Ok(self
            .users
            .iter()
            .filter(|u| {
                u.email.to_lowercase().contains(&needle)
                    || u
                        .phone
                        .as_deref()
                        .map_or(false, |p| p.to_lowercase().contains(&needle))
            })
            .map(|u| u.clone())
            .collect())
    }
}
