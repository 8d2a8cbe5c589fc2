//! Shared fixtures for application service tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde_json::json;

use super::car_locks::CarLocks;
use super::payment::PaymentService;
use super::reservation::{PatchReservation, ReservationService};
use crate::domain::car::{Car, CarStatus};
use crate::domain::payment::{ChargeRequest, GatewayPayment, PaymentGateway, PaymentStatus};
use crate::domain::reservation::{Reservation, ReservationStatus};
use crate::domain::user::User;
use crate::domain::{DomainError, DomainResult, RepositoryProvider};
use crate::infrastructure::storage::InMemoryRepositoryProvider;
use crate::shared::time::BusinessCalendar;

/// Day of May 2025. Fixture "today" is the 1st.
pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, d).unwrap()
}

pub fn status_patch(status: ReservationStatus) -> PatchReservation {
    PatchReservation {
        status: Some(status),
        ..Default::default()
    }
}

pub fn paid(tx: &str) -> GatewayPayment {
    gateway_payment(tx, PaymentStatus::Paid, None)
}

pub fn initiated(tx: &str, url: &str) -> GatewayPayment {
    gateway_payment(tx, PaymentStatus::Initiated, Some(url.to_string()))
}

pub fn failed(tx: &str) -> GatewayPayment {
    gateway_payment(tx, PaymentStatus::Failed, None)
}

fn gateway_payment(tx: &str, status: PaymentStatus, redirect_url: Option<String>) -> GatewayPayment {
    GatewayPayment {
        id: tx.to_string(),
        raw: json!({ "id": tx, "status": status.as_str() }),
        status,
        redirect_url,
    }
}

/// Gateway fake replaying queued charge results.
#[derive(Default)]
pub struct ScriptedGateway {
    charges: Mutex<VecDeque<DomainResult<GatewayPayment>>>,
    payments: DashMap<String, GatewayPayment>,
    charge_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl ScriptedGateway {
    pub fn push_charge(&self, result: DomainResult<GatewayPayment>) {
        self.charges.lock().unwrap().push_back(result);
    }

    /// State returned by `fetch_payment` for this transaction.
    pub fn set_payment(&self, payment: GatewayPayment) {
        self.payments.insert(payment.id.clone(), payment);
    }

    pub fn charge_calls(&self) -> usize {
        self.charge_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn charge(&self, _request: ChargeRequest) -> DomainResult<GatewayPayment> {
        self.charge_calls.fetch_add(1, Ordering::SeqCst);
        self.charges
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(DomainError::GatewayUnavailable("no scripted charge".into())))
    }

    async fn fetch_payment(&self, transaction_id: &str) -> DomainResult<GatewayPayment> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.payments
            .get(transaction_id)
            .map(|p| p.clone())
            .ok_or_else(|| DomainError::Gateway {
                message: "Payment not found".into(),
                payload: None,
            })
    }
}

pub struct Fixture {
    pub repos: Arc<InMemoryRepositoryProvider>,
    pub gateway: Arc<ScriptedGateway>,
    pub locks: Arc<CarLocks>,
    pub calendar: BusinessCalendar,
    /// 2025-05-01 12:00 in the business timezone
    pub now: DateTime<Utc>,
}

impl Fixture {
    pub fn new() -> Self {
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap();
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        Self {
            repos: Arc::new(InMemoryRepositoryProvider::new()),
            gateway: Arc::new(ScriptedGateway::default()),
            locks: CarLocks::shared(),
            calendar: BusinessCalendar::fixed(offset, now),
            now,
        }
    }

    pub fn reservation_service(&self) -> ReservationService {
        ReservationService::new(self.repos.clone(), self.calendar.clone(), self.locks.clone())
    }

    pub fn payment_service(&self) -> PaymentService {
        PaymentService::new(
            self.repos.clone(),
            self.gateway.clone(),
            self.calendar.clone(),
            self.locks.clone(),
            "SAR",
        )
    }

    pub async fn car(&self, price_per_day: i64) -> Car {
        let car = Car {
            id: uuid::Uuid::new_v4().to_string(),
            model: "Camry 2024".into(),
            plate_number: "ABC 1234".into(),
            price_per_day: Decimal::from(price_per_day),
            status: CarStatus::Available,
            created_at: self.now,
        };
        self.repos.insert_car(car.clone());
        car
    }

    pub async fn user(&self, id: &str, email: &str, phone: Option<&str>) -> User {
        let user = User {
            id: id.into(),
            name: id.into(),
            email: email.into(),
            phone: phone.map(str::to_string),
            is_admin: false,
            created_at: self.now,
        };
        self.repos.insert_user(user.clone());
        user
    }

    /// Stored reservation, created `age_mins` before the fixture clock.
    pub async fn reservation(
        &self,
        car: &Car,
        user_id: &str,
        start: u32,
        end: u32,
        status: ReservationStatus,
        age_mins: i64,
    ) -> Reservation {
        let mut r = Reservation::new(
            user_id,
            car.id.clone(),
            day(start),
            day(end),
            car.price_per_day * Decimal::from((end - start) as i64),
            self.now - Duration::minutes(age_mins),
        );
        r.status = status;
        self.repos.reservations().save(r.clone()).await.unwrap();
        r
    }

    pub async fn stored(&self, id: &str) -> Reservation {
        self.repos
            .reservations()
            .find_by_id(id)
            .await
            .unwrap()
            .expect("reservation stored")
    }

    pub async fn reservation_count(&self) -> usize {
        self.repos.reservation_count()
    }
}
