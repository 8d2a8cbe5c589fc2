//! Payment reconciliation
//!
//! Charges a reservation through the [`PaymentGateway`], keeps the single
//! payment record of the reservation in sync with the gateway, and moves
//! the reservation to `upcoming` once money is captured.

use std::sync::Arc;

use tracing::{info, warn};

use super::availability::AvailabilityChecker;
use super::car_locks::CarLocks;
use crate::domain::payment::{
    validate_transaction_id, ChargeRequest, GatewayPayment, Payment, PaymentGateway,
    PaymentStatus,
};
use crate::domain::reservation::{to_minor_units, Reservation, MAX_ACTIVE_PER_CAR};
use crate::domain::{DomainError, DomainResult, Identity, RepositoryProvider};
use crate::shared::time::BusinessCalendar;

/// Client-supplied charge details
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub description: Option<String>,
    /// Gateway payment source (card token, wallet, ...)
    pub source: serde_json::Value,
}

/// Successful charge attempt
#[derive(Debug, Clone)]
pub enum PaymentOutcome {
    /// Money captured; reservation is `upcoming`
    Paid(Payment),
    /// Customer must finish authentication at `redirect_url`
    RequiresAction {
        payment: Payment,
        redirect_url: Option<String>,
    },
}

impl PaymentOutcome {
    pub fn payment(&self) -> &Payment {
        match self {
            Self::Paid(payment) | Self::RequiresAction { payment, .. } => payment,
        }
    }
}

pub struct PaymentService {
    repos: Arc<dyn RepositoryProvider>,
    gateway: Arc<dyn PaymentGateway>,
    availability: AvailabilityChecker,
    calendar: BusinessCalendar,
    locks: Arc<CarLocks>,
    currency: String,
}

impl PaymentService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        gateway: Arc<dyn PaymentGateway>,
        calendar: BusinessCalendar,
        locks: Arc<CarLocks>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            availability: AvailabilityChecker::new(repos.clone()),
            repos,
            gateway,
            calendar,
            locks,
            currency: currency.into(),
        }
    }

    /// First charge of a reservation. A previous unpaid attempt is
    /// overwritten.
    pub async fn create(
        &self,
        identity: &Identity,
        reservation_id: &str,
        request: PaymentRequest,
    ) -> DomainResult<PaymentOutcome> {
        self.charge(identity, reservation_id, request, false).await
    }

    /// Charge again after a failed or abandoned attempt.
    pub async fn retry(
        &self,
        identity: &Identity,
        reservation_id: &str,
        request: PaymentRequest,
    ) -> DomainResult<PaymentOutcome> {
        self.charge(identity, reservation_id, request, true).await
    }

    /// Gateway callback: re-read the transaction from the gateway and apply
    /// it. Replaying a `paid` callback is harmless.
    ///
    /// Unauthenticated. Only well-formed ids of locally known transactions
    /// are looked up at the gateway.
    pub async fn handle_callback(&self, transaction_id: &str) -> DomainResult<Payment> {
        validate_transaction_id(transaction_id)?;

        let mut payment = self
            .repos
            .payments()
            .find_by_transaction_id(transaction_id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "Payment",
                field: "transaction_id",
                value: transaction_id.to_string(),
            })?;

        let fetched = self.gateway.fetch_payment(transaction_id).await?;
        if fetched.id != payment.transaction_id {
            warn!(
                transaction_id,
                fetched_id = %fetched.id,
                "Gateway returned a different transaction"
            );
            return Err(DomainError::Gateway {
                message: "Unexpected gateway response".into(),
                payload: None,
            });
        }

        payment.status = fetched.status.clone();
        self.repos.payments().update(payment.clone()).await?;
        metrics::counter!("payments_total", "status" => payment.status.to_string()).increment(1);

        if !payment.status.is_paid() {
            warn!(
                transaction_id = %payment.transaction_id,
                status = %payment.status,
                "Payment callback reported unpaid status"
            );
            return Err(DomainError::Gateway {
                message: "Payment failed".into(),
                payload: Some(fetched.raw),
            });
        }

        let reservation = self.find_reservation(&payment.reservation_id).await?;
        let _guard = self.locks.lock(&reservation.car_id).await;
        let mut reservation = self.find_reservation(&payment.reservation_id).await?;
        if reservation.confirm_payment() {
            self.repos.reservations().update(reservation.clone()).await?;
            info!(
                reservation_id = %reservation.id,
                transaction_id = %payment.transaction_id,
                "Reservation confirmed by payment callback"
            );
        }

        Ok(payment)
    }

    // ── Helpers ────────────────────────────────────────────────

    async fn charge(
        &self,
        identity: &Identity,
        reservation_id: &str,
        request: PaymentRequest,
        retry: bool,
    ) -> DomainResult<PaymentOutcome> {
        let car_id = self.find_reservation(reservation_id).await?.car_id;
        let _guard = self.locks.lock(&car_id).await;
        let mut reservation = self.find_reservation(reservation_id).await?;

        if !reservation.is_owned_by(&identity.user_id) {
            return Err(DomainError::Unauthorized("Unauthorized".into()));
        }

        let others = self
            .availability
            .active_reservations_for(&reservation.car_id)
            .await?
            .into_iter()
            .filter(|r| r.id != reservation.id)
            .count();
        if others >= MAX_ACTIVE_PER_CAR {
            warn!(
                reservation_id = %reservation.id,
                car_id = %reservation.car_id,
                "Car fully booked, cancelling reservation before payment"
            );
            reservation.cancel("Car is no longer available");
            self.repos.reservations().update(reservation).await?;
            return Err(DomainError::NotAvailable("Car is no longer available".into()));
        }

        self.repos
            .cars()
            .find_by_id(&reservation.car_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Car", reservation.car_id.clone()))?;

        let existing = self.repos.payments().find_by_reservation(&reservation.id).await?;
        match &existing {
            None if retry => {
                return Err(DomainError::NotFound {
                    entity: "Payment",
                    field: "reservation_id",
                    value: reservation.id.clone(),
                })
            }
            Some(p) if p.status.is_paid() => {
                return Err(DomainError::Conflict("Payment is already successful".into()))
            }
            _ => {}
        }

        if reservation.status.is_terminal() {
            return Err(DomainError::Conflict(format!(
                "Cannot pay for a {} reservation",
                reservation.status
            )));
        }

        let amount = to_minor_units(reservation.total_price)?;
        let charged = self
            .gateway
            .charge(ChargeRequest {
                amount,
                description: request.description,
                source: request.source,
            })
            .await?;

        let payment = self
            .record(existing, &reservation, &charged, amount)
            .await?;
        metrics::counter!("payments_total", "status" => payment.status.to_string()).increment(1);
        info!(
            reservation_id = %reservation.id,
            transaction_id = %payment.transaction_id,
            amount,
            status = %payment.status,
            retry,
            "Payment attempt recorded"
        );

        reservation.payment_id = Some(payment.id.clone());
        let outcome = match &charged.status {
            s if s.is_paid() => {
                reservation.confirm_payment();
                PaymentOutcome::Paid(payment)
            }
            PaymentStatus::Initiated => PaymentOutcome::RequiresAction {
                payment,
                redirect_url: charged.redirect_url.clone(),
            },
            _ => {
                self.repos.reservations().update(reservation).await?;
                return Err(DomainError::Gateway {
                    message: "Payment failed".into(),
                    payload: Some(charged.raw),
                });
            }
        };
        self.repos.reservations().update(reservation).await?;

        Ok(outcome)
    }

    /// Create or overwrite the reservation's payment record.
    async fn record(
        &self,
        existing: Option<Payment>,
        reservation: &Reservation,
        charged: &GatewayPayment,
        amount: i64,
    ) -> DomainResult<Payment> {
        let now = self.calendar.now();
        match existing {
            Some(mut payment) => {
                payment.record_attempt(charged.id.clone(), amount, charged.status.clone(), now);
                self.repos.payments().update(payment.clone()).await?;
                Ok(payment)
            }
            None => {
                let payment = Payment::new(
                    reservation.user_id.clone(),
                    reservation.id.clone(),
                    charged.id.clone(),
                    amount,
                    self.currency.clone(),
                    charged.status.clone(),
                    now,
                );
                self.repos.payments().save(payment.clone()).await?;
                Ok(payment)
            }
        }
    }

    async fn find_reservation(&self, id: &str) -> DomainResult<Reservation> {
        self.repos
            .reservations()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Reservation", id))
    }
}
