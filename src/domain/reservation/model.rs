//! Reservation domain entity

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::shared::errors::DomainError;

/// Reservation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservationStatus {
    /// Booked but not paid yet
    Pending,
    /// Paid, rental has not started
    Upcoming,
    /// Car handed over
    Ongoing,
    /// Car returned
    Completed,
    /// Cancelled by user, admin or the system
    Cancelled,
}

impl ReservationStatus {
    pub const ALL: [ReservationStatus; 5] = [
        Self::Pending,
        Self::Upcoming,
        Self::Ongoing,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Statuses that hold the car and count toward the per-car cap.
    pub const ACTIVE: [ReservationStatus; 2] = [Self::Ongoing, Self::Upcoming];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Upcoming => "upcoming",
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "upcoming" => Some(Self::Upcoming),
            "ongoing" => Some(Self::Ongoing),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Ongoing | Self::Upcoming)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Explicit status-update transition table.
    ///
    /// Payment confirmation (`pending` → `upcoming`) is not a user-requested
    /// transition and goes through [`Reservation::confirm_payment`] instead.
    pub fn can_transition_to(&self, to: ReservationStatus) -> bool {
        use ReservationStatus::*;
        matches!(
            (self, to),
            (Pending, Ongoing)
                | (Pending, Cancelled)
                | (Ongoing, Completed)
                | (Ongoing, Cancelled)
                | (Upcoming, Ongoing)
                | (Upcoming, Cancelled)
        )
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
            .ok_or_else(|| DomainError::Validation(format!("Unknown reservation status '{}'", s)))
    }
}

/// Car reservation
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub id: String,
    pub user_id: String,
    pub car_id: String,
    /// Latest payment attempt for this reservation
    pub payment_id: Option<String>,
    /// First rental day (business calendar)
    pub start_date: NaiveDate,
    /// Return day, strictly after `start_date`
    pub end_date: NaiveDate,
    pub total_price: Decimal,
    pub status: ReservationStatus,
    pub cancel_reason: Option<String>,
    pub actual_start: Option<DateTime<Utc>>,
    pub actual_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    /// New unpaid hold.
    pub fn new(
        user_id: impl Into<String>,
        car_id: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        total_price: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            car_id: car_id.into(),
            payment_id: None,
            start_date,
            end_date,
            total_price,
            status: ReservationStatus::Pending,
            cancel_reason: None,
            actual_start: None,
            actual_end: None,
            created_at,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    /// Apply a requested status change, stamping the actual start/end times.
    pub fn transition_to(
        &mut self,
        to: ReservationStatus,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.status.can_transition_to(to) {
            return Err(DomainError::InvalidTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        match to {
            ReservationStatus::Ongoing => self.actual_start = Some(now),
            ReservationStatus::Completed => self.actual_end = Some(now),
            _ => {}
        }
        self.status = to;
        Ok(())
    }

    /// Move to `upcoming` after a confirmed payment.
    ///
    /// Returns `true` when the status changed. Repeating the confirmation on
    /// an `upcoming` reservation is a no-op, and terminal or ongoing
    /// reservations are left untouched.
    pub fn confirm_payment(&mut self) -> bool {
        if self.status == ReservationStatus::Pending {
            self.status = ReservationStatus::Upcoming;
            true
        } else {
            false
        }
    }

    /// System-initiated cancellation (overbooking, corrective action).
    pub fn cancel(&mut self, reason: impl Into<String>) {
        self.status = ReservationStatus::Cancelled;
        self.cancel_reason = Some(reason.into());
    }

    /// Whole days booked.
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}

// ── Tests ──────────────────────────────────────────────────────
