//! Application services

mod availability;
mod car_locks;
mod payment;
mod reservation;
mod reservation_expiry;

#[cfg(test)]
pub(crate) mod test_support;

pub use availability::{AvailabilityChecker, OVERBOOKED_REASON};
pub use car_locks::CarLocks;
pub use payment::{PaymentOutcome, PaymentRequest, PaymentService};
pub use reservation::{
    CreateReservation, ListReservations, PatchOutcome, PatchReservation, ReservationService,
};
pub use reservation_expiry::{
    start_reservation_expiry_task, sweep_expired_reservations, ExpirySettings,
};
