//! Application layer: use cases over the domain and its ports

pub mod services;

// Re-export key types for convenience
pub use services::{
    start_reservation_expiry_task, CarLocks, CreateReservation, ExpirySettings, ListReservations,
    PatchOutcome, PatchReservation, PaymentOutcome, PaymentRequest, PaymentService,
    ReservationService,
};
