//! Reservation aggregate
//!
//! Contains the Reservation entity, its status machine, the availability
//! policy, pricing, and the repository interface.

pub mod availability;
pub mod model;
pub mod pricing;
pub mod repository;

pub use availability::{check_date, classify, split_excess, Availability, MAX_ACTIVE_PER_CAR};
pub use model::{Reservation, ReservationStatus};
pub use pricing::{rental_price, to_minor_units};
pub use repository::{ReservationFilter, ReservationRepository};
