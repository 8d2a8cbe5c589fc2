//! Database entities module

pub mod car;
pub mod payment;
pub mod reservation;
pub mod user;

pub use car::Entity as Car;
pub use payment::Entity as Payment;
pub use reservation::Entity as Reservation;
pub use user::Entity as User;
