//! Car catalog entity (read-only for the booking core)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Catalog status. Informational only, bookings never consult it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CarStatus {
    #[default]
    Available,
    Unavailable,
    Maintenance,
    Reserved,
}

impl CarStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Unavailable => "Unavailable",
            Self::Maintenance => "Maintenance",
            Self::Reserved => "Reserved",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "Unavailable" => Self::Unavailable,
            "Maintenance" | "maintenance" => Self::Maintenance,
            "Reserved" => Self::Reserved,
            _ => Self::Available,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Car {
    pub id: String,
    pub model: String,
    pub plate_number: String,
    pub price_per_day: Decimal,
    pub status: CarStatus,
    pub created_at: DateTime<Utc>,
}
