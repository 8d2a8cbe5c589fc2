//! Rental price calculation

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::shared::errors::DomainError;

/// Total price for a rental: day rate × whole days between the two
/// calendar days.
pub fn rental_price(
    price_per_day: Decimal,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Decimal, DomainError> {
    let days = (end - start).num_days();
    if days < 1 {
        return Err(DomainError::Validation(
            "End date must be after the start date".into(),
        ));
    }
    Ok(price_per_day * Decimal::from(days))
}

/// Amount in minor currency units (halalas for SAR).
pub fn to_minor_units(amount: Decimal) -> Result<i64, DomainError> {
    use rust_decimal::prelude::ToPrimitive;

    (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or_else(|| DomainError::Validation(format!("Amount out of range: {}", amount)))
}
