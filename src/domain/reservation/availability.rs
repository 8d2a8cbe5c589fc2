//! Availability policy
//!
//! Pure rules deciding whether a date range may be booked on a car, given
//! the car's active (`ongoing` / `upcoming`) reservations. Nothing in here
//! touches storage.

use chrono::{Days, NaiveDate};

use super::model::Reservation;
use crate::shared::errors::DomainError;
use crate::shared::time::format_day;

/// Active reservations a single car may carry at once.
pub const MAX_ACTIVE_PER_CAR: usize = 2;
/// How far ahead of the window base a rental may start.
pub const BOOKING_WINDOW_DAYS: u64 = 5;
/// Longest rental, in days.
pub const MAX_RENTAL_DAYS: u64 = 30;

/// Booking regime of a car.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// No active reservation.
    Free,
    /// One active reservation; a new booking must start on or after its end.
    SingleBlocking { blocking_until: NaiveDate },
    /// Cap reached; the car frees up on `available_from`.
    Full { available_from: NaiveDate },
}

impl Availability {
    /// Earliest start a queued booking may take, if it must queue.
    pub fn queue_after(&self) -> Option<NaiveDate> {
        match self {
            Self::SingleBlocking { blocking_until } => Some(*blocking_until),
            _ => None,
        }
    }

    /// Reject a requested start the regime cannot take.
    pub fn admit(&self, start: NaiveDate) -> Result<(), DomainError> {
        match *self {
            Self::Free => Ok(()),
            Self::SingleBlocking { blocking_until } if start < blocking_until => {
                Err(DomainError::NotAvailable(format!(
                    "Car is not available until {}",
                    format_day(blocking_until)
                )))
            }
            Self::SingleBlocking { .. } => Ok(()),
            Self::Full { available_from } => Err(DomainError::NotAvailable(format!(
                "Car is not available until {}",
                format_day(available_from)
            ))),
        }
    }
}

/// Classify a car by its active reservations.
///
/// For a full car the reported free date is the day after the `upcoming`
/// reservation ends; with no `upcoming` among them, the day after the
/// latest end date.
pub fn classify(active: &[Reservation]) -> Availability {
    match active {
        [] => Availability::Free,
        [only] => Availability::SingleBlocking {
            blocking_until: only.end_date,
        },
        many => {
            let last_end = many
                .iter()
                .find(|r| r.status == super::ReservationStatus::Upcoming)
                .map(|r| r.end_date)
                .or_else(|| many.iter().map(|r| r.end_date).max())
                .unwrap_or_default();
            Availability::Full {
                available_from: last_end + Days::new(1),
            }
        }
    }
}

/// Split an active set into the reservations that fit under the cap and the
/// excess ones, oldest first.
///
/// More than [`MAX_ACTIVE_PER_CAR`] active reservations only appear after a
/// race or a manual edit; callers cancel the excess.
pub fn split_excess(mut active: Vec<Reservation>) -> (Vec<Reservation>, Vec<Reservation>) {
    active.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    let excess = if active.len() > MAX_ACTIVE_PER_CAR {
        active.split_off(MAX_ACTIVE_PER_CAR)
    } else {
        Vec::new()
    };
    (active, excess)
}

/// Validate a requested date window.
///
/// The start must fall within [`BOOKING_WINDOW_DAYS`] of a base day: the
/// `queue_after` day when the booking queues behind an active reservation,
/// otherwise `today` when the car has no active reservations. With active
/// reservations and no queue day, the start is not window-checked here.
pub fn check_date(
    start: NaiveDate,
    end: NaiveDate,
    active_count: usize,
    queue_after: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(), DomainError> {
    let window_base = match queue_after {
        Some(day) => Some(day),
        None if active_count == 0 => Some(today),
        None => None,
    };

    if let Some(base) = window_base {
        let latest_start = base + Days::new(BOOKING_WINDOW_DAYS);
        if start < base || start > latest_start {
            let message = if queue_after.is_some() {
                format!(
                    "Start date must be between {} and the next {} days",
                    format_day(base),
                    BOOKING_WINDOW_DAYS
                )
            } else {
                format!(
                    "Start date must be between today and the next {} days",
                    BOOKING_WINDOW_DAYS
                )
            };
            return Err(DomainError::Validation(message));
        }
    }

    if end <= start {
        return Err(DomainError::Validation(
            "End date must be after the start date".into(),
        ));
    }

    if end > start + Days::new(MAX_RENTAL_DAYS) {
        return Err(DomainError::Validation(format!(
            "End date must be within {} days of the start date",
            MAX_RENTAL_DAYS
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reservation::ReservationStatus;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, d).unwrap()
    }

    fn active(start: u32, end: u32, status: ReservationStatus, age_mins: i64) -> Reservation {
        let mut r = Reservation::new(
            "u",
            "car",
            day(start),
            day(end),
            Decimal::ZERO,
            Utc::now() - Duration::minutes(age_mins),
        );
        r.status = status;
        r
    }

    #[test]
    fn start_must_be_within_five_days_of_today() {
        let today = day(1);
        assert!(check_date(day(1), day(3), 0, None, today).is_ok());
        assert!(check_date(day(6), day(8), 0, None, today).is_ok());

        let err = check_date(day(7), day(9), 0, None, today).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Start date must be between today and the next 5 days"
        );

        let past = NaiveDate::from_ymd_opt(2025, 4, 30).unwrap();
        assert!(check_date(past, day(3), 0, None, today).is_err());
    }

    #[test]
    fn end_must_follow_start() {
        let err = check_date(day(2), day(2), 0, None, day(1)).unwrap_err();
        assert_eq!(err.to_string(), "End date must be after the start date");
        assert!(check_date(day(3), day(2), 0, None, day(1)).is_err());
    }

    #[test]
    fn rental_is_capped_at_thirty_days() {
        let start = day(2);
        assert!(check_date(start, start + Days::new(30), 0, None, day(1)).is_ok());
        let err = check_date(start, start + Days::new(31), 0, None, day(1)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "End date must be within 30 days of the start date"
        );
    }

    #[test]
    fn queue_day_replaces_today_as_window_base() {
        let today = day(1);
        let queue = day(10);
        assert!(check_date(day(10), day(12), 1, Some(queue), today).is_ok());
        assert!(check_date(day(15), day(16), 1, Some(queue), today).is_ok());
        assert!(check_date(day(16), day(18), 1, Some(queue), today).is_err());
        assert!(check_date(day(9), day(12), 1, Some(queue), today).is_err());
    }

    #[test]
    fn busy_car_without_queue_day_skips_window() {
        assert!(check_date(day(20), day(22), 2, None, day(1)).is_ok());
        assert!(check_date(day(20), day(20), 2, None, day(1)).is_err());
    }

    #[test]
    fn classifies_by_active_count() {
        assert_eq!(classify(&[]), Availability::Free);

        let one = [active(2, 5, ReservationStatus::Upcoming, 10)];
        assert_eq!(
            classify(&one),
            Availability::SingleBlocking {
                blocking_until: day(5)
            }
        );

        let two = [
            active(1, 4, ReservationStatus::Ongoing, 20),
            active(4, 9, ReservationStatus::Upcoming, 10),
        ];
        assert_eq!(
            classify(&two),
            Availability::Full {
                available_from: day(10)
            }
        );
    }

    #[test]
    fn full_car_without_upcoming_reports_latest_end() {
        let two = [
            active(1, 4, ReservationStatus::Ongoing, 20),
            active(1, 7, ReservationStatus::Ongoing, 10),
        ];
        assert_eq!(
            classify(&two),
            Availability::Full {
                available_from: day(8)
            }
        );
    }

    #[test]
    fn single_blocking_admits_handover_day() {
        let regime = Availability::SingleBlocking {
            blocking_until: day(5),
        };
        assert!(regime.admit(day(5)).is_ok());
        let err = regime.admit(day(4)).unwrap_err();
        assert_eq!(err.to_string(), "Car is not available until 05/05/2025");
        assert_eq!(regime.queue_after(), Some(day(5)));
    }

    #[test]
    fn full_rejects_everything() {
        let regime = Availability::Full {
            available_from: day(10),
        };
        let err = regime.admit(day(20)).unwrap_err();
        assert!(matches!(err, DomainError::NotAvailable(_)));
        assert_eq!(err.to_string(), "Car is not available until 10/05/2025");
    }

    #[test]
    fn excess_is_the_newest() {
        let oldest = active(1, 3, ReservationStatus::Ongoing, 30);
        let middle = active(3, 6, ReservationStatus::Upcoming, 20);
        let newest = active(3, 6, ReservationStatus::Upcoming, 10);
        let (kept, excess) = split_excess(vec![newest.clone(), oldest.clone(), middle.clone()]);
        assert_eq!(kept, vec![oldest, middle]);
        assert_eq!(excess, vec![newest]);

        let (kept, excess) = split_excess(vec![active(1, 3, ReservationStatus::Ongoing, 5)]);
        assert_eq!(kept.len(), 1);
        assert!(excess.is_empty());
    }
}
