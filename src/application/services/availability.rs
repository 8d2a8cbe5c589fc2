//! Availability checker
//!
//! Loads the active reservations of a car and enforces the per-car cap as a
//! corrective safety net: if a read finds more active reservations than the
//! cap allows, the newest extras are cancelled before the set is returned.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::reservation::{split_excess, Reservation};
use crate::domain::{DomainResult, RepositoryProvider};

/// Cancel reason stamped on reservations removed by the safety net.
pub const OVERBOOKED_REASON: &str = "Car overbooked";

#[derive(Clone)]
pub struct AvailabilityChecker {
    repos: Arc<dyn RepositoryProvider>,
}

impl AvailabilityChecker {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// Active reservations of a car, at most [`MAX_ACTIVE_PER_CAR`] of them.
    ///
    /// [`MAX_ACTIVE_PER_CAR`]: crate::domain::reservation::MAX_ACTIVE_PER_CAR
    pub async fn active_reservations_for(&self, car_id: &str) -> DomainResult<Vec<Reservation>> {
        let active = self.repos.reservations().find_active_for_car(car_id).await?;
        let (mut kept, excess) = split_excess(active);

        for mut extra in excess {
            warn!(
                car_id,
                reservation_id = %extra.id,
                status = %extra.status,
                "Active reservation cap exceeded, cancelling newest reservation"
            );
            extra.cancel(OVERBOOKED_REASON);
            self.repos.reservations().update(extra).await?;
            metrics::counter!("reservations_overbooking_cancelled_total").increment(1);
        }

        kept.sort_by_key(|r| r.end_date);
        if !kept.is_empty() {
            info!(car_id, active = kept.len(), "Loaded active reservations");
        }
        Ok(kept)
    }
}
