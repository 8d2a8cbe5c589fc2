//! Background task that deletes unpaid reservations.
//!
//! Runs in a tokio::spawn loop. Every `interval` it hard-deletes `pending`
//! reservations created more than `grace_period` ago. Each delete happens
//! under the car's booking lock after re-reading the reservation, so a
//! payment in flight for it wins. A failed delete is logged and the sweep
//! moves on to the next candidate.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::Duration;
use tracing::{debug, info, warn};

use super::car_locks::CarLocks;
use crate::domain::reservation::ReservationStatus;
use crate::domain::{DomainResult, RepositoryProvider};
use crate::shared::shutdown::ShutdownSignal;
use crate::shared::time::BusinessCalendar;

/// Sweep schedule
#[derive(Debug, Clone, Copy)]
pub struct ExpirySettings {
    pub interval: Duration,
    pub grace_period: Duration,
}

impl Default for ExpirySettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5 * 60),
            grace_period: Duration::from_secs(60 * 60),
        }
    }
}

/// Start the pending-reservation sweeper.
pub fn start_reservation_expiry_task(
    repos: Arc<dyn RepositoryProvider>,
    locks: Arc<CarLocks>,
    calendar: BusinessCalendar,
    settings: ExpirySettings,
    shutdown: ShutdownSignal,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            interval_secs = settings.interval.as_secs(),
            grace_secs = settings.grace_period.as_secs(),
            "Reservation expiry task started"
        );

        let mut interval = tokio::time::interval(settings.interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match sweep_expired_reservations(repos.as_ref(), &locks, calendar.now(), settings.grace_period).await {
                        Ok(0) => debug!("No expired reservations"),
                        Ok(deleted) => info!(deleted, "Expired pending reservations deleted"),
                        Err(e) => warn!(error = %e, "Reservation expiry sweep failed"),
                    }
                }
                _ = shutdown.wait() => {
                    info!("Reservation expiry task shutting down");
                    break;
                }
            }
        }

        info!("Reservation expiry task stopped");
    })
}

/// One sweep. Returns how many reservations were deleted.
///
/// Only the candidate query can fail the sweep as a whole.
pub async fn sweep_expired_reservations(
    repos: &dyn RepositoryProvider,
    locks: &CarLocks,
    now: DateTime<Utc>,
    grace_period: Duration,
) -> DomainResult<usize> {
    let grace = chrono::Duration::from_std(grace_period).unwrap_or(chrono::Duration::hours(1));
    let cutoff = now - grace;
    let stale = repos.reservations().find_stale_pending(cutoff).await?;

    if stale.is_empty() {
        return Ok(0);
    }

    let candidates = stale.len();
    let mut deleted = 0;
    let mut skipped = 0;
    for candidate in stale {
        let _guard = locks.lock(&candidate.car_id).await;

        let still_stale = match repos.reservations().find_by_id(&candidate.id).await {
            Ok(Some(current)) => {
                current.status == ReservationStatus::Pending && current.created_at < cutoff
            }
            Ok(None) => false,
            Err(e) => {
                warn!(
                    reservation_id = %candidate.id,
                    error = %e,
                    "Failed to re-read expired reservation"
                );
                continue;
            }
        };
        if !still_stale {
            debug!(reservation_id = %candidate.id, "Reservation changed since selection, kept");
            skipped += 1;
            continue;
        }

        match repos.reservations().delete(&candidate.id).await {
            Ok(()) => deleted += 1,
            Err(e) => warn!(
                reservation_id = %candidate.id,
                error = %e,
                "Failed to delete expired reservation"
            ),
        }
    }

    metrics::counter!("reservations_swept_total").increment(deleted as u64);
    if deleted + skipped < candidates {
        warn!(candidates, deleted, skipped, "Expiry sweep finished with failures");
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::test_support::*;

    #[tokio::test]
    async fn deletes_only_stale_pending() {
        let fx = Fixture::new();
        let car = fx.car(100).await;
        let stale = fx.reservation(&car, "u1", 2, 4, ReservationStatus::Pending, 61).await;
        let fresh = fx.reservation(&car, "u2", 2, 4, ReservationStatus::Pending, 59).await;
        let paid = fx.reservation(&car, "u3", 2, 4, ReservationStatus::Upcoming, 120).await;
        let gone = fx.reservation(&car, "u4", 2, 4, ReservationStatus::Cancelled, 120).await;

        let deleted = sweep_expired_reservations(
            fx.repos.as_ref(),
            &fx.locks,
            fx.now,
            ExpirySettings::default().grace_period,
        )
        .await
        .unwrap();

        assert_eq!(deleted, 1);
        assert!(fx.repos.reservations().find_by_id(&stale.id).await.unwrap().is_none());
        for kept in [fresh, paid, gone] {
            assert!(fx.repos.reservations().find_by_id(&kept.id).await.unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn failed_delete_does_not_stop_the_sweep() {
        let fx = Fixture::new();
        let car = fx.car(100).await;
        let a = fx.reservation(&car, "u1", 2, 4, ReservationStatus::Pending, 90).await;
        let b = fx.reservation(&car, "u2", 2, 4, ReservationStatus::Pending, 90).await;
        let c = fx.reservation(&car, "u3", 2, 4, ReservationStatus::Pending, 90).await;
        fx.repos.fail_deletes_of(b.id.clone());

        let deleted = sweep_expired_reservations(fx.repos.as_ref(), &fx.locks, fx.now, Duration::from_secs(3600))
            .await
            .unwrap();

        assert_eq!(deleted, 2);
        assert!(fx.repos.reservations().find_by_id(&a.id).await.unwrap().is_none());
        assert!(fx.repos.reservations().find_by_id(&b.id).await.unwrap().is_some());
        assert!(fx.repos.reservations().find_by_id(&c.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reservation_paid_while_waiting_for_the_car_is_kept() {
        let fx = Fixture::new();
        let car = fx.car(100).await;
        let r = fx.reservation(&car, "u1", 2, 4, ReservationStatus::Pending, 90).await;

        // A charge for this car holds its lock across the gateway call.
        let guard = fx.locks.lock(&car.id).await;
        let sweep = tokio::spawn({
            let repos = fx.repos.clone();
            let locks = fx.locks.clone();
            let now = fx.now;
            async move {
                sweep_expired_reservations(repos.as_ref(), &locks, now, Duration::from_secs(3600))
                    .await
            }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let mut paid = fx.stored(&r.id).await;
        assert!(paid.confirm_payment());
        fx.repos.reservations().update(paid).await.unwrap();
        drop(guard);

        let deleted = tokio::time::timeout(Duration::from_secs(1), sweep)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(deleted, 0);
        assert_eq!(fx.stored(&r.id).await.status, ReservationStatus::Upcoming);
    }

    #[tokio::test]
    async fn task_stops_on_shutdown() {
        let fx = Fixture::new();
        let shutdown = ShutdownSignal::new();
        let handle = start_reservation_expiry_task(
            fx.repos.clone(),
            fx.locks.clone(),
            fx.calendar.clone(),
            ExpirySettings {
                interval: Duration::from_millis(10),
                grace_period: Duration::from_secs(3600),
            },
            shutdown.clone(),
        );

        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
