//! Per-car booking lock
//!
//! Serializes the read-check-write sequences that touch one car's active
//! reservations (create, date/status update, payment) inside this process.
//! Different cars never contend.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct CarLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl CarLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Wait for exclusive access to a car's reservations.
    pub async fn lock(&self, car_id: &str) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .entry(car_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_car_is_exclusive() {
        let locks = CarLocks::shared();
        let guard = locks.lock("car-1").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.lock("car-1").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn different_cars_do_not_contend() {
        let locks = CarLocks::new();
        let _a = locks.lock("car-1").await;
        tokio::time::timeout(Duration::from_millis(100), locks.lock("car-2"))
            .await
            .unwrap();
    }
}
