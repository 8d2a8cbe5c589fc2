//! SeaORM implementation of ReservationRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use super::db_err;
use crate::domain::reservation::{
    Reservation, ReservationFilter, ReservationRepository, ReservationStatus,
};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::reservation;
use crate::shared::pagination::{PaginatedResult, PaginationParams};

pub struct SeaOrmReservationRepository {
    db: DatabaseConnection,
}

impl SeaOrmReservationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

/// Status tags are matched exactly; the active-set queries filter on the
/// lowercase tags, so any other spelling is a corrupt row.
fn model_to_domain(m: reservation::Model) -> DomainResult<Reservation> {
    let Some(status) = ReservationStatus::parse(&m.status) else {
        warn!("Reservation {} has unknown status '{}'", m.id, m.status);
        return Err(DomainError::Storage(format!(
            "Reservation {} has unknown status '{}'",
            m.id, m.status
        )));
    };

    Ok(Reservation {
        id: m.id,
        user_id: m.user_id,
        car_id: m.car_id,
        payment_id: m.payment_id,
        start_date: m.start_date,
        end_date: m.end_date,
        total_price: m.total_price,
        status,
        cancel_reason: m.cancel_reason,
        actual_start: m.actual_start,
        actual_end: m.actual_end,
        created_at: m.created_at,
    })
}

fn domain_to_active(r: Reservation) -> reservation::ActiveModel {
    reservation::ActiveModel {
        id: Set(r.id),
        user_id: Set(r.user_id),
        car_id: Set(r.car_id),
        payment_id: Set(r.payment_id),
        start_date: Set(r.start_date),
        end_date: Set(r.end_date),
        total_price: Set(r.total_price),
        status: Set(r.status.as_str().to_string()),
        cancel_reason: Set(r.cancel_reason),
        actual_start: Set(r.actual_start),
        actual_end: Set(r.actual_end),
        created_at: Set(r.created_at),
    }
}

fn active_tags() -> Vec<&'static str> {
    ReservationStatus::ACTIVE.iter().map(|s| s.as_str()).collect()
}

// ── ReservationRepository impl ──────────────────────────────────

#[async_trait]
impl ReservationRepository for SeaOrmReservationRepository {
    async fn save(&self, r: Reservation) -> DomainResult<()> {
        debug!("Saving reservation: {}", r.id);
        domain_to_active(r).insert(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Reservation>> {
        let model = reservation::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(db_err)?;
        model.map(model_to_domain).transpose()
    }

    async fn update(&self, r: Reservation) -> DomainResult<()> {
        debug!("Updating reservation {}: {}", r.id, r.status);

        let existing = reservation::Entity::find_by_id(r.id.clone())
            .one(&self.db)
            .await
            .map_err(db_err)?;
        if existing.is_none() {
            return Err(DomainError::not_found("Reservation", r.id));
        }

        domain_to_active(r).update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        let result = reservation::Entity::delete_by_id(id.to_string())
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        if result.rows_affected == 0 {
            return Err(DomainError::not_found("Reservation", id));
        }
        Ok(())
    }

    async fn find_active_for_car(&self, car_id: &str) -> DomainResult<Vec<Reservation>> {
        let models = reservation::Entity::find()
            .filter(reservation::Column::CarId.eq(car_id))
            .filter(reservation::Column::Status.is_in(active_tags()))
            .order_by_asc(reservation::Column::EndDate)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models.into_iter().map(model_to_domain).collect()
    }

    async fn find_stale_pending(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<Reservation>> {
        let models = reservation::Entity::find()
            .filter(reservation::Column::Status.eq(ReservationStatus::Pending.as_str()))
            .filter(reservation::Column::CreatedAt.lt(cutoff))
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models.into_iter().map(model_to_domain).collect()
    }

    async fn list(
        &self,
        filter: ReservationFilter,
        page: PaginationParams,
    ) -> DomainResult<PaginatedResult<Reservation>> {
        let mut query = reservation::Entity::find();

        if let Some(ref user_id) = filter.user_id {
            query = query.filter(reservation::Column::UserId.eq(user_id.as_str()));
        }
        if let Some(status) = filter.status {
            query = query.filter(reservation::Column::Status.eq(status.as_str()));
        }

        let query = query.order_by_desc(reservation::Column::CreatedAt);

        // Count total
        let total = query.clone().count(&self.db).await.map_err(db_err)?;

        let models = query
            .offset(page.offset())
            .limit(u64::from(page.limit))
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let items = models
            .into_iter()
            .map(model_to_domain)
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(PaginatedResult::new(items, total, page.page, page.limit))
    }
}
