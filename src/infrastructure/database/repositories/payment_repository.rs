//! SeaORM implementation of PaymentRepository

use async_trait::async_trait;
use log::debug;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use super::db_err;
use crate::domain::payment::{Payment, PaymentMethod, PaymentRepository, PaymentStatus};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::payment;

pub struct SeaOrmPaymentRepository {
    db: DatabaseConnection,
}

impl SeaOrmPaymentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: payment::Model) -> Payment {
    Payment {
        id: m.id,
        user_id: m.user_id,
        reservation_id: m.reservation_id,
        transaction_id: m.transaction_id,
        amount: m.amount,
        currency: m.currency,
        payment_date: m.payment_date,
        method: PaymentMethod::parse(&m.method),
        status: PaymentStatus::from_gateway(&m.status),
    }
}

fn domain_to_active(p: Payment) -> payment::ActiveModel {
    payment::ActiveModel {
        id: Set(p.id),
        user_id: Set(p.user_id),
        reservation_id: Set(p.reservation_id),
        transaction_id: Set(p.transaction_id),
        amount: Set(p.amount),
        currency: Set(p.currency),
        payment_date: Set(p.payment_date),
        method: Set(p.method.as_str().to_string()),
        status: Set(p.status.as_str().to_string()),
    }
}

// ── PaymentRepository impl ──────────────────────────────────────

#[async_trait]
impl PaymentRepository for SeaOrmPaymentRepository {
    async fn save(&self, p: Payment) -> DomainResult<()> {
        debug!("Saving payment {} for reservation {}", p.id, p.reservation_id);
        domain_to_active(p).insert(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn update(&self, p: Payment) -> DomainResult<()> {
        debug!("Updating payment {}: {}", p.id, p.status);

        let existing = payment::Entity::find_by_id(p.id.clone())
            .one(&self.db)
            .await
            .map_err(db_err)?;
        if existing.is_none() {
            return Err(DomainError::not_found("Payment", p.id));
        }

        domain_to_active(p).update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn find_by_reservation(&self, reservation_id: &str) -> DomainResult<Option<Payment>> {
        let model = payment::Entity::find()
            .filter(payment::Column::ReservationId.eq(reservation_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> DomainResult<Option<Payment>> {
        let model = payment::Entity::find()
            .filter(payment::Column::TransactionId.eq(transaction_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }
}
