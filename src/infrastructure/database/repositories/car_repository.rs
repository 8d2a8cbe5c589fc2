//! SeaORM implementation of CarRepository

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, EntityTrait};

use super::db_err;
use crate::domain::car::{Car, CarRepository, CarStatus};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::car;

pub struct SeaOrmCarRepository {
    db: DatabaseConnection,
}

impl SeaOrmCarRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: car::Model) -> Car {
    Car {
        id: m.id,
        model: m.model,
        plate_number: m.plate_number,
        price_per_day: m.price_per_day,
        status: CarStatus::parse(&m.status),
        created_at: m.created_at,
    }
}

#[async_trait]
impl CarRepository for SeaOrmCarRepository {
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Car>> {
        let model = car::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }
}
