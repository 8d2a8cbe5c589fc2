//! SeaORM implementation of UserRepository

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect};

use super::db_err;
use crate::domain::user::{User, UserRepository};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::user;

/// Upper bound on users returned by a contact search
const SEARCH_LIMIT: u64 = 20;

pub struct SeaOrmUserRepository {
    db: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: user::Model) -> User {
    User {
        id: m.id,
        name: m.name,
        email: m.email,
        phone: m.phone,
        is_admin: m.is_admin,
        created_at: m.created_at,
    }
}

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn search_by_contact(&self, term: &str) -> DomainResult<Vec<User>> {
        // SQLite LIKE is case-insensitive for ASCII.
        let models = user::Entity::find()
            .filter(
                user::Column::Email
                    .contains(term)
                    .or(user::Column::Phone.contains(term)),
            )
            .limit(SEARCH_LIMIT)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }
}
