//! Car catalog lookup

use async_trait::async_trait;

use super::model::Car;
use crate::domain::DomainResult;

#[async_trait]
pub trait CarRepository: Send + Sync {
    /// Find car by ID
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Car>>;
}
