use async_trait::async_trait;

use super::User;
use crate::domain::DomainResult;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<User>>;

    /// Users whose email or phone contains `term`, case-insensitively
    async fn search_by_contact(&self, term: &str) -> DomainResult<Vec<User>>;
}
