//! Operational limit bands.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::OperationalLimit;

#[async_trait]
pub trait LimitsRepository: Send + Sync {
    async fn limits_for(&self, variable: &str) -> RepositoryResult<Option<OperationalLimit>>;

    /// Insert or replace the row for `limit.variable`.
    async fn upsert_limit(&self, limit: &OperationalLimit) -> RepositoryResult<()>;

    /// All rows ordered by variable name.
    async fn list_limits(&self) -> RepositoryResult<Vec<OperationalLimit>>;
}
