//! Historical pattern buckets.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::HourlyPattern;

#[async_trait]
pub trait PatternRepository: Send + Sync {
    /// Exact bucket for `(hour_of_day, weekday)`, Monday = 0.
    async fn pattern_for(&self, hour_of_day: u8, weekday: u8)
        -> RepositoryResult<Option<HourlyPattern>>;

    /// Insert or replace the bucket keyed by the pattern's hour and weekday.
    async fn upsert_pattern(&self, pattern: &HourlyPattern) -> RepositoryResult<()>;

    /// All buckets ordered by weekday, then hour.
    async fn list_patterns(&self) -> RepositoryResult<Vec<HourlyPattern>>;
}
