//! Tenant-scoped metric storage.
//!
//! Every backend answers one question: the current values of one category for
//! one tenant. Records carry the tenant they were read for so callers can
//! check nothing crossed over.

use async_trait::async_trait;
use models::{MetricCategory, MetricValue, TenantId};

mod memory;
mod postgres;
mod redis;

pub use self::memory::InMemoryMetricsStore;
pub use self::postgres::PgMetricsStore;
pub use self::redis::RedisMetricsStore;

#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub tenant_id: TenantId,
    pub name: String,
    pub value: MetricValue,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Redis(#[from] ::redis::RedisError),
}

#[async_trait]
pub trait MetricsStore: Send + Sync + 'static {
    /// Reads the current values of `category` for `tenant_id` only.
    ///
    /// Must be idempotent and safe to call concurrently for different categories.
    async fn fetch(
        &self,
        tenant_id: &TenantId,
        category: MetricCategory,
    ) -> Result<Vec<MetricRecord>, StoreError>;
}
