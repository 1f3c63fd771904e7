use async_trait::async_trait;
use models::{MetricCategory, TenantId};
use redis::aio::ConnectionManager;
use std::collections::HashMap;

use super::{MetricRecord, MetricsStore, StoreError};

/// Reads counters kept as hashes under `metrics:{tenant}:{category}`.
#[derive(Clone)]
pub struct RedisMetricsStore {
    conn: ConnectionManager,
}

impl RedisMetricsStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn))
    }
}

pub(crate) fn hash_key(tenant_id: &TenantId, category: MetricCategory) -> String {
    format!("metrics:{}:{}", tenant_id.as_str(), category.as_str())
}

#[async_trait]
impl MetricsStore for RedisMetricsStore {
    async fn fetch(
        &self,
        tenant_id: &TenantId,
        category: MetricCategory,
    ) -> Result<Vec<MetricRecord>, StoreError> {
        let mut conn = self.conn.clone();
        let values = redis::cmd("HGETALL")
            .arg(hash_key(tenant_id, category))
            .query_async::<_, HashMap<String, f64>>(&mut conn)
            .await?;

        Ok(values
            .into_iter()
            .map(|(name, value)| MetricRecord {
                tenant_id: tenant_id.clone(),
                name,
                value: value.into(),
            })
            .collect())
    }
}
