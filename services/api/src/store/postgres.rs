use async_trait::async_trait;
use models::{MetricCategory, TenantId};
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use super::{MetricRecord, MetricsStore, StoreError};

#[derive(Clone)]
pub struct PgMetricsStore {
    pool: Pool<Postgres>,
}

#[derive(Debug, sqlx::FromRow)]
struct MetricRow {
    tenant_id: String,
    name: String,
    value: f64,
}

impl PgMetricsStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Connects and brings the schema up to date.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl MetricsStore for PgMetricsStore {
    async fn fetch(
        &self,
        tenant_id: &TenantId,
        category: MetricCategory,
    ) -> Result<Vec<MetricRecord>, StoreError> {
        // Latest sample per metric name.
        let rows = sqlx::query_as::<_, MetricRow>(
            r#"
                SELECT DISTINCT ON (name)
                    tenant_id,
                    name,
                    value
                FROM tenant_metrics
                WHERE tenant_id = $1 AND category = $2
                ORDER BY name, captured_at DESC
            "#,
        )
        .bind(tenant_id.as_str())
        .bind(category.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| MetricRecord {
                tenant_id: TenantId::new(row.tenant_id),
                name: row.name,
                value: row.value.into(),
            })
            .collect())
    }
}
