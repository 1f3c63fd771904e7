use async_trait::async_trait;
use models::{MetricCategory, MetricValue, TenantId};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
};
use tokio::sync::RwLock;

use super::{MetricRecord, MetricsStore, StoreError};

type Key = (TenantId, MetricCategory);

/// Process-local store for tests and local development.
///
/// Outages and latency can be injected to exercise the failure paths.
#[derive(Debug, Default)]
pub struct InMemoryMetricsStore {
    data: RwLock<HashMap<Key, BTreeMap<String, MetricValue>>>,
    failing: RwLock<HashSet<MetricCategory>>,
    latency: RwLock<Option<Duration>>,
    unavailable: AtomicBool,
    completed: AtomicUsize,
}

impl InMemoryMetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(
        &self,
        tenant_id: impl Into<TenantId>,
        category: MetricCategory,
        name: impl Into<String>,
        value: impl Into<MetricValue>,
    ) {
        self.data
            .write()
            .await
            .entry((tenant_id.into(), category))
            .or_default()
            .insert(name.into(), value.into());
    }

    /// Makes every fetch fail until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes fetches of one category fail.
    pub async fn fail_category(&self, category: MetricCategory) {
        self.failing.write().await.insert(category);
    }

    pub async fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write().await = latency;
    }

    /// Number of fetches that ran to completion, successful or not.
    pub fn completed_fetches(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricsStore for InMemoryMetricsStore {
    async fn fetch(
        &self,
        tenant_id: &TenantId,
        category: MetricCategory,
    ) -> Result<Vec<MetricRecord>, StoreError> {
        let latency = *self.latency.read().await;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);

        if self.unavailable.load(Ordering::SeqCst) || self.failing.read().await.contains(&category) {
            return Err(StoreError::Unavailable(format!("{category} is unreachable")));
        }

        let data = self.data.read().await;
        let records = data
            .get(&(tenant_id.clone(), category))
            .map(|values| {
                values
                    .iter()
                    .map(|(name, value)| MetricRecord {
                        tenant_id: tenant_id.clone(),
                        name: name.clone(),
                        value: value.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(records)
    }
}
