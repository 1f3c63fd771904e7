//! Combines per-category store reads into one snapshot.
//!
//! Categories are fetched concurrently, one task each. The first failure
//! ends the aggregation and aborts the remaining tasks: a snapshot is either
//! complete or not produced at all.

use chrono::{DateTime, Utc};
use models::{MetricCategory, MetricValue, TenantId};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
    time::Duration,
};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::store::{MetricRecord, MetricsStore, StoreError};
use crate::tenant::AuthorizedScope;

#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    #[error("aggregation exceeded its deadline of {0:?}")]
    Timeout(Duration),
    #[error("metrics backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("aggregation cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub tenant_id: TenantId,
    pub computed_at: DateTime<Utc>,
    /// Keyed by `<category>.<name>`.
    pub metrics: BTreeMap<String, MetricValue>,
}

impl From<MetricsSnapshot> for dto::MetricsResponse {
    fn from(snapshot: MetricsSnapshot) -> Self {
        Self {
            tenant_id: snapshot.tenant_id.to_string(),
            computed_at: snapshot.computed_at,
            metrics: snapshot.metrics,
        }
    }
}

#[derive(Clone)]
pub struct MetricsAggregator {
    store: Arc<dyn MetricsStore>,
}

type FetchOutcome = (MetricCategory, Option<Result<Vec<MetricRecord>, StoreError>>);

impl MetricsAggregator {
    pub fn new(store: Arc<dyn MetricsStore>) -> Self {
        Self { store }
    }

    pub async fn aggregate(
        &self,
        scope: &AuthorizedScope,
        categories: &BTreeSet<MetricCategory>,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<MetricsSnapshot, AggregationError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AggregationError::Cancelled),
            result = tokio::time::timeout(deadline, self.collect(scope, categories, cancel)) => {
                result.unwrap_or(Err(AggregationError::Timeout(deadline)))
            }
        }
    }

    async fn collect(
        &self,
        scope: &AuthorizedScope,
        categories: &BTreeSet<MetricCategory>,
        cancel: &CancellationToken,
    ) -> Result<MetricsSnapshot, AggregationError> {
        let mut tasks: JoinSet<FetchOutcome> = JoinSet::new();
        for &category in categories {
            let store = Arc::clone(&self.store);
            let tenant_id = scope.tenant_id().clone();
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    result = store.fetch(&tenant_id, category) => Some(result),
                };
                (category, outcome)
            });
        }

        let mut metrics = BTreeMap::new();
        // Returning early drops `tasks`, which aborts whatever is still running.
        while let Some(joined) = tasks.join_next().await {
            let (category, outcome) = joined
                .map_err(|err| AggregationError::BackendUnavailable(format!("fetch task failed: {err}")))?;

            let records = match outcome {
                None => return Err(AggregationError::Cancelled),
                Some(Err(err)) => {
                    return Err(AggregationError::BackendUnavailable(format!("{category}: {err}")))
                }
                Some(Ok(records)) => records,
            };

            for record in records {
                if &record.tenant_id != scope.tenant_id() {
                    tracing::error!(
                        %category,
                        expected = %scope.tenant_id(),
                        "store returned a record for another tenant"
                    );
                    return Err(AggregationError::BackendUnavailable(format!(
                        "{category}: record outside the requested tenant"
                    )));
                }
                metrics.insert(format!("{category}.{}", record.name), record.value);
            }
        }

        Ok(MetricsSnapshot {
            tenant_id: scope.tenant_id().clone(),
            computed_at: Utc::now(),
            metrics,
        })
    }
}
