//! Multi-tenant metrics API.
//!
//! Callers present an HS256 bearer credential naming their tenant and role.
//! The service only ever reads metrics for the tenant it has cleared the
//! caller to see, and only the categories the caller's role may read.

pub mod aggregator;
pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod policy;
pub mod store;
pub mod tenant;

use axum::{
    http::{header, HeaderName, Method},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::aggregator::MetricsAggregator;
use crate::auth::CredentialVerifier;
use crate::config::AppConfig;
use crate::policy::RolePolicy;
use crate::store::MetricsStore;

#[derive(Clone)]
pub struct AppState {
    verifier: Arc<CredentialVerifier>,
    policy: Arc<RolePolicy>,
    aggregator: MetricsAggregator,
    aggregation_timeout: Duration,
}

impl AppState {
    pub fn new(config: &AppConfig, store: Arc<dyn MetricsStore>) -> Self {
        Self {
            verifier: Arc::new(CredentialVerifier::new(&config.jwt)),
            policy: Arc::new(config.policy.clone()),
            aggregator: MetricsAggregator::new(store),
            aggregation_timeout: config.aggregation_timeout,
        }
    }

    fn verifier(&self) -> &CredentialVerifier {
        &self.verifier
    }

    fn policy(&self) -> &RolePolicy {
        &self.policy
    }

    fn aggregator(&self) -> &MetricsAggregator {
        &self.aggregator
    }

    fn aggregation_timeout(&self) -> Duration {
        self.aggregation_timeout
    }
}

/// Liveness probe; needs no credential.
async fn health() -> Json<serde_json::Value> {
    Json(json!({"status":"ok"}))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([HeaderName::from_static(handler::REQUEST_ID_HEADER)]);

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/metrics", get(handler::metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
