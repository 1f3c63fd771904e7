//! `GET /api/v1/metrics`.
//!
//! A request moves through `Unauthenticated → Authenticated → Authorized →
//! Aggregating → Responded` and stops at the first failure. Credentials are
//! checked before the query string is even parsed, and the tenant before any
//! other query parameter is validated.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use models::MetricCategory;
use std::collections::BTreeSet;
use tokio_util::sync::CancellationToken;
use tracing::{field, Instrument, Span};
use uuid::Uuid;

use crate::auth::{bearer_token, Claims};
use crate::error::ApiError;
use crate::policy::RolePolicy;
use crate::tenant::{self, AuthorizedScope};
use crate::AppState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Unauthenticated,
    Authenticated,
    Authorized,
    Aggregating,
    Responded,
}

impl Stage {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Authenticated => "authenticated",
            Self::Authorized => "authorized",
            Self::Aggregating => "aggregating",
            Self::Responded => "responded",
        }
    }
}

fn enter(stage: Stage) {
    Span::current().record("stage", stage.as_str());
}

/// Query parameters, collected leniently so that a repeated key never fails
/// the request before the tenant has been checked.
#[derive(Debug, Default)]
pub struct MetricsParams {
    pub tenant_ids: Vec<String>,
    /// Comma-separated category names, one entry per `categories=` key.
    pub categories: Vec<String>,
}

impl MetricsParams {
    fn from_uri(uri: &Uri) -> Result<Self, ApiError> {
        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(uri)
            .map_err(|rejection| ApiError::InvalidQuery(rejection.body_text()))?;

        let mut params = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "tenantId" => params.tenant_ids.push(value),
                "categories" => params.categories.push(value),
                _ => {}
            }
        }
        Ok(params)
    }

    fn categories(&self) -> Option<String> {
        (!self.categories.is_empty()).then(|| self.categories.join(","))
    }
}

/// Every `tenantId` value must pass the guard on its own; only then may
/// disagreeing values be reported as a bad request.
fn authorize_tenants(
    claims: &Claims,
    requested: &[String],
    policy: &RolePolicy,
) -> Result<AuthorizedScope, ApiError> {
    let mut scope: Option<AuthorizedScope> = None;
    for tenant_id in requested {
        let next = tenant::authorize(claims, Some(tenant_id), policy)?;
        if scope.as_ref().is_some_and(|prev| prev != &next) {
            return Err(ApiError::InvalidQuery(
                "conflicting tenantId parameters".to_string(),
            ));
        }
        scope = Some(next);
    }
    match scope {
        Some(scope) => Ok(scope),
        None => Ok(tenant::authorize(claims, None, policy)?),
    }
}

fn parse_categories(raw: Option<&str>) -> Result<Option<BTreeSet<MetricCategory>>, ApiError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            name.parse::<MetricCategory>()
                .map_err(|err| ApiError::InvalidQuery(err.to_string()))
        })
        .collect::<Result<BTreeSet<_>, _>>()
        .map(|set| (!set.is_empty()).then_some(set))
}

/// Runs one request through every stage.
pub async fn serve_metrics(
    state: &AppState,
    headers: &HeaderMap,
    uri: &Uri,
    cancel: &CancellationToken,
) -> Result<dto::MetricsResponse, ApiError> {
    enter(Stage::Unauthenticated);
    let token = bearer_token(headers)?;
    let claims = state.verifier().verify(token)?;
    enter(Stage::Authenticated);

    let params = MetricsParams::from_uri(uri)?;
    let scope = authorize_tenants(&claims, &params.tenant_ids, state.policy())?;

    let requested = parse_categories(params.categories().as_deref())?;
    let categories = state.policy().resolve(scope.role(), requested.as_ref())?;
    Span::current().record("tenant_id", scope.tenant_id().as_str());
    if scope.is_cross_tenant() {
        tracing::info!(home_tenant = %claims.tenant_id, "cross-tenant read");
    }
    enter(Stage::Authorized);
    tracing::debug!(?categories, "request authorized");

    enter(Stage::Aggregating);
    let snapshot = state
        .aggregator()
        .aggregate(&scope, &categories, state.aggregation_timeout(), cancel)
        .await?;

    enter(Stage::Responded);
    Ok(snapshot.into())
}

pub async fn metrics(State(state): State<AppState>, headers: HeaderMap, uri: Uri) -> Response {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!(
        "metrics_request",
        %request_id,
        stage = field::Empty,
        tenant_id = field::Empty,
    );

    // Dropping this future (client gone) cancels the token and with it any
    // store work still in flight for this request.
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();
    let result = serve_metrics(&state, &headers, &uri, &cancel)
        .instrument(span.clone())
        .await;
    let _ = guard.disarm();

    let request_id_header = (
        HeaderName::from_static(REQUEST_ID_HEADER),
        HeaderValue::from_str(&request_id.to_string()).unwrap_or(HeaderValue::from_static("")),
    );

    match result {
        Ok(body) => (StatusCode::OK, [request_id_header], Json(body)).into_response(),
        Err(err) => {
            span.in_scope(|| err.log());
            (
                err.status_code(),
                [request_id_header],
                Json(err.body(Some(request_id))),
            )
                .into_response()
        }
    }
}
