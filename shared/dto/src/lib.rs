use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Payload of a bearer credential as it appears on the wire.
///
/// Every field is optional here; the verifier decides which ones are required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthClaims {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(rename = "tenantId", skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(
        default,
        deserialize_with = "numeric_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub exp: Option<i64>,
    #[serde(
        default,
        deserialize_with = "numeric_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub iat: Option<i64>,
}

/// NumericDate may carry a fractional part; it is floored to whole seconds.
fn numeric_date<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer)?
        .map(|seconds| {
            if seconds.is_finite() {
                Ok(seconds.floor() as i64)
            } else {
                Err(serde::de::Error::custom("NumericDate must be finite"))
            }
        })
        .transpose()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsResponse {
    pub tenant_id: String,
    pub computed_at: DateTime<Utc>,
    pub metrics: BTreeMap<String, serde_json::Value>,
}

/// Body of every non-2xx response. Messages are fixed per status so nothing
/// internal reaches the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status: String,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(json: &str) -> Result<AuthClaims, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn numeric_dates_accept_integers_and_fractions() {
        assert_eq!(claims(r#"{"exp":1700000000}"#).unwrap().exp, Some(1_700_000_000));
        let fractional = claims(r#"{"exp":1700000000.75,"iat":1699999999.5}"#).unwrap();
        assert_eq!(fractional.exp, Some(1_700_000_000));
        assert_eq!(fractional.iat, Some(1_699_999_999));
        assert_eq!(claims("{}").unwrap().exp, None);
        assert_eq!(claims(r#"{"exp":null}"#).unwrap().exp, None);
    }

    #[test]
    fn numeric_dates_reject_non_numbers() {
        assert!(claims(r#"{"exp":"tomorrow"}"#).is_err());
    }
}
