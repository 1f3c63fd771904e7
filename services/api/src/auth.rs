//! Bearer credential verification.
//!
//! Credentials are HS256 JWTs. The checks run in a fixed order so the
//! failure kind is stable: structure, signature, expiry, required claims.
//! Expiry is checked here rather than by `jsonwebtoken` so the boundary is
//! exact (`exp == now` is already expired) and the clock can be injected.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use chrono::Utc;
use jsonwebtoken::{decode, decode_header, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use models::{Role, TenantId};
use std::collections::HashSet;

use crate::config::JwtConfig;

/// Why a request failed to authenticate. Every variant is a 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthenticationError {
    #[error("no bearer credential supplied")]
    MissingCredential,
    #[error("credential is not a well-formed token")]
    Malformed,
    #[error("credential signature is invalid")]
    InvalidSignature,
    #[error("credential has expired")]
    Expired,
    #[error("credential claims are malformed")]
    MalformedClaims,
}

impl AuthenticationError {
    /// Short label used in logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::Malformed => "malformed",
            Self::InvalidSignature => "invalid_signature",
            Self::Expired => "expired",
            Self::MalformedClaims => "malformed_claims",
        }
    }
}

/// Verified claims. Only produced by [`CredentialVerifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub subject: Option<String>,
    pub tenant_id: TenantId,
    pub role: Role,
}

/// Validates bearer credentials against the process signing secret.
#[derive(Clone)]
pub struct CredentialVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
    require_expiry: bool,
}

impl std::fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVerifier")
            .field("algorithms", &self.validation.algorithms)
            .field("require_expiry", &self.require_expiry)
            .finish_non_exhaustive()
    }
}

impl CredentialVerifier {
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // exp is enforced in `verify_at`; aud/iss are not part of this credential.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        Self {
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            require_expiry: config.require_expiry,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthenticationError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verifies `token` as of `now` (unix seconds).
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims, AuthenticationError> {
        decode_header(token).map_err(|_| AuthenticationError::Malformed)?;

        let raw = decode::<dto::AuthClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|err| match err.kind() {
                ErrorKind::InvalidToken => AuthenticationError::Malformed,
                // The header already parsed, so these come from the payload.
                ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
                    AuthenticationError::MalformedClaims
                }
                _ => AuthenticationError::InvalidSignature,
            })?
            .claims;

        if let Some(exp) = raw.exp {
            if now >= exp {
                return Err(AuthenticationError::Expired);
            }
        } else if self.require_expiry {
            return Err(AuthenticationError::MalformedClaims);
        }

        let tenant_id = raw
            .tenant_id
            .filter(|tenant| !tenant.is_empty())
            .ok_or(AuthenticationError::MalformedClaims)?;
        let role = raw
            .role
            .filter(|role| !role.is_empty())
            .ok_or(AuthenticationError::MalformedClaims)?;

        Ok(Claims {
            subject: raw.sub,
            tenant_id: TenantId::new(tenant_id),
            role: Role::from(role.as_str()),
        })
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthenticationError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthenticationError::MissingCredential)
}
