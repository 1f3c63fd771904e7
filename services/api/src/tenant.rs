//! Tenant isolation.
//!
//! [`AuthorizedScope`] can only be built by [`authorize`], and the aggregator
//! only accepts a scope, so every store query is bound to a tenant the caller
//! was allowed to see.

use models::{Role, TenantId};

use crate::auth::Claims;
use crate::policy::RolePolicy;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("tenant `{requested}` is outside the credential's tenant")]
pub struct TenantMismatch {
    pub requested: TenantId,
}

/// Tenant a request has been cleared to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedScope {
    tenant_id: TenantId,
    role: Role,
    cross_tenant: bool,
}

impl AuthorizedScope {
    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    /// True when access was granted through a cross-tenant override.
    pub fn is_cross_tenant(&self) -> bool {
        self.cross_tenant
    }
}

/// Clears `claims` to read `requested`, defaulting to the credential's own
/// tenant when the request names none.
pub fn authorize(
    claims: &Claims,
    requested: Option<&str>,
    policy: &RolePolicy,
) -> Result<AuthorizedScope, TenantMismatch> {
    let Some(requested) = requested else {
        return Ok(AuthorizedScope {
            tenant_id: claims.tenant_id.clone(),
            role: claims.role.clone(),
            cross_tenant: false,
        });
    };

    if requested == claims.tenant_id.as_str() {
        return Ok(AuthorizedScope {
            tenant_id: claims.tenant_id.clone(),
            role: claims.role.clone(),
            cross_tenant: false,
        });
    }

    if policy.allows_cross_tenant(&claims.role) {
        return Ok(AuthorizedScope {
            tenant_id: TenantId::new(requested),
            role: claims.role.clone(),
            cross_tenant: true,
        });
    }

    Err(TenantMismatch {
        requested: TenantId::new(requested),
    })
}

#[cfg(test)]
pub(crate) fn scope_for(tenant: &str, role: Role) -> AuthorizedScope {
    AuthorizedScope {
        tenant_id: TenantId::new(tenant),
        role,
        cross_tenant: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(tenant: &str, role: Role) -> Claims {
        Claims {
            subject: Some("t".into()),
            tenant_id: TenantId::new(tenant),
            role,
        }
    }

    #[test]
    fn same_tenant_is_authorized() {
        let scope = authorize(
            &claims("logi_xpress", Role::Manager),
            Some("logi_xpress"),
            &RolePolicy::default(),
        )
        .unwrap();
        assert_eq!(scope.tenant_id().as_str(), "logi_xpress");
        assert!(!scope.is_cross_tenant());
    }

    #[test]
    fn missing_tenant_defaults_to_the_credential() {
        let scope = authorize(&claims("acme", Role::Viewer), None, &RolePolicy::default()).unwrap();
        assert_eq!(scope.tenant_id().as_str(), "acme");
    }

    #[test]
    fn mismatch_is_denied() {
        let err = authorize(
            &claims("logi_xpress", Role::Manager),
            Some("other_tenant"),
            &RolePolicy::default(),
        )
        .unwrap_err();
        assert_eq!(err.requested.as_str(), "other_tenant");
    }

    #[test]
    fn comparison_is_exact() {
        let policy = RolePolicy::default();
        let claims = claims("logi_xpress", Role::Manager);
        assert!(authorize(&claims, Some("LOGI_XPRESS"), &policy).is_err());
        assert!(authorize(&claims, Some("logi_xpress "), &policy).is_err());
        assert!(authorize(&claims, Some("logi"), &policy).is_err());
        assert!(authorize(&claims, Some(""), &policy).is_err());
    }

    #[test]
    fn admin_needs_an_explicit_override() {
        let claims = claims("home", Role::Admin);
        assert!(authorize(&claims, Some("away"), &RolePolicy::default()).is_err());

        let policy = RolePolicy::default().with_cross_tenant_roles("admin").unwrap();
        let scope = authorize(&claims, Some("away"), &policy).unwrap();
        assert_eq!(scope.tenant_id().as_str(), "away");
        assert!(scope.is_cross_tenant());
    }
}
