//! Role → metric category permissions.
//!
//! The table is data, loaded from configuration at startup. A role that is
//! not in the table is granted nothing.

use models::{MetricCategory, Role};
use std::collections::{BTreeSet, HashMap, HashSet};

pub const DEFAULT_ROLE_CATEGORIES: &str = "viewer=summary;manager=summary,operational;admin=*";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyConfigError {
    #[error("policy entry `{0}` is not of the form role=categories")]
    MalformedEntry(String),
    #[error("policy names unknown role `{0}`")]
    UnknownRole(String),
    #[error("policy names unknown category `{0}`")]
    UnknownCategory(String),
    #[error("role `{0}` appears more than once in the policy")]
    DuplicateRole(String),
}

/// A requested category is outside what the caller's role may read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("role `{role}` may not read the requested categories")]
pub struct CategoryDenied {
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePolicy {
    grants: HashMap<Role, BTreeSet<MetricCategory>>,
    cross_tenant: HashSet<Role>,
}

impl Default for RolePolicy {
    fn default() -> Self {
        let viewer = BTreeSet::from([MetricCategory::Summary]);
        let manager = BTreeSet::from([MetricCategory::Summary, MetricCategory::Operational]);
        let admin = MetricCategory::ALL.into_iter().collect();

        Self {
            grants: HashMap::from([
                (Role::Viewer, viewer),
                (Role::Manager, manager),
                (Role::Admin, admin),
            ]),
            cross_tenant: HashSet::new(),
        }
    }
}

impl RolePolicy {
    /// Parses a table such as `viewer=summary;manager=summary,operational;admin=*`.
    pub fn parse(table: &str) -> Result<Self, PolicyConfigError> {
        let mut grants = HashMap::new();

        for entry in table.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let (role, categories) = entry
                .split_once('=')
                .ok_or_else(|| PolicyConfigError::MalformedEntry(entry.to_string()))?;
            let role = parse_role(role.trim())?;

            let categories = match categories.trim() {
                "*" => MetricCategory::ALL.into_iter().collect(),
                list => list
                    .split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(|c| {
                        c.parse::<MetricCategory>()
                            .map_err(|_| PolicyConfigError::UnknownCategory(c.to_string()))
                    })
                    .collect::<Result<BTreeSet<_>, _>>()?,
            };

            if grants.insert(role.clone(), categories).is_some() {
                return Err(PolicyConfigError::DuplicateRole(role.to_string()));
            }
        }

        Ok(Self {
            grants,
            cross_tenant: HashSet::new(),
        })
    }

    /// Grants the listed roles (comma-separated) access across tenants.
    pub fn with_cross_tenant_roles(mut self, roles: &str) -> Result<Self, PolicyConfigError> {
        self.cross_tenant = roles
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(parse_role)
            .collect::<Result<_, _>>()?;
        Ok(self)
    }

    pub fn permits(&self, role: &Role, category: MetricCategory) -> bool {
        self.grants
            .get(role)
            .is_some_and(|categories| categories.contains(&category))
    }

    pub fn allows_cross_tenant(&self, role: &Role) -> bool {
        self.cross_tenant.contains(role)
    }

    /// Categories to aggregate for `role`.
    ///
    /// With no explicit request the role's whole grant is used. Any requested
    /// category outside the grant denies the request, as does an empty result.
    pub fn resolve(
        &self,
        role: &Role,
        requested: Option<&BTreeSet<MetricCategory>>,
    ) -> Result<BTreeSet<MetricCategory>, CategoryDenied> {
        let denied = || CategoryDenied { role: role.clone() };

        let resolved = match requested {
            Some(requested) if requested.iter().all(|c| self.permits(role, *c)) => {
                requested.clone()
            }
            Some(_) => return Err(denied()),
            None => MetricCategory::ALL
                .into_iter()
                .filter(|c| self.permits(role, *c))
                .collect(),
        };

        if resolved.is_empty() {
            return Err(denied());
        }
        Ok(resolved)
    }
}

fn parse_role(name: &str) -> Result<Role, PolicyConfigError> {
    let role = Role::from(name);
    if role.is_known() {
        Ok(role)
    } else {
        Err(PolicyConfigError::UnknownRole(name.to_string()))
    }
}
