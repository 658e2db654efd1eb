use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identity::Identity;
use super::session::SessionState;
use crate::db::Db;
use crate::errors::AppError;
use crate::models::ids;
use crate::store::{self, StoreError, WriteBatch, ns};

const ROLE_KEY: &str = "role";
const REGISTRY_KEY: &str = "roles";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Practitioner,
    Patient,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Practitioner, Role::Patient, Role::Admin];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Practitioner => "practitioner",
            Role::Patient => "patient",
            Role::Admin => "admin",
        }
    }

    /// Every route under this prefix belongs to the role.
    pub fn route_prefix(self) -> &'static str {
        match self {
            Role::Practitioner => "/practitioner",
            Role::Patient => "/patient",
            Role::Admin => "/admin",
        }
    }

    /// The role that owns `path`, if any.
    pub fn for_path(path: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|role| {
            let prefix = role.route_prefix();
            path == prefix
                || path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "practitioner" => Ok(Role::Practitioner),
            "patient" => Ok(Role::Patient),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Unknown role '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub identity_id: String,
    pub email: String,
    pub role: Role,
    pub assigned_at: DateTime<Utc>,
}

/// Who may claim which role. Practitioner and patient are self-asserted;
/// admin is limited to `admin_emails` unless that list is empty.
#[derive(Debug, Clone, Default)]
pub struct RolePolicy {
    pub admin_emails: Vec<String>,
}

impl RolePolicy {
    pub fn allows(&self, identity: &Identity, role: Role) -> bool {
        match role {
            Role::Admin if !self.admin_emails.is_empty() => self
                .admin_emails
                .iter()
                .any(|e| e.eq_ignore_ascii_case(identity.email.trim())),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    RedirectToEntry,
}

/// Gate a path for the current session. Paths outside the role prefixes are
/// open; role paths need that exact role, anything else goes back to `/`.
pub fn route_decision(state: &SessionState, path: &str) -> RouteDecision {
    match Role::for_path(path) {
        None => RouteDecision::Allow,
        Some(required) if state.role() == Some(required) => RouteDecision::Allow,
        Some(_) => RouteDecision::RedirectToEntry,
    }
}

/// The role chosen earlier by `identity_id`, if any.
pub async fn cached_role(db: &Db, identity_id: &str) -> Result<Option<Role>, StoreError> {
    let assignment: Option<RoleAssignment> =
        store::get_doc(db.store(), &ns::identity(identity_id), ROLE_KEY).await?;
    Ok(assignment.map(|a| a.role))
}

/// Record the one-time role choice for `identity`. A second call fails with
/// `Conflict`; roles cannot be changed.
pub async fn assign_role(
    db: &Db,
    identity: &Identity,
    role: Role,
    policy: &RolePolicy,
) -> Result<RoleAssignment, AppError> {
    if !policy.allows(identity, role) {
        return Err(AppError::Validation(vec![format!(
            "Role '{role}' is not available for this account"
        )]));
    }

    let _guard = db.lock_writes().await;
    if let Some(existing) = cached_role(db, &identity.id).await? {
        return Err(AppError::Conflict(format!("Role already assigned: {existing}")));
    }

    let assignment = RoleAssignment {
        identity_id: identity.id.clone(),
        email: identity.email.clone(),
        role,
        assigned_at: ids::now(),
    };
    let mut registry: Vec<RoleAssignment> =
        store::get_list(db.store(), ns::REGISTRY, REGISTRY_KEY).await?;
    registry.push(assignment.clone());

    let mut batch = WriteBatch::new();
    batch.put(&ns::identity(&identity.id), ROLE_KEY, &assignment)?;
    batch.put(ns::REGISTRY, REGISTRY_KEY, &registry)?;
    db.store().commit(batch).await?;

    log::info!("Identity {} assigned role {}", identity.id, role);
    Ok(assignment)
}

pub async fn list_assignments(db: &Db) -> Result<Vec<RoleAssignment>, StoreError> {
    store::get_list(db.store(), ns::REGISTRY, REGISTRY_KEY).await
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoleCounts {
    pub practitioners: usize,
    pub patients: usize,
    pub admins: usize,
}

pub async fn role_counts(db: &Db) -> Result<RoleCounts, StoreError> {
    let mut counts = RoleCounts::default();
    for a in list_assignments(db).await? {
        match a.role {
            Role::Practitioner => counts.practitioners += 1,
            Role::Patient => counts.patients += 1,
            Role::Admin => counts.admins += 1,
        }
    }
    Ok(counts)
}
