use actix_session::Session;
use serde::Serialize;

use super::identity::Identity;
use super::role::Role;
use crate::errors::AppError;

/// Where an identity stands: `Unauthenticated → RoleUnset → RoleAssigned`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Unauthenticated,
    RoleUnset { identity: Identity },
    RoleAssigned { identity: Identity, role: Role },
}

impl SessionState {
    /// State right after sign-in, given the role cached for this identity.
    pub fn signed_in(identity: Identity, cached_role: Option<Role>) -> Self {
        match cached_role {
            Some(role) => SessionState::RoleAssigned { identity, role },
            None => SessionState::RoleUnset { identity },
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Unauthenticated => None,
            SessionState::RoleUnset { identity } | SessionState::RoleAssigned { identity, .. } => {
                Some(identity)
            }
        }
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            SessionState::RoleAssigned { role, .. } => Some(*role),
            _ => None,
        }
    }

    /// Move `RoleUnset → RoleAssigned`. Any other state is returned unchanged.
    pub fn with_role(self, role: Role) -> Self {
        match self {
            SessionState::RoleUnset { identity } => SessionState::RoleAssigned { identity, role },
            other => other,
        }
    }
}

pub fn get_identity(session: &Session) -> Option<Identity> {
    let id = session.get::<String>("identity_id").unwrap_or(None)?;
    let email = session.get::<String>("email").unwrap_or(None).unwrap_or_default();
    Some(Identity { id, email })
}

pub fn get_role(session: &Session) -> Option<Role> {
    session
        .get::<String>("role")
        .unwrap_or(None)
        .and_then(|r| r.parse().ok())
}

pub fn load_state(session: &Session) -> SessionState {
    match get_identity(session) {
        Some(identity) => SessionState::signed_in(identity, get_role(session)),
        None => SessionState::Unauthenticated,
    }
}

/// Bind `identity` to the session. Switching identity drops the cached role.
pub fn store_identity(session: &Session, identity: &Identity) -> Result<(), AppError> {
    if let Some(previous) = get_identity(session) {
        if previous.id != identity.id {
            session.remove("role");
        }
    }
    session.insert("identity_id", &identity.id)?;
    session.insert("email", &identity.email)?;
    Ok(())
}

pub fn store_role(session: &Session, role: Role) -> Result<(), AppError> {
    session.insert("role", role.as_str())?;
    Ok(())
}

pub fn require_identity(session: &Session) -> Result<Identity, AppError> {
    get_identity(session).ok_or(AppError::Unauthenticated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident() -> Identity {
        Identity::new("u1", "u1@example.com")
    }

    #[test]
    fn state_machine() {
        let state = SessionState::signed_in(ident(), None);
        assert_eq!(state.identity(), Some(&ident()));
        assert_eq!(state.role(), None);

        let state = state.with_role(Role::Patient);
        assert_eq!(state.role(), Some(Role::Patient));

        // No role change once assigned
        let state = state.with_role(Role::Admin);
        assert_eq!(state.role(), Some(Role::Patient));

        assert_eq!(SessionState::Unauthenticated.with_role(Role::Admin), SessionState::Unauthenticated);
    }

    #[test]
    fn cached_role_skips_role_unset() {
        let state = SessionState::signed_in(ident(), Some(Role::Practitioner));
        assert_eq!(state.role(), Some(Role::Practitioner));
    }
}
