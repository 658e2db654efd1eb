//! In-process entry point for view code.
//!
//! A [`Portal`] follows an [`IdentityProvider`], resolves each signed-in
//! identity to its cached role, and hands out role-scoped views. Dropping
//! the portal stops the follower task, which drops its identity
//! subscription.

mod views;

pub use views::{AdminView, PatientView, PractitionerView};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::auth::identity::{Identity, IdentityProvider, IdentitySubscription};
use crate::auth::role::{self, Role, RouteDecision, RolePolicy};
use crate::auth::session::SessionState;
use crate::db::Db;
use crate::errors::AppError;
use crate::models::seed;

/// Result of asking for a role-scoped view.
#[derive(Debug)]
pub enum Access<T> {
    Granted(T),
    /// The session does not hold the role; send the user to `/`.
    RedirectToEntry,
}

impl<T> Access<T> {
    pub fn granted(self) -> Option<T> {
        match self {
            Access::Granted(view) => Some(view),
            Access::RedirectToEntry => None,
        }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, Access::Granted(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct PortalOptions {
    pub policy: RolePolicy,
    /// Seed sample data when an identity first becomes a practitioner.
    pub seed_demo: bool,
}

pub struct Portal {
    db: Db,
    options: PortalOptions,
    state: watch::Sender<SessionState>,
    follower: JoinHandle<()>,
}

/// Session state for `identity`, reading the role cache.
async fn resolve(db: &Db, identity: Option<Identity>) -> SessionState {
    let Some(identity) = identity else {
        return SessionState::Unauthenticated;
    };
    match role::cached_role(db, &identity.id).await {
        Ok(cached) => SessionState::signed_in(identity, cached),
        Err(e) => {
            log::error!("Role lookup failed for {}: {}", identity.id, e);
            SessionState::RoleUnset { identity }
        }
    }
}

async fn follow(db: Db, mut subscription: IdentitySubscription, state: watch::Sender<SessionState>) {
    while let Some(identity) = subscription.changed().await {
        let unchanged = state.borrow().identity() == identity.as_ref();
        if unchanged {
            continue;
        }
        let next = resolve(&db, identity).await;
        state.send_replace(next);
    }
    log::info!("Identity provider closed, portal signed out");
    state.send_replace(SessionState::Unauthenticated);
}

impl Portal {
    /// Start following `provider`. The initial state reflects whoever is
    /// signed in right now.
    pub async fn attach(db: Db, provider: &dyn IdentityProvider, options: PortalOptions) -> Self {
        let subscription = provider.subscribe();
        let initial = resolve(&db, subscription.current()).await;
        let (state, _) = watch::channel(initial);
        let follower = tokio::spawn(follow(db.clone(), subscription, state.clone()));
        Self {
            db,
            options,
            state,
            follower,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver for session state changes.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// One-time role choice for the signed-in identity.
    pub async fn choose_role(&self, role: Role) -> Result<SessionState, AppError> {
        let identity = match self.state() {
            SessionState::Unauthenticated => return Err(AppError::Unauthenticated),
            SessionState::RoleAssigned { role: existing, .. } => {
                return Err(AppError::Conflict(format!("Role already assigned: {existing}")));
            }
            SessionState::RoleUnset { identity } => identity,
        };

        role::assign_role(&self.db, &identity, role, &self.options.policy).await?;
        if role == Role::Practitioner && self.options.seed_demo {
            if let Err(e) = seed::seed_demo_practitioner(&self.db, &identity.id).await {
                log::warn!("Demo seed failed for {}: {}", identity.id, e);
            }
        }

        // Only apply if the same identity is still signed in.
        self.state.send_if_modified(|state| {
            let same = matches!(
                state,
                SessionState::RoleUnset { identity: current } if current.id == identity.id
            );
            if same {
                *state = SessionState::RoleAssigned {
                    identity: identity.clone(),
                    role,
                };
            }
            same
        });
        Ok(self.state())
    }

    pub fn route(&self, path: &str) -> RouteDecision {
        role::route_decision(&self.state.borrow(), path)
    }

    pub fn practitioner(&self) -> Access<PractitionerView> {
        match self.state() {
            SessionState::RoleAssigned {
                identity,
                role: Role::Practitioner,
            } => Access::Granted(PractitionerView::new(self.db.clone(), identity.id)),
            _ => Access::RedirectToEntry,
        }
    }

    pub fn patient(&self) -> Access<PatientView> {
        match self.state() {
            SessionState::RoleAssigned {
                identity,
                role: Role::Patient,
            } => Access::Granted(PatientView::new(self.db.clone(), identity)),
            _ => Access::RedirectToEntry,
        }
    }

    pub fn admin(&self) -> Access<AdminView> {
        match self.state() {
            SessionState::RoleAssigned {
                role: Role::Admin, ..
            } => Access::Granted(AdminView::new(self.db.clone())),
            _ => Access::RedirectToEntry,
        }
    }
}

impl Drop for Portal {
    fn drop(&mut self) {
        self.follower.abort();
    }
}
