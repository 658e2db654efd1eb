use actix_session::Session;
use actix_web::{HttpResponse, web};

use crate::audit;
use crate::auth::role::{self, Role, RolePolicy};
use crate::auth::session::{self, SessionState};
use crate::config::AppConfig;
use crate::db::Db;
use crate::errors::AppError;
use crate::models::seed;
use crate::responses::{ChooseRoleRequest, SessionResponse};

fn available_roles(state: &SessionState, policy: &RolePolicy) -> Vec<Role> {
    match state.identity() {
        Some(identity) => Role::ALL
            .into_iter()
            .filter(|role| policy.allows(identity, *role))
            .collect(),
        None => Vec::new(),
    }
}

/// GET / - Entry page: session state, plus the roles on offer while none is set
pub async fn entry(session: Session, policy: web::Data<RolePolicy>) -> HttpResponse {
    let state = session::load_state(&session);
    let roles = available_roles(&state, &policy);
    HttpResponse::Ok().json(SessionResponse::new(state, roles))
}

/// POST /session/role - One-time role choice for the signed-in identity
pub async fn choose_role(
    db: web::Data<Db>,
    session: Session,
    policy: web::Data<RolePolicy>,
    config: web::Data<AppConfig>,
    body: web::Json<ChooseRoleRequest>,
) -> Result<HttpResponse, AppError> {
    let identity = session::require_identity(&session)?;
    if let Some(existing) = session::get_role(&session) {
        return Err(AppError::Conflict(format!("Role already assigned: {existing}")));
    }

    let role = body.role;
    role::assign_role(&db, &identity, role, &policy).await?;
    session::store_role(&session, role)?;

    if role == Role::Practitioner && config.seed_demo {
        if let Err(e) = seed::seed_demo_practitioner(&db, &identity.id).await {
            log::warn!("Demo seed failed for {}: {}", identity.id, e);
        }
    }

    if let Err(e) = audit::log(
        &db,
        &identity.id,
        "role.assigned",
        "identity",
        &identity.id,
        serde_json::json!({ "role": role.as_str() }),
    )
    .await
    {
        log::warn!("Audit write failed for role.assigned {}: {}", identity.id, e);
    }

    let state = SessionState::RoleAssigned { identity, role };
    Ok(HttpResponse::Ok().json(SessionResponse::new(state, Vec::new())))
}

/// POST /session/logout - Forget the session; the role cache stays
pub async fn logout(session: Session) -> HttpResponse {
    if let Some(identity) = session::get_identity(&session) {
        log::info!("Identity {} signed out", identity.id);
    }
    session.purge();
    HttpResponse::Ok().json(SessionResponse::new(SessionState::Unauthenticated, Vec::new()))
}
