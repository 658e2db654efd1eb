use actix_session::SessionExt;
use actix_web::{
    Error, HttpResponse,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web,
};

use super::gateway::{Gateway, GatewayIdentity};
use super::rate_limit::RateLimiter;
use super::role::{self, RouteDecision};
use super::session;
use crate::db::Db;
use crate::errors::AppError;

/// Middleware function that binds the gateway identity to the session and
/// loads the identity's cached role once per session.
pub async fn identify(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let ip = req
        .peer_addr()
        .map(|addr| addr.ip())
        .unwrap_or_else(|| std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED));

    let gateway = req.app_data::<web::Data<Gateway>>().cloned();
    let limiter = req.app_data::<web::Data<RateLimiter>>().cloned();
    let db = req.app_data::<web::Data<Db>>().cloned();

    if let Some(limiter) = &limiter {
        if limiter.is_blocked(ip) {
            let response = HttpResponse::TooManyRequests().finish();
            return Ok(req.into_response(response).map_into_right_body());
        }
    }

    let session = req.get_session();
    if let Some(gateway) = &gateway {
        match gateway.read(req.headers()) {
            GatewayIdentity::Absent => {}
            GatewayIdentity::Trusted(identity) => {
                session::store_identity(&session, &identity)?;
                if let Some(limiter) = &limiter {
                    limiter.clear(ip);
                }
            }
            GatewayIdentity::Rejected => {
                log::warn!("Rejected gateway identity from {ip}");
                if let Some(limiter) = &limiter {
                    limiter.record_failure(ip);
                }
            }
        }
    }

    if let (Some(identity), None, Some(db)) = (
        session::get_identity(&session),
        session::get_role(&session),
        &db,
    ) {
        if let Some(role) = role::cached_role(db, &identity.id)
            .await
            .map_err(AppError::from)?
        {
            session::store_role(&session, role)?;
        }
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}

/// Middleware function that sends requests for another role's routes back
/// to the entry page.
pub async fn gate_routes(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let state = session::load_state(&req.get_session());

    if role::route_decision(&state, req.path()) == RouteDecision::RedirectToEntry {
        let response = HttpResponse::SeeOther()
            .insert_header(("Location", "/"))
            .finish();
        return Ok(req.into_response(response).map_into_right_body());
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}

/// CSRF protection for mutation endpoints.
///
/// Rejects POST/PUT/DELETE requests that don't have Content-Type: application/json.
/// Browsers cannot send cross-origin JSON with cookies via simple form POST,
/// so the Content-Type check acts as a CSRF guard without requiring tokens.
pub async fn require_json_content_type(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let method = req.method().clone();

    if method == actix_web::http::Method::POST
        || method == actix_web::http::Method::PUT
        || method == actix_web::http::Method::DELETE
    {
        let content_type = req
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if !content_type.starts_with("application/json") {
            let body = serde_json::json!({
                "error": "Content-Type must be application/json for mutation requests"
            });
            let response = HttpResponse::BadRequest().json(body);
            return Ok(req.into_response(response).map_into_right_body());
        }
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}
