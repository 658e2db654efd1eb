use actix_web::{HttpResponse, web};

use crate::db::Db;
use crate::errors::AppError;
use crate::responses::{LimitQuery, ListResponse, SearchQuery};

const DEFAULT_AUDIT_LIMIT: usize = 50;
const MAX_AUDIT_LIMIT: usize = 500;

/// GET /admin/supplements - Full catalog, inactive items included
pub async fn supplements(db: web::Data<Db>, query: web::Query<SearchQuery>) -> HttpResponse {
    let items = super::admin_view(&db).supplements(query.search.as_deref());
    HttpResponse::Ok().json(ListResponse::from(items))
}

/// GET /admin/roles - Every role assignment made so far
pub async fn roles(db: web::Data<Db>) -> Result<HttpResponse, AppError> {
    let assignments = super::admin_view(&db).role_assignments().await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(assignments)))
}

/// GET /admin/audit - Most recent audit entries
/// Query params: limit (default 50, max 500)
pub async fn audit(db: web::Data<Db>, query: web::Query<LimitQuery>) -> Result<HttpResponse, AppError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_AUDIT_LIMIT)
        .clamp(1, MAX_AUDIT_LIMIT);
    let entries = super::admin_view(&db).recent_audit(limit).await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(entries)))
}
