use actix_session::Session;
use actix_web::{HttpResponse, web};

use crate::db::Db;
use crate::errors::AppError;

/// GET /practitioner/dashboard
pub async fn practitioner(db: web::Data<Db>, session: Session) -> Result<HttpResponse, AppError> {
    let view = super::practitioner_view(&db, &session)?;
    Ok(HttpResponse::Ok().json(view.dashboard().await?))
}

/// GET /patient/dashboard
pub async fn patient(db: web::Data<Db>, session: Session) -> Result<HttpResponse, AppError> {
    let view = super::patient_view(&db, &session)?;
    Ok(HttpResponse::Ok().json(view.dashboard().await?))
}

/// GET /admin/dashboard
pub async fn admin(db: web::Data<Db>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(super::admin_view(&db).dashboard().await?))
}
