use actix_session::Session;
use actix_web::{HttpResponse, web};

use crate::db::Db;
use crate::errors::AppError;
use crate::models::sent_protocol::{RespondRequest, SendRequest, SentFilter};
use crate::responses::ListResponse;

/// GET /practitioner/sent - Outbox, newest first
/// Query params: search (patient or protocol), status
pub async fn outbox(
    db: web::Data<Db>,
    session: Session,
    query: web::Query<SentFilter>,
) -> Result<HttpResponse, AppError> {
    let view = super::practitioner_view(&db, &session)?;
    Ok(HttpResponse::Ok().json(ListResponse::from(view.outbox(&query).await?)))
}

/// POST /practitioner/sent - Send a protocol to a patient
pub async fn send(
    db: web::Data<Db>,
    session: Session,
    body: web::Json<SendRequest>,
) -> Result<HttpResponse, AppError> {
    let view = super::practitioner_view(&db, &session)?;
    let record = view.send(&body).await?;
    Ok(HttpResponse::Created().json(record))
}

/// GET /practitioner/sent/{id}
pub async fn read_sent(
    db: web::Data<Db>,
    session: Session,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let view = super::practitioner_view(&db, &session)?;
    Ok(HttpResponse::Ok().json(view.find_sent(&path).await?))
}

/// GET /patient/protocols - Protocols received, newest first
pub async fn inbox(db: web::Data<Db>, session: Session) -> Result<HttpResponse, AppError> {
    let view = super::patient_view(&db, &session)?;
    Ok(HttpResponse::Ok().json(ListResponse::from(view.inbox().await?)))
}

/// GET /patient/protocols/{id} - Open a protocol; the first open marks it viewed
pub async fn open(
    db: web::Data<Db>,
    session: Session,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let view = super::patient_view(&db, &session)?;
    let result = view.open(&path).await?;
    Ok(HttpResponse::Ok().json(result))
}

/// POST /patient/protocols/{id}/respond - Accept or decline
pub async fn respond(
    db: web::Data<Db>,
    session: Session,
    path: web::Path<String>,
    body: web::Json<RespondRequest>,
) -> Result<HttpResponse, AppError> {
    let view = super::patient_view(&db, &session)?;
    let result = view
        .respond(&path, body.decision, body.notes.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(result))
}
