use actix_session::Session;
use actix_web::{HttpResponse, web};

use crate::db::Db;
use crate::errors::AppError;
use crate::models::patient::{PatientFilter, PatientForm};
use crate::responses::ListResponse;

/// GET /practitioner/patients - List own patients
/// Query params: search (name or email), status
pub async fn list(
    db: web::Data<Db>,
    session: Session,
    query: web::Query<PatientFilter>,
) -> Result<HttpResponse, AppError> {
    let view = super::practitioner_view(&db, &session)?;
    let patients = view.list_patients(&query).await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(patients)))
}

/// GET /practitioner/patients/{id}
pub async fn read(
    db: web::Data<Db>,
    session: Session,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let view = super::practitioner_view(&db, &session)?;
    let patient = view.find_patient(&path).await?;
    Ok(HttpResponse::Ok().json(patient))
}

/// POST /practitioner/patients - Create a patient
pub async fn create(
    db: web::Data<Db>,
    session: Session,
    body: web::Json<PatientForm>,
) -> Result<HttpResponse, AppError> {
    let view = super::practitioner_view(&db, &session)?;
    let mut form = body.into_inner();
    form.id = None;
    let patient = view.upsert_patient(&form).await?;
    Ok(HttpResponse::Created().json(patient))
}

/// PUT /practitioner/patients/{id} - Replace a patient's details
pub async fn update(
    db: web::Data<Db>,
    session: Session,
    path: web::Path<String>,
    body: web::Json<PatientForm>,
) -> Result<HttpResponse, AppError> {
    let view = super::practitioner_view(&db, &session)?;
    let mut form = body.into_inner();
    form.id = Some(path.into_inner());
    let patient = view.upsert_patient(&form).await?;
    Ok(HttpResponse::Ok().json(patient))
}

/// POST /practitioner/patients/{id}/archive
pub async fn archive(
    db: web::Data<Db>,
    session: Session,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let view = super::practitioner_view(&db, &session)?;
    let patient = view.archive_patient(&path).await?;
    Ok(HttpResponse::Ok().json(patient))
}

/// DELETE /practitioner/patients/{id}
pub async fn delete(
    db: web::Data<Db>,
    session: Session,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let view = super::practitioner_view(&db, &session)?;
    view.delete_patient(&path).await?;
    Ok(HttpResponse::NoContent().finish())
}
