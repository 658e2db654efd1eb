use actix_session::Session;
use actix_web::{HttpResponse, web};

use crate::db::Db;
use crate::errors::AppError;
use crate::models::protocol::{ProtocolFilter, ProtocolForm, ProtocolLineForm};
use crate::models::supplement;
use crate::responses::{ListResponse, SearchQuery};

/// GET /practitioner/protocols - List own protocols
/// Query params: search, status, category
pub async fn list(
    db: web::Data<Db>,
    session: Session,
    query: web::Query<ProtocolFilter>,
) -> Result<HttpResponse, AppError> {
    let view = super::practitioner_view(&db, &session)?;
    let protocols = view.list_protocols(&query).await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(protocols)))
}

/// GET /practitioner/templates - Protocols flagged as reusable templates
pub async fn templates(db: web::Data<Db>, session: Session) -> Result<HttpResponse, AppError> {
    let view = super::practitioner_view(&db, &session)?;
    Ok(HttpResponse::Ok().json(ListResponse::from(view.list_templates().await?)))
}

/// GET /practitioner/categories - Protocol categories in use
pub async fn categories(db: web::Data<Db>, session: Session) -> Result<HttpResponse, AppError> {
    let view = super::practitioner_view(&db, &session)?;
    Ok(HttpResponse::Ok().json(view.categories().await?))
}

/// GET /practitioner/supplements - Active catalog items
pub async fn supplements(query: web::Query<SearchQuery>) -> HttpResponse {
    let items = supplement::search(query.search.as_deref().unwrap_or(""));
    HttpResponse::Ok().json(ListResponse::from(items))
}

/// GET /practitioner/protocols/{id}
pub async fn read(
    db: web::Data<Db>,
    session: Session,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let view = super::practitioner_view(&db, &session)?;
    Ok(HttpResponse::Ok().json(view.find_protocol(&path).await?))
}

/// POST /practitioner/protocols - Create a protocol with its lines
pub async fn create(
    db: web::Data<Db>,
    session: Session,
    body: web::Json<ProtocolForm>,
) -> Result<HttpResponse, AppError> {
    let view = super::practitioner_view(&db, &session)?;
    let mut form = body.into_inner();
    form.id = None;
    let protocol = view.upsert_protocol(&form).await?;
    Ok(HttpResponse::Created().json(protocol))
}

/// PUT /practitioner/protocols/{id} - Replace a protocol, lines included
pub async fn update(
    db: web::Data<Db>,
    session: Session,
    path: web::Path<String>,
    body: web::Json<ProtocolForm>,
) -> Result<HttpResponse, AppError> {
    let view = super::practitioner_view(&db, &session)?;
    let mut form = body.into_inner();
    form.id = Some(path.into_inner());
    Ok(HttpResponse::Ok().json(view.upsert_protocol(&form).await?))
}

/// DELETE /practitioner/protocols/{id}
pub async fn delete(
    db: web::Data<Db>,
    session: Session,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let view = super::practitioner_view(&db, &session)?;
    view.delete_protocol(&path).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /practitioner/protocols/{id}/duplicate - Copy as a new draft
pub async fn duplicate(
    db: web::Data<Db>,
    session: Session,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let view = super::practitioner_view(&db, &session)?;
    Ok(HttpResponse::Created().json(view.duplicate_protocol(&path).await?))
}

/// POST /practitioner/protocols/{id}/lines - Append a supplement line
pub async fn add_line(
    db: web::Data<Db>,
    session: Session,
    path: web::Path<String>,
    body: web::Json<ProtocolLineForm>,
) -> Result<HttpResponse, AppError> {
    let view = super::practitioner_view(&db, &session)?;
    Ok(HttpResponse::Ok().json(view.add_line(&path, &body).await?))
}

/// DELETE /practitioner/protocols/{id}/lines/{line_id}
pub async fn remove_line(
    db: web::Data<Db>,
    session: Session,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let view = super::practitioner_view(&db, &session)?;
    let (protocol_id, line_id) = path.into_inner();
    Ok(HttpResponse::Ok().json(view.remove_line(&protocol_id, &line_id).await?))
}
