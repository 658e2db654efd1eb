pub mod admin_handlers;
pub mod dashboard;
pub mod exchange_handlers;
pub mod patient_handlers;
pub mod protocol_handlers;
pub mod session_handlers;

use actix_session::Session;
use actix_web::web;

use crate::auth::middleware::require_json_content_type;
use crate::auth::session::require_identity;
use crate::db::Db;
use crate::errors::AppError;
use crate::portal::{AdminView, PatientView, PractitionerView};

// Role gating already ran in middleware; these only bind the view to the
// signed-in identity.

fn practitioner_view(db: &web::Data<Db>, session: &Session) -> Result<PractitionerView, AppError> {
    let identity = require_identity(session)?;
    Ok(PractitionerView::new(db.get_ref().clone(), identity.id))
}

fn patient_view(db: &web::Data<Db>, session: &Session) -> Result<PatientView, AppError> {
    let identity = require_identity(session)?;
    Ok(PatientView::new(db.get_ref().clone(), identity))
}

fn admin_view(db: &web::Data<Db>) -> AdminView {
    AdminView::new(db.get_ref().clone())
}

/// Register every route. Role scopes sit under their prefix so the gate
/// middleware can match them by path.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(session_handlers::entry));
    cfg.service(
        web::scope("/session")
            .wrap(actix_web::middleware::from_fn(require_json_content_type))
            .route("/role", web::post().to(session_handlers::choose_role))
            .route("/logout", web::post().to(session_handlers::logout)),
    );
    cfg.service(
        web::scope("/practitioner")
            .wrap(actix_web::middleware::from_fn(require_json_content_type))
            .route("/dashboard", web::get().to(dashboard::practitioner))
            .route("/patients", web::get().to(patient_handlers::list))
            .route("/patients", web::post().to(patient_handlers::create))
            .route("/patients/{id}", web::get().to(patient_handlers::read))
            .route("/patients/{id}", web::put().to(patient_handlers::update))
            .route("/patients/{id}", web::delete().to(patient_handlers::delete))
            .route("/patients/{id}/archive", web::post().to(patient_handlers::archive))
            .route("/protocols", web::get().to(protocol_handlers::list))
            .route("/protocols", web::post().to(protocol_handlers::create))
            .route("/protocols/{id}", web::get().to(protocol_handlers::read))
            .route("/protocols/{id}", web::put().to(protocol_handlers::update))
            .route("/protocols/{id}", web::delete().to(protocol_handlers::delete))
            .route("/protocols/{id}/duplicate", web::post().to(protocol_handlers::duplicate))
            .route("/protocols/{id}/lines", web::post().to(protocol_handlers::add_line))
            .route("/protocols/{id}/lines/{line_id}", web::delete().to(protocol_handlers::remove_line))
            .route("/categories", web::get().to(protocol_handlers::categories))
            .route("/templates", web::get().to(protocol_handlers::templates))
            .route("/supplements", web::get().to(protocol_handlers::supplements))
            .route("/sent", web::get().to(exchange_handlers::outbox))
            .route("/sent", web::post().to(exchange_handlers::send))
            .route("/sent/{id}", web::get().to(exchange_handlers::read_sent)),
    );
    cfg.service(
        web::scope("/patient")
            .wrap(actix_web::middleware::from_fn(require_json_content_type))
            .route("/dashboard", web::get().to(dashboard::patient))
            .route("/protocols", web::get().to(exchange_handlers::inbox))
            .route("/protocols/{id}", web::get().to(exchange_handlers::open))
            .route("/protocols/{id}/respond", web::post().to(exchange_handlers::respond)),
    );
    cfg.service(
        web::scope("/admin")
            .route("/dashboard", web::get().to(dashboard::admin))
            .route("/supplements", web::get().to(admin_handlers::supplements))
            .route("/roles", web::get().to(admin_handlers::roles))
            .route("/audit", web::get().to(admin_handlers::audit)),
    );
}
