use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::{App, HttpServer, cookie::Key, middleware, web};

use healthscript::auth::gateway::Gateway;
use healthscript::auth::rate_limit::RateLimiter;
use healthscript::config::AppConfig;
use healthscript::{audit, auth, db, handlers};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let config = AppConfig::from_env();

    let db = db::init_store(&config)
        .await
        .map_err(|e| std::io::Error::other(format!("Failed to open store: {e}")))?;

    // Clean up old audit entries based on retention policy
    if let Err(e) = audit::cleanup_old_entries(&db, config.audit_retention_days).await {
        log::error!("Audit cleanup failed: {e}");
    }
    audit::spawn_cleanup(db.clone(), config.audit_retention_days);

    // Session encryption key, from SESSION_KEY for sessions that survive restarts
    let secret_key = match &config.session_key {
        Some(val) if val.len() >= 64 => {
            log::info!("Using SESSION_KEY from environment");
            Key::from(val.as_bytes())
        }
        Some(val) => {
            log::warn!("SESSION_KEY too short ({} bytes, need 64+), generating random key", val.len());
            Key::generate()
        }
        None => {
            log::warn!("No SESSION_KEY set, generating random key (sessions lost on restart)");
            Key::generate()
        }
    };

    if config.gateway_secret.is_none() {
        log::warn!("No GATEWAY_SECRET set, identity headers are trusted from any client");
    }
    let gateway = Gateway::new(config.gateway_secret.clone());
    let limiter = RateLimiter::new();
    let policy = config.role_policy();
    let bind_addr = config.bind_addr.clone();

    log::info!("Starting server at http://{bind_addr}");

    HttpServer::new(move || {
        let session_mw = SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
            .cookie_secure(false)
            .cookie_http_only(true)
            .build();

        App::new()
            .wrap(actix_web::middleware::from_fn(auth::middleware::gate_routes))
            .wrap(actix_web::middleware::from_fn(auth::middleware::identify))
            .wrap(session_mw)
            .wrap(middleware::Logger::default())
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::new(gateway.clone()))
            .app_data(web::Data::new(limiter.clone()))
            .app_data(web::Data::new(policy.clone()))
            .app_data(web::Data::new(config.clone()))
            .configure(handlers::configure)
    })
    .bind(bind_addr)?
    .run()
    .await
}
