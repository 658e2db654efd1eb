use actix_web::{HttpResponse, ResponseError};
use std::fmt;

use crate::responses::ApiErrorResponse;
use crate::store::StoreError;

#[derive(Debug)]
pub enum AppError {
    /// Required fields missing or malformed. Nothing was written.
    Validation(Vec<String>),
    /// Referenced record does not exist under the caller's scope.
    NotFound,
    Conflict(String),
    Store(StoreError),
    Session(String),
    Unauthenticated,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(errors) => write!(f, "Validation failed: {}", errors.join("; ")),
            AppError::NotFound => write!(f, "Not found"),
            AppError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            AppError::Store(e) => write!(f, "Persistence error: {e}"),
            AppError::Session(e) => write!(f, "Session error: {e}"),
            AppError::Unauthenticated => write!(f, "Not signed in"),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Collect validator messages; `Ok` when there are none.
    pub fn check(errors: Vec<String>) -> Result<(), AppError> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Validation(errors) => HttpResponse::BadRequest().json(ApiErrorResponse {
                error: "Validation failed".to_string(),
                details: Some(errors.join("; ")),
            }),
            AppError::NotFound => HttpResponse::NotFound().json(ApiErrorResponse {
                error: "Not found".to_string(),
                details: None,
            }),
            AppError::Conflict(msg) => HttpResponse::Conflict().json(ApiErrorResponse {
                error: "Conflict".to_string(),
                details: Some(msg.clone()),
            }),
            AppError::Unauthenticated => HttpResponse::Unauthorized().json(ApiErrorResponse {
                error: "Not signed in".to_string(),
                details: None,
            }),
            AppError::Store(e) if e.is_transient() => {
                log::error!("{self}");
                HttpResponse::ServiceUnavailable().json(ApiErrorResponse {
                    error: "Storage temporarily unavailable".to_string(),
                    details: None,
                })
            }
            _ => {
                log::error!("{self}");
                HttpResponse::InternalServerError().json(ApiErrorResponse {
                    error: "Internal Server Error".to_string(),
                    details: None,
                })
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Store(e)
    }
}

impl From<actix_session::SessionInsertError> for AppError {
    fn from(e: actix_session::SessionInsertError) -> Self {
        AppError::Session(e.to_string())
    }
}

impl From<actix_session::SessionGetError> for AppError {
    fn from(e: actix_session::SessionGetError) -> Self {
        AppError::Session(e.to_string())
    }
}
