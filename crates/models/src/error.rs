use std::fmt::Display;

use thiserror::Error;

/// Every failure a marketplace operation can report to its caller.
#[derive(Debug, Error)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("login required")]
    LoginRequired,

    #[error("payment declined: {0}")]
    PaymentDeclined(String),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn not_found(entity: &'static str, id: impl Display) -> Self {
        Error::NotFound { entity, id: id.to_string() }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::LoginRequired => 401,
            Error::PaymentDeclined(_) => 402,
            Error::NotFound { .. } => 404,
            Error::Conflict(_) | Error::InsufficientStock { .. } => 409,
            Error::BackendUnavailable(_) => 503,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::Conflict(_) => "CONFLICT",
            Error::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            Error::NotFound { .. } => "NOT_FOUND",
            Error::LoginRequired => "LOGIN_REQUIRED",
            Error::PaymentDeclined(_) => "PAYMENT_DECLINED",
            Error::BackendUnavailable(_) => "BACKEND_UNAVAILABLE",
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Error::Conflict(db.message().to_string())
            }
            _ => Error::BackendUnavailable(err.to_string()),
        }
    }
}
