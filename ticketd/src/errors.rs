use crate::db::errors::DbError;
use crate::types::{Operation, Permission};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but not provided
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// User lacks required permissions for the operation
    #[error("Insufficient permissions to {action} {resource}")]
    InsufficientPermissions {
        required: Permission,
        action: Operation,
        resource: String,
    },

    /// Caller is not the owner of the booking being cancelled
    #[error("{message}")]
    Forbidden { message: String },

    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Event creation attempted with a start time that has already elapsed
    #[error("{message}")]
    PastDate { message: String },

    /// Booking operation attempted against an event whose start time has
    /// elapsed; never retried
    #[error("{message}")]
    PastEvent { message: String },

    /// Requested quantity exceeds the currently available spots; `remaining`
    /// is carried so the caller can adjust and resubmit
    #[error("Only {remaining} spots available")]
    InsufficientCapacity { remaining: i64 },

    /// Administrative capacity decrease would underflow confirmed bookings
    #[error("Capacity {requested} is below the {confirmed} tickets already confirmed")]
    InvalidCapacity { requested: i32, confirmed: i64 },

    /// Idempotency guard on cancellation: a cancelled booking stays cancelled
    #[error("Booking is already cancelled")]
    AlreadyCancelled,

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::InsufficientPermissions { .. } | Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::BadRequest { .. }
            | Error::PastDate { .. }
            | Error::PastEvent { .. }
            | Error::InsufficientCapacity { .. }
            | Error::InvalidCapacity { .. }
            | Error::AlreadyCancelled => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                // Surfaces only after the bounded admission retries are spent
                DbError::TransientConflict { .. } => StatusCode::SERVICE_UNAVAILABLE,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "Authentication required".to_string()),
            Error::InsufficientPermissions { action, resource, .. } => {
                format!("Insufficient permissions to {action} {resource}")
            }
            Error::Forbidden { message } | Error::BadRequest { message } => message.clone(),
            Error::PastDate { message } | Error::PastEvent { message } => message.clone(),
            Error::NotFound { resource, id } => {
                format!("{resource} with ID {id} not found")
            }
            Error::InsufficientCapacity { remaining } => format!("Only {remaining} spots available"),
            Error::InvalidCapacity { requested, confirmed } => {
                format!("Capacity {requested} is below the {confirmed} tickets already confirmed")
            }
            Error::AlreadyCancelled => "Booking is already cancelled".to_string(),
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation { constraint, table, .. } => match (table.as_deref(), constraint.as_deref()) {
                    (Some("users"), Some(c)) if c.contains("email") => {
                        "An account with this email address already exists".to_string()
                    }
                    _ => "Resource already exists".to_string(),
                },
                DbError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                DbError::CheckViolation { .. } => "Invalid data provided".to_string(),
                DbError::TransientConflict { .. } => "The request conflicted with concurrent activity, please retry".to_string(),
                DbError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Unauthenticated { .. } | Error::InsufficientPermissions { .. } | Error::Forbidden { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            _ => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();

        match &self {
            // Capacity rejections carry the exact remaining count so clients
            // can adjust and resubmit
            Error::InsufficientCapacity { remaining } => {
                use serde_json::json;
                let body = json!({
                    "message": self.user_message(),
                    "remaining": remaining,
                });
                (status, axum::response::Json(body)).into_response()
            }
            Error::InvalidCapacity { requested, confirmed } => {
                use serde_json::json;
                let body = json!({
                    "message": self.user_message(),
                    "requested": requested,
                    "confirmed": confirmed,
                });
                (status, axum::response::Json(body)).into_response()
            }
            _ => {
                let user_message = self.user_message();
                (status, user_message).into_response()
            }
        }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
