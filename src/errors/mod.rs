//! Error handling module for the staff service.
//!
//! Provides one error type shared by the store and the RPC layer, with the
//! mapping to gRPC status codes applied once at the RPC boundary.

use thiserror::Error;
use tonic::{Code, Status};

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Token missing or rejected by the verifier
    #[error("authentication failed: {0}")]
    Unauthenticated(String),
    /// Request carried no staff member record
    #[error("staff member is nil")]
    NilRecord,
    /// Staff member ID is empty
    #[error("staff member ID is empty")]
    EmptyId,
    /// Malformed request
    #[error("validation error: {0}")]
    Validation(String),
    /// No record with the given ID
    #[error("staff member {0} not found")]
    NotFound(String),
    /// Uniqueness constraint violated
    #[error("conflict: {0}")]
    Conflict(String),
    /// Any other backend failure
    #[error("database error: {0}")]
    Database(sqlx::Error),
    /// Invalid configuration at startup
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result alias used throughout the service.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Get the gRPC status code for this error.
    pub fn code(&self) -> Code {
        match self {
            AppError::Unauthenticated(_) => Code::Unauthenticated,
            AppError::NilRecord => Code::InvalidArgument,
            AppError::EmptyId => Code::InvalidArgument,
            AppError::Validation(_) => Code::InvalidArgument,
            AppError::NotFound(_) => Code::NotFound,
            AppError::Conflict(_) => Code::AlreadyExists,
            AppError::Database(_) => Code::Internal,
            AppError::Config(_) => Code::Internal,
        }
    }

    /// Get the message sent to the client.
    ///
    /// Backend and configuration failures are reported opaquely; the details
    /// only go to the log.
    pub fn client_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Config(_) => {
                "internal error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let field = db_err
                    .constraint()
                    .map(constraint_field)
                    .unwrap_or("unique field");
                tracing::debug!("Unique violation: {:?}", db_err);
                return AppError::Conflict(format!("{} already exists", field));
            }
        }

        tracing::error!("Database error: {:?}", err);
        AppError::Database(err)
    }
}

impl From<AppError> for Status {
    fn from(err: AppError) -> Self {
        Status::new(err.code(), err.client_message())
    }
}

/// Map a `staff_member` constraint name to the column it guards.
fn constraint_field(constraint: &str) -> &'static str {
    match constraint {
        "staff_member_pkey" => "staff_id",
        "staff_member_email_key" => "email",
        "staff_member_phone_number_key" => "phone_number",
        _ => "unique field",
    }
}
