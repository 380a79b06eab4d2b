//! HTTP error handling and response conversion.
//!
//! Every failure is rendered as the standard envelope with HTTP 200; the
//! envelope `code` tells the client whether it was at fault
//! (`PARAMETER_ERROR`), unauthenticated (`AUTH_ERROR`) or hit a server-side
//! problem (`SERVER_ERROR`). Server-side details are logged, never returned.

use super::response::{ApiResponse, ResponseCode};
use crate::domain::shared::errors::DomainError;
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    response::{IntoResponse, Response},
};
use std::fmt;

/// Application-level errors returned from handlers.
#[derive(Debug)]
pub enum AppError {
    /// Referenced entity does not exist.
    NotFound(String),

    /// Malformed request.
    BadRequest(String),

    /// Missing, invalid or revoked credentials, or not the owner.
    Forbidden(String),

    /// Request data failed validation.
    ValidationError(String),

    /// Engagement toggled into the state it is already in.
    Conflict(String),

    /// Database operation failed.
    Database(String),

    /// Storage/file operation failed.
    Storage(String),

    /// Redis operation failed.
    Cache(String),

    /// External service failure.
    ExternalService(String),

    /// Unclassified internal error.
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(msg) => write!(f, "Not found: {}", msg),
            Self::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            Self::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Self::Conflict(msg) => write!(f, "Conflict: {}", msg),
            Self::Database(msg) => write!(f, "Database error: {}", msg),
            Self::Storage(msg) => write!(f, "Storage error: {}", msg),
            Self::Cache(msg) => write!(f, "Cache error: {}", msg),
            Self::ExternalService(msg) => write!(f, "External service error: {}", msg),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl AppError {
    /// Envelope code for this error.
    pub fn code(&self) -> ResponseCode {
        match self {
            Self::NotFound(_) | Self::BadRequest(_) | Self::ValidationError(_) | Self::Conflict(_) => {
                ResponseCode::ParameterError
            }
            Self::Forbidden(_) => ResponseCode::AuthError,
            Self::Database(_)
            | Self::Storage(_)
            | Self::Cache(_)
            | Self::ExternalService(_)
            | Self::Internal(_) => ResponseCode::ServerError,
        }
    }

    /// Get a user-safe error message (without implementation details).
    fn user_message(&self) -> String {
        match self {
            Self::NotFound(msg)
            | Self::BadRequest(msg)
            | Self::ValidationError(msg)
            | Self::Conflict(msg) => msg.clone(),
            Self::Forbidden(msg) => msg.clone(),
            Self::Database(_) => "Database operation failed".into(),
            Self::Storage(_) => "File operation failed".into(),
            Self::Cache(_) => "Cache operation failed".into(),
            Self::ExternalService(_) => "External service unavailable".into(),
            Self::Internal(_) => "Internal server error".into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        match code {
            ResponseCode::ServerError => tracing::error!("error={}", self),
            ResponseCode::AuthError => tracing::debug!("error={}", self),
            _ => tracing::warn!("error={}", self),
        }
        ApiResponse::failure(code, self.user_message()).into_response()
    }
}

// === Domain Error Conversion ===

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::TargetNotFound(_) => AppError::NotFound(err.to_string()),
            DomainError::AlreadyEngaged(_) | DomainError::NotEngaged(_) => {
                AppError::Conflict(err.to_string())
            }
            DomainError::ValidationError(msg) => AppError::ValidationError(msg),
            DomainError::Unauthorized => AppError::Forbidden("Unauthorized".into()),
            DomainError::StorageUnavailable(msg) => {
                tracing::error!(storage_unavailable = %msg);
                AppError::Database(msg)
            }
            DomainError::InfrastructureError(msg) => {
                tracing::error!(infrastructure_error = %msg);
                AppError::Internal(msg)
            }
        }
    }
}

// === Extractor Rejections ===

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::ValidationError(errors.to_string())
    }
}

// === Database Error Conversion ===

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            sqlx::Error::PoolTimedOut => {
                tracing::warn!("Database connection pool exhausted, timing out");
                AppError::Database("Connection pool exhausted".into())
            }
            sqlx::Error::PoolClosed => {
                tracing::error!("Database connection pool closed");
                AppError::Database("Database connection unavailable".into())
            }
            _ => {
                tracing::error!(database_error = %err);
                AppError::Database(err.to_string())
            }
        }
    }
}

// === Redis Error Conversion ===

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        tracing::error!(redis_error = %err, "Redis operation failed");
        AppError::Cache(format!("Redis error: {}", err))
    }
}

// === HTTP Client Error Conversion ===

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            tracing::warn!(reqwest_timeout = %err);
            AppError::ExternalService("Request timeout".into())
        } else if err.is_connect() {
            tracing::warn!(reqwest_connect = %err);
            AppError::ExternalService("Connection failed".into())
        } else {
            tracing::error!(reqwest_error = %err);
            AppError::ExternalService(err.to_string())
        }
    }
}

// === Image Processing Error Conversion ===

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Unsupported(_) => AppError::BadRequest("Unsupported image format".into()),
            image::ImageError::Decoding(_) => AppError::BadRequest("Invalid image data".into()),
            image::ImageError::Limits(_) => AppError::BadRequest("Image exceeds limits".into()),
            _ => {
                tracing::error!(image_error = %err);
                AppError::Storage(err.to_string())
            }
        }
    }
}

// === General Fallback Error Conversion ===

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!(anyhow_error = %err, "Unclassified error with chain");
        err.chain().for_each(|cause| {
            tracing::error!(cause = %cause, "Error source");
        });
        AppError::Internal("Operation failed".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_envelope_codes() {
        let cases = [
            (DomainError::TargetNotFound("post 1".into()), ResponseCode::ParameterError),
            (DomainError::AlreadyEngaged("x".into()), ResponseCode::ParameterError),
            (DomainError::NotEngaged("x".into()), ResponseCode::ParameterError),
            (DomainError::ValidationError("x".into()), ResponseCode::ParameterError),
            (DomainError::Unauthorized, ResponseCode::AuthError),
            (DomainError::StorageUnavailable("x".into()), ResponseCode::ServerError),
            (DomainError::InfrastructureError("x".into()), ResponseCode::ServerError),
        ];
        for (err, code) in cases {
            assert_eq!(AppError::from(err).code(), code);
        }
    }

    #[test]
    fn server_errors_hide_details() {
        let err = AppError::from(DomainError::InfrastructureError("secret dsn".into()));
        assert_eq!(err.user_message(), "Internal server error");
        let err = AppError::from(DomainError::TargetNotFound("post 9".into()));
        assert_eq!(err.user_message(), "post 9 does not exist");
    }

    #[test]
    fn test_error_display() {
        let err = AppError::NotFound("item".into());
        assert_eq!(err.to_string(), "Not found: item");
    }
}
