//! Sistema de manejo de errores
//!
//! Este módulo define todos los tipos de errores del sistema
//! y su conversión a respuestas HTTP apropiadas.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Validation error: {0}")]
    InvalidFields(#[from] validator::ValidationErrors),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Almacenamiento inalcanzable o timeout; la petición completa puede reintentarse
    #[error("Transient error: {0}")]
    Transient(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut => AppError::Transient("database pool timed out".to_string()),
            sqlx::Error::PoolClosed => AppError::Transient("database pool closed".to_string()),
            sqlx::Error::Io(e) => AppError::Transient(format!("database unreachable: {}", e)),
            // 22008: datetime_field_overflow
            sqlx::Error::Database(e) if e.code().as_deref() == Some("22008") => {
                AppError::Validation("timestamp out of range".to_string())
            }
            other => AppError::Database(other),
        }
    }
}

impl AppError {
    /// Código estable expuesto al cliente
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) | AppError::InvalidFields(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Transient(_) => "TRANSIENT_ERROR",
            AppError::Database(_) => "DB_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidFields(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Transient(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Transient(_))
    }
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    code: &'static str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    retryable: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let retryable = self.is_retryable();

        let (error, message, details) = match self {
            AppError::Validation(msg) => {
                tracing::warn!("Validation error: {}", msg);
                ("Validation Error", msg, None)
            }
            AppError::InvalidFields(e) => {
                tracing::warn!("Validation error: {}", e);
                (
                    "Validation Error",
                    "The provided data is invalid".to_string(),
                    Some(json!(e)),
                )
            }
            AppError::NotFound(msg) => {
                tracing::warn!("Resource not found: {}", msg);
                ("Not Found", msg, None)
            }
            AppError::Conflict(msg) => {
                tracing::warn!("Conflict: {}", msg);
                ("Conflict", msg, None)
            }
            AppError::Transient(msg) => {
                tracing::error!("Transient error: {}", msg);
                (
                    "Service Temporarily Unavailable",
                    "The request could not be completed, please retry".to_string(),
                    Some(json!({ "transient_error": msg })),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    "Database Error",
                    "An error occurred while accessing the database".to_string(),
                    None,
                )
            }
            AppError::Unauthorized(msg) => {
                tracing::warn!("Unauthorized access: {}", msg);
                ("Unauthorized", msg, None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    "Internal Server Error",
                    "An unexpected error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            message,
            details,
            code,
            retryable,
        };

        (status, Json(body)).into_response()
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Función helper para crear errores de campos requeridos
pub fn missing_fields_error(fields: &[&str]) -> AppError {
    AppError::Validation(format!("Missing required fields: {}", fields.join(", ")))
}

/// Función helper para crear errores de recurso no encontrado
pub fn not_found_error(resource: &str, id: impl std::fmt::Display) -> AppError {
    AppError::NotFound(format!("{} '{}' not found", resource, id))
}

/// Función helper para crear errores de plaza no disponible
pub fn spot_unavailable_error(spot_id: i64) -> AppError {
    AppError::Conflict(format!("spot unavailable: parking spot {} is not available", spot_id))
}
