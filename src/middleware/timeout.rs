//! Timeout por petición
//!
//! `TimeoutLayer` corta la petición; aquí se traduce a un error transitorio
//! para que el cliente sepa que puede reintentar.

use tower::BoxError;

use crate::utils::errors::AppError;

pub async fn handle_timeout_error(error: BoxError) -> AppError {
    if error.is::<tower::timeout::error::Elapsed>() {
        AppError::Transient("request timed out".to_string())
    } else {
        AppError::Internal(format!("unhandled middleware error: {}", error))
    }
}
