//! Middleware del sistema
//!
//! Autenticación JWT, CORS y conversión de timeouts.

pub mod auth;
pub mod cors;
pub mod timeout;

pub use auth::*;
pub use cors::*;
pub use timeout::*;
