//! Modelo de Vehicle
//!
//! Mapea la tabla `vehicles`; la matrícula es la clave natural.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Vehicle principal - mapea exactamente a la tabla vehicles
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Vehicle {
    pub license_plate: String,
    pub customer_id: Option<i64>,
    pub vehicle_type: String,
    pub brand: Option<String>,
    pub color: Option<String>,
}

/// Normalizar una matrícula para usarla como clave
pub fn normalize_license_plate(value: &str) -> String {
    value.trim().to_uppercase()
}
