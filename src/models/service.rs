//! Modelo de Service
//!
//! Oferta con precio (por hora, mensual...). Solo lectura para el asignador.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Service {
    pub id: i64,
    pub name: String,
    pub price: Decimal,
    pub vehicle_type: String,
}
