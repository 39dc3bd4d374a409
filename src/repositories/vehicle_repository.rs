use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::Vehicle;
use crate::repositories::db_error;
use crate::utils::errors::AppResult;

/// Búsqueda de vehículos por matrícula
#[async_trait]
pub trait VehicleRepository: Send + Sync {
    async fn find_by_plate(&self, license_plate: &str) -> AppResult<Option<Vehicle>>;

    async fn list(&self) -> AppResult<Vec<Vehicle>>;
}

pub struct PgVehicleRepository {
    pool: PgPool,
}

impl PgVehicleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VehicleRepository for PgVehicleRepository {
    async fn find_by_plate(&self, license_plate: &str) -> AppResult<Option<Vehicle>> {
        sqlx::query_as::<_, Vehicle>(
            "SELECT license_plate, customer_id, vehicle_type, brand, color FROM vehicles WHERE license_plate = $1",
        )
        .bind(license_plate)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, format_args!("finding vehicle {}", license_plate)))
    }

    async fn list(&self) -> AppResult<Vec<Vehicle>> {
        sqlx::query_as::<_, Vehicle>(
            "SELECT license_plate, customer_id, vehicle_type, brand, color FROM vehicles ORDER BY license_plate",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error(e, format_args!("listing vehicles")))
    }
}
