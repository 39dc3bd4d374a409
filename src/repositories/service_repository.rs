use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::Service;
use crate::repositories::db_error;
use crate::utils::errors::AppResult;

/// Catálogo de servicios (solo lectura)
#[async_trait]
pub trait ServiceRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Service>>;

    async fn list(&self) -> AppResult<Vec<Service>>;
}

pub struct PgServiceRepository {
    pool: PgPool,
}

impl PgServiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ServiceRepository for PgServiceRepository {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Service>> {
        sqlx::query_as::<_, Service>("SELECT id, name, price, vehicle_type FROM services WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error(e, format_args!("finding service {}", id)))
    }

    async fn list(&self) -> AppResult<Vec<Service>> {
        sqlx::query_as::<_, Service>("SELECT id, name, price, vehicle_type FROM services ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error(e, format_args!("listing services")))
    }
}
