use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::{NewParkingSpot, ParkingSpot, SpotDetails, SpotState, SpotStatus};
use crate::repositories::db_error;
use crate::utils::errors::{not_found_error, AppError, AppResult};

const SPOT_COLUMNS: &str = "id, spot_type, status, park_id, license_plate, start_time, end_time";

/// Almacén de plazas de estacionamiento
#[async_trait]
pub trait ParkingSpotRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<ParkingSpot>>;

    async fn list(&self) -> AppResult<Vec<ParkingSpot>>;

    /// Primera plaza `Available` (menor id) del tipo indicado, sin distinguir mayúsculas.
    async fn find_available_by_type(&self, spot_type: &str) -> AppResult<Option<ParkingSpot>>;

    async fn create(&self, spot: NewParkingSpot) -> AppResult<ParkingSpot>;

    /// Cambia tipo/parque. `NotFound` si la plaza no existe.
    async fn update(&self, id: i64, details: SpotDetails) -> AppResult<ParkingSpot>;

    /// Compare-and-swap de estado: solo aplica `to` si el status actual está en `from`.
    ///
    /// `NotFound` si la plaza no existe, `Conflict` si el status no coincide.
    async fn transition(&self, id: i64, from: &[SpotStatus], to: SpotState) -> AppResult<ParkingSpot>;

    /// `Conflict` si la plaza está ocupada o reservada.
    async fn delete(&self, id: i64) -> AppResult<()>;
}

pub struct PgParkingSpotRepository {
    pool: PgPool,
}

impl PgParkingSpotRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: i64) -> AppResult<bool> {
        let result: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM parking_spots WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error(e, format_args!("checking parking spot {}", id)))?;
        Ok(result.0)
    }
}

#[async_trait]
impl ParkingSpotRepository for PgParkingSpotRepository {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<ParkingSpot>> {
        sqlx::query_as::<_, ParkingSpot>(&format!(
            "SELECT {} FROM parking_spots WHERE id = $1",
            SPOT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, format_args!("finding parking spot {}", id)))
    }

    async fn list(&self) -> AppResult<Vec<ParkingSpot>> {
        sqlx::query_as::<_, ParkingSpot>(&format!(
            "SELECT {} FROM parking_spots ORDER BY id",
            SPOT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error(e, format_args!("listing parking spots")))
    }

    async fn find_available_by_type(&self, spot_type: &str) -> AppResult<Option<ParkingSpot>> {
        sqlx::query_as::<_, ParkingSpot>(&format!(
            r#"
            SELECT {} FROM parking_spots
            WHERE LOWER(spot_type) = LOWER($1) AND status = 'Available'
            ORDER BY id
            LIMIT 1
            "#,
            SPOT_COLUMNS
        ))
        .bind(spot_type.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, format_args!("finding available {} spot", spot_type)))
    }

    async fn create(&self, spot: NewParkingSpot) -> AppResult<ParkingSpot> {
        let occupant = spot.state.occupant();

        sqlx::query_as::<_, ParkingSpot>(&format!(
            r#"
            INSERT INTO parking_spots (spot_type, status, park_id, license_plate, start_time, end_time)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            SPOT_COLUMNS
        ))
        .bind(&spot.spot_type)
        .bind(spot.state.status())
        .bind(spot.park_id)
        .bind(occupant.map(|o| o.license_plate.clone()))
        .bind(occupant.map(|o| o.start_time))
        .bind(occupant.and_then(|o| o.end_time))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error(e, format_args!("creating parking spot in park {}", spot.park_id)))
    }

    async fn update(&self, id: i64, details: SpotDetails) -> AppResult<ParkingSpot> {
        sqlx::query_as::<_, ParkingSpot>(&format!(
            r#"
            UPDATE parking_spots
            SET spot_type = COALESCE($2, spot_type), park_id = COALESCE($3, park_id)
            WHERE id = $1
            RETURNING {}
            "#,
            SPOT_COLUMNS
        ))
        .bind(id)
        .bind(details.spot_type)
        .bind(details.park_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, format_args!("updating parking spot {}", id)))?
        .ok_or_else(|| not_found_error("parking spot", id))
    }

    async fn transition(&self, id: i64, from: &[SpotStatus], to: SpotState) -> AppResult<ParkingSpot> {
        let expected: Vec<String> = from.iter().map(|s| s.as_str().to_string()).collect();
        let occupant = to.occupant();

        let updated = sqlx::query_as::<_, ParkingSpot>(&format!(
            r#"
            UPDATE parking_spots
            SET status = $2, license_plate = $3, start_time = $4, end_time = $5
            WHERE id = $1 AND status::text = ANY($6)
            RETURNING {}
            "#,
            SPOT_COLUMNS
        ))
        .bind(id)
        .bind(to.status())
        .bind(occupant.map(|o| o.license_plate.clone()))
        .bind(occupant.map(|o| o.start_time))
        .bind(occupant.and_then(|o| o.end_time))
        .bind(&expected)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, format_args!("moving parking spot {} to {}", id, to.status())))?;

        match updated {
            Some(spot) => Ok(spot),
            None if self.exists(id).await? => Err(AppError::Conflict(format!(
                "spot unavailable: parking spot {} is not in status {}",
                id,
                expected.join("/")
            ))),
            None => Err(not_found_error("parking spot", id)),
        }
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query(
            "DELETE FROM parking_spots WHERE id = $1 AND status NOT IN ('Occupied', 'Reserved')",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error(e, format_args!("deleting parking spot {}", id)))?;

        if result.rows_affected() == 0 {
            if self.exists(id).await? {
                return Err(AppError::Conflict(format!(
                    "parking spot {} is occupied or reserved",
                    id
                )));
            }
            return Err(not_found_error("parking spot", id));
        }

        Ok(())
    }
}
