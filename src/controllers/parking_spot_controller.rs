use chrono::Utc;
use tracing::info;

use crate::dto::parking_spot_dto::{
    AvailableSpotQuery, CreateParkingSpotRequest, SpotStatusChange, SpotSummaryResponse, UpdateParkingSpotRequest,
};
use crate::dto::ApiResponse;
use crate::middleware::AuthenticatedUser;
use crate::models::ParkingSpot;
use crate::repositories::Repositories;
use crate::services::{summarize_spots, TicketAllocator};
use crate::state::AppState;
use crate::utils::errors::{not_found_error, AppResult};

pub struct ParkingSpotController {
    repositories: Repositories,
    allocator: TicketAllocator,
}

impl ParkingSpotController {
    pub fn new(state: &AppState) -> Self {
        Self {
            repositories: state.repositories.clone(),
            allocator: state.allocator(),
        }
    }

    pub async fn list(&self) -> AppResult<Vec<ParkingSpot>> {
        self.repositories.spots.list().await
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<ParkingSpot> {
        self.repositories
            .spots
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("parking spot", id))
    }

    /// Primera plaza libre del tipo pedido
    pub async fn find_available(&self, query: AvailableSpotQuery) -> AppResult<ParkingSpot> {
        let spot_type = query.required_type()?;
        self.repositories
            .spots
            .find_available_by_type(&spot_type)
            .await?
            .ok_or_else(|| not_found_error("available spot of type", &spot_type))
    }

    pub async fn summary(&self) -> AppResult<SpotSummaryResponse> {
        let spots = self.repositories.spots.list().await?;
        Ok(SpotSummaryResponse {
            summary: summarize_spots(&spots),
            generated_at: Utc::now(),
        })
    }

    pub async fn create(
        &self,
        request: CreateParkingSpotRequest,
        operator: &AuthenticatedUser,
    ) -> AppResult<ApiResponse<ParkingSpot>> {
        let new_spot = request.into_new_spot()?;

        // El ocupante debe ser un vehículo conocido
        if let Some(occupant) = new_spot.state.occupant() {
            self.repositories
                .vehicles
                .find_by_plate(&occupant.license_plate)
                .await?
                .ok_or_else(|| not_found_error("vehicle", &occupant.license_plate))?;
        }

        let spot = self.repositories.spots.create(new_spot).await?;
        info!(
            "🅿️ Plaza {} creada en parque {} ({}) por {}",
            spot.id, spot.park_id, spot.status, operator.username
        );

        Ok(ApiResponse::success_with_message(spot, "Parking spot created"))
    }

    pub async fn update(
        &self,
        id: i64,
        request: UpdateParkingSpotRequest,
        operator: &AuthenticatedUser,
    ) -> AppResult<ApiResponse<ParkingSpot>> {
        let update = request.into_update()?;

        // Primero el cambio de estado (CAS); si hay conflicto no se toca nada más
        let mut spot = match update.status_change {
            Some(SpotStatusChange::Release) => Some(self.allocator.release_spot(id).await?),
            Some(SpotStatusChange::Maintenance) => Some(self.allocator.start_maintenance(id).await?),
            Some(SpotStatusChange::Claim {
                status,
                license_plate,
                start_time,
                end_time,
            }) => Some(
                self.allocator
                    .claim_spot(
                        id,
                        status,
                        &license_plate,
                        start_time.unwrap_or_else(Utc::now),
                        end_time,
                    )
                    .await?,
            ),
            None => None,
        };

        if !update.details.is_empty() {
            spot = Some(self.repositories.spots.update(id, update.details).await?);
        }

        let spot = spot.ok_or_else(|| not_found_error("parking spot", id))?;
        info!("👤 {} actualizó la plaza {} ({})", operator.username, spot.id, spot.status);
        Ok(ApiResponse::success_with_message(spot, "Parking spot updated"))
    }

    pub async fn delete(&self, id: i64, operator: &AuthenticatedUser) -> AppResult<()> {
        self.repositories.spots.delete(id).await?;
        info!("🗑️ Plaza {} eliminada por {}", id, operator.username);
        Ok(())
    }
}
