use crate::models::{normalize_license_plate, Vehicle};
use crate::repositories::VehicleRepository;
use crate::state::AppState;
use crate::utils::errors::{not_found_error, AppResult};
use std::sync::Arc;

pub struct VehicleController {
    repository: Arc<dyn VehicleRepository>,
}

impl VehicleController {
    pub fn new(state: &AppState) -> Self {
        Self {
            repository: state.repositories.vehicles.clone(),
        }
    }

    pub async fn list(&self) -> AppResult<Vec<Vehicle>> {
        self.repository.list().await
    }

    pub async fn get_by_plate(&self, license_plate: &str) -> AppResult<Vehicle> {
        let plate = normalize_license_plate(license_plate);
        self.repository
            .find_by_plate(&plate)
            .await?
            .ok_or_else(|| not_found_error("vehicle", plate))
    }
}
