use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use crate::controllers::vehicle_controller::VehicleController;
use crate::models::Vehicle;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_vehicle_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_vehicles))
        .route("/:plate", get(get_vehicle))
}

async fn list_vehicles(
    State(state): State<AppState>,
) -> Result<Json<Vec<Vehicle>>, AppError> {
    let controller = VehicleController::new(&state);
    let response = controller.list().await?;
    Ok(Json(response))
}

async fn get_vehicle(
    State(state): State<AppState>,
    Path(plate): Path<String>,
) -> Result<Json<Vehicle>, AppError> {
    let controller = VehicleController::new(&state);
    let response = controller.get_by_plate(&plate).await?;
    Ok(Json(response))
}
