use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use crate::controllers::service_controller::ServiceController;
use crate::models::Service;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_service_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_services))
        .route("/:id", get(get_service))
}

async fn list_services(
    State(state): State<AppState>,
) -> Result<Json<Vec<Service>>, AppError> {
    let controller = ServiceController::new(&state);
    let response = controller.list().await?;
    Ok(Json(response))
}

async fn get_service(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Service>, AppError> {
    let controller = ServiceController::new(&state);
    let response = controller.get_by_id(id).await?;
    Ok(Json(response))
}
