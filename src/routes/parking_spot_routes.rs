use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use crate::controllers::parking_spot_controller::ParkingSpotController;
use crate::dto::parking_spot_dto::{
    AvailableSpotQuery, CreateParkingSpotRequest, SpotSummaryResponse, UpdateParkingSpotRequest,
};
use crate::dto::ApiResponse;
use crate::middleware::AuthenticatedUser;
use crate::models::ParkingSpot;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_parking_spot_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_spots).post(create_spot))
        .route("/summary", get(spot_summary))
        .route("/available", get(find_available_spot))
        .route("/:id", get(get_spot).put(update_spot).delete(delete_spot))
}

async fn list_spots(
    State(state): State<AppState>,
) -> Result<Json<Vec<ParkingSpot>>, AppError> {
    let controller = ParkingSpotController::new(&state);
    let response = controller.list().await?;
    Ok(Json(response))
}

async fn spot_summary(
    State(state): State<AppState>,
) -> Result<Json<SpotSummaryResponse>, AppError> {
    let controller = ParkingSpotController::new(&state);
    let response = controller.summary().await?;
    Ok(Json(response))
}

async fn find_available_spot(
    State(state): State<AppState>,
    Query(query): Query<AvailableSpotQuery>,
) -> Result<Json<ParkingSpot>, AppError> {
    let controller = ParkingSpotController::new(&state);
    let response = controller.find_available(query).await?;
    Ok(Json(response))
}

async fn get_spot(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ParkingSpot>, AppError> {
    let controller = ParkingSpotController::new(&state);
    let response = controller.get_by_id(id).await?;
    Ok(Json(response))
}

async fn create_spot(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateParkingSpotRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ParkingSpot>>), AppError> {
    let controller = ParkingSpotController::new(&state);
    let response = controller.create(request, &user).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn update_spot(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateParkingSpotRequest>,
) -> Result<Json<ApiResponse<ParkingSpot>>, AppError> {
    let controller = ParkingSpotController::new(&state);
    let response = controller.update(id, request, &user).await?;
    Ok(Json(response))
}

async fn delete_spot(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let controller = ParkingSpotController::new(&state);
    controller.delete(id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}
