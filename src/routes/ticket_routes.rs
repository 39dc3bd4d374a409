use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use crate::controllers::ticket_controller::TicketController;
use crate::dto::ticket_dto::{
    CreateTicketRequest, TicketListQuery, TicketResponse, TicketStatsResponse, UpdateTicketRequest,
};
use crate::dto::ApiResponse;
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_ticket_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tickets).post(create_ticket))
        .route("/stats", get(ticket_stats))
        .route("/:id", get(get_ticket).put(update_ticket).delete(delete_ticket))
}

async fn list_tickets(
    State(state): State<AppState>,
    Query(query): Query<TicketListQuery>,
) -> Result<Json<Vec<TicketResponse>>, AppError> {
    let controller = TicketController::new(&state);
    let response = controller.list(query).await?;
    Ok(Json(response))
}

async fn ticket_stats(
    State(state): State<AppState>,
) -> Result<Json<TicketStatsResponse>, AppError> {
    let controller = TicketController::new(&state);
    let response = controller.stats().await?;
    Ok(Json(response))
}

async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TicketResponse>, AppError> {
    let controller = TicketController::new(&state);
    let response = controller.get_by_id(id).await?;
    Ok(Json(response))
}

async fn create_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateTicketRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TicketResponse>>), AppError> {
    let controller = TicketController::new(&state);
    let response = controller.create(request, &user).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn update_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateTicketRequest>,
) -> Result<Json<ApiResponse<TicketResponse>>, AppError> {
    let controller = TicketController::new(&state);
    let response = controller.update(id, request, &user).await?;
    Ok(Json(response))
}

async fn delete_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let controller = TicketController::new(&state);
    controller.delete(id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}
