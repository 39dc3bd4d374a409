//! Rutas HTTP
//!
//! `/health` es público; todo lo que cuelga de `/api` exige bearer token.

pub mod parking_spot_routes;
pub mod service_routes;
pub mod ticket_routes;
pub mod vehicle_routes;

use axum::{error_handling::HandleErrorLayer, middleware, routing::get, Json, Router};
use serde_json::json;
use tower::{timeout::TimeoutLayer, ServiceBuilder};
use tower_http::trace::TraceLayer;

use crate::middleware::{auth_middleware, cors_layer, handle_timeout_error};
use crate::state::AppState;

/// Construir la aplicación completa con sus capas
pub fn create_app(state: AppState) -> Router {
    let api = Router::new()
        .nest("/tickets", ticket_routes::create_ticket_router())
        .nest("/parking-spots", parking_spot_routes::create_parking_spot_router())
        .nest("/vehicles", vehicle_routes::create_vehicle_router())
        .nest("/services", service_routes::create_service_router())
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let request_timeout = state.config.request_timeout;
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
