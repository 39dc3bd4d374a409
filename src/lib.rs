//! Servicio de asignación de tickets y plazas de estacionamiento
//!
//! Expone una API REST (axum) sobre PostgreSQL o un almacén en memoria.

pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

pub use routes::create_app;
pub use state::AppState;
