//! DTOs de la API
//!
//! Requests y responses serializados en JSON. Los requests se convierten en
//! comandos ya validados antes de llegar a los servicios.

pub mod common_dto;
pub mod parking_spot_dto;
pub mod ticket_dto;

pub use common_dto::ApiResponse;
