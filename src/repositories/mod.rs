//! Repositorios
//!
//! Cada almacén se expone como un trait asíncrono con dos implementaciones:
//! PostgreSQL (`Pg*Repository`) e [`InMemoryStore`]. Los handlers reciben
//! los repositorios a través de [`Repositories`] en el estado de la app.

pub mod memory_store;
pub mod parking_spot_repository;
pub mod service_repository;
pub mod ticket_repository;
pub mod vehicle_repository;

use std::sync::Arc;

use sqlx::PgPool;

use crate::utils::errors::AppError;

pub use memory_store::InMemoryStore;
pub use parking_spot_repository::{ParkingSpotRepository, PgParkingSpotRepository};
pub use service_repository::{PgServiceRepository, ServiceRepository};
pub use ticket_repository::{PgTicketRepository, TicketRepository};
pub use vehicle_repository::{PgVehicleRepository, VehicleRepository};

/// Conjunto de repositorios inyectado en cada petición
#[derive(Clone)]
pub struct Repositories {
    pub vehicles: Arc<dyn VehicleRepository>,
    pub services: Arc<dyn ServiceRepository>,
    pub spots: Arc<dyn ParkingSpotRepository>,
    pub tickets: Arc<dyn TicketRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            vehicles: Arc::new(PgVehicleRepository::new(pool.clone())),
            services: Arc::new(PgServiceRepository::new(pool.clone())),
            spots: Arc::new(PgParkingSpotRepository::new(pool.clone())),
            tickets: Arc::new(PgTicketRepository::new(pool)),
        }
    }

    pub fn in_memory(store: InMemoryStore) -> Self {
        Self {
            vehicles: Arc::new(store.clone()),
            services: Arc::new(store.clone()),
            spots: Arc::new(store.clone()),
            tickets: Arc::new(store),
        }
    }
}

/// Registrar el error SQL con su contexto y clasificarlo
pub(crate) fn db_error(error: sqlx::Error, context: std::fmt::Arguments<'_>) -> AppError {
    log::error!("❌ Error {}: {}", context, error);
    AppError::from(error)
}
