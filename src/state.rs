//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::sync::Arc;

use crate::config::environment::EnvironmentConfig;
use crate::repositories::Repositories;
use crate::services::TicketAllocator;
use crate::utils::jwt::JwtConfig;

#[derive(Clone)]
pub struct AppState {
    pub repositories: Repositories,
    pub config: Arc<EnvironmentConfig>,
}

impl AppState {
    pub fn new(repositories: Repositories, config: EnvironmentConfig) -> Self {
        Self {
            repositories,
            config: Arc::new(config),
        }
    }

    /// Asignador ligado a los repositorios y la política configurada
    pub fn allocator(&self) -> TicketAllocator {
        TicketAllocator::new(self.repositories.clone(), self.config.ticket_policy.clone())
    }

    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig::from(self.config.as_ref())
    }
}
