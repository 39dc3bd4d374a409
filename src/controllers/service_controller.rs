use crate::models::Service;
use crate::repositories::ServiceRepository;
use crate::state::AppState;
use crate::utils::errors::{not_found_error, AppResult};
use std::sync::Arc;

pub struct ServiceController {
    repository: Arc<dyn ServiceRepository>,
}

impl ServiceController {
    pub fn new(state: &AppState) -> Self {
        Self {
            repository: state.repositories.services.clone(),
        }
    }

    pub async fn list(&self) -> AppResult<Vec<Service>> {
        self.repository.list().await
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<Service> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("service", id))
    }
}
