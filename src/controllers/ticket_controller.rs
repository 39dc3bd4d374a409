use chrono::Utc;
use tracing::info;

use crate::dto::ticket_dto::{
    CreateTicketRequest, TicketCommand, TicketListQuery, TicketResponse, TicketStatsResponse,
    UpdateTicketRequest,
};
use crate::dto::ApiResponse;
use crate::middleware::AuthenticatedUser;
use crate::repositories::Repositories;
use crate::services::TicketAllocator;
use crate::state::AppState;
use crate::utils::errors::{not_found_error, AppResult};

pub struct TicketController {
    repositories: Repositories,
    allocator: TicketAllocator,
}

impl TicketController {
    pub fn new(state: &AppState) -> Self {
        Self {
            repositories: state.repositories.clone(),
            allocator: state.allocator(),
        }
    }

    pub async fn list(&self, query: TicketListQuery) -> AppResult<Vec<TicketResponse>> {
        let status = query.status_filter()?;
        let now = Utc::now();

        let tickets = self.repositories.tickets.list().await?;
        Ok(tickets
            .into_iter()
            .map(|ticket| TicketResponse::at(ticket, now))
            .filter(|response| query.matches(response, status))
            .collect())
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<TicketResponse> {
        let ticket = self
            .repositories
            .tickets
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("ticket", id))?;

        Ok(TicketResponse::at(ticket, Utc::now()))
    }

    pub async fn stats(&self) -> AppResult<TicketStatsResponse> {
        let now = Utc::now();
        let stats = self.allocator.ticket_stats(now).await?;
        Ok(TicketStatsResponse {
            stats,
            generated_at: now,
        })
    }

    pub async fn create(
        &self,
        request: CreateTicketRequest,
        operator: &AuthenticatedUser,
    ) -> AppResult<ApiResponse<TicketResponse>> {
        let command = request.into_command()?;
        let ticket = self.allocator.issue_ticket(command).await?;
        info!("👤 {} emitió el ticket {}", operator.username, ticket.id);

        Ok(ApiResponse::success_with_message(
            TicketResponse::at(ticket, Utc::now()),
            "Ticket issued",
        ))
    }

    pub async fn update(
        &self,
        id: i64,
        request: UpdateTicketRequest,
        operator: &AuthenticatedUser,
    ) -> AppResult<ApiResponse<TicketResponse>> {
        let (ticket, message) = match request.into_command()? {
            TicketCommand::Extend(delta) => (self.allocator.extend_ticket(id, delta).await?, "Ticket extended"),
            TicketCommand::Void => (self.allocator.void_ticket(id).await?, "Ticket voided"),
            TicketCommand::Renew => (self.allocator.renew_ticket(id).await?, "Ticket renewed"),
            TicketCommand::Edit(edit) => (self.allocator.edit_ticket(id, edit).await?, "Ticket updated"),
        };
        info!("👤 {} sobre ticket {}: {}", operator.username, id, message);

        Ok(ApiResponse::success_with_message(
            TicketResponse::at(ticket, Utc::now()),
            message,
        ))
    }

    pub async fn delete(&self, id: i64, operator: &AuthenticatedUser) -> AppResult<()> {
        self.repositories.tickets.delete(id).await?;
        info!("🗑️ Ticket {} eliminado por {}", id, operator.username);
        Ok(())
    }
}
