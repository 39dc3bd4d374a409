//! Asignador de tickets y plazas
//!
//! Coordina la emisión de tickets con el estado de ocupación de las plazas y
//! aplica las transiciones del ciclo de vida (extender, anular, renovar,
//! liberar). Toda escritura multi-tabla se delega en operaciones atómicas del
//! repositorio; aquí no se reintenta nada.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::TicketPolicy;
use crate::models::{
    normalize_license_plate, NewTicket, Occupant, ParkingSpot, SpotState, SpotStatus, Ticket,
    TicketChanges, TicketStatus, Vehicle,
};
use crate::repositories::Repositories;
use crate::utils::errors::{not_found_error, spot_unavailable_error, AppError, AppResult};
use crate::utils::validation::validate_positive;

/// Datos ya validados para emitir un ticket
#[derive(Debug, Clone)]
pub struct IssueTicket {
    pub license_plate: String,
    pub issued_time: DateTime<Utc>,
    pub expired_time: DateTime<Utc>,
    pub service_id: i64,
    pub parking_spot_id: i64,
}

/// Edición administrativa de un ticket (los cuatro campos son obligatorios)
#[derive(Debug, Clone)]
pub struct EditTicket {
    pub license_plate: String,
    pub issued_time: DateTime<Utc>,
    pub expired_time: DateTime<Utc>,
    pub service_id: i64,
}

/// Contadores de tickets por estado derivado y actividad del día (UTC)
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct TicketStats {
    pub total: usize,
    pub active: usize,
    pub expired: usize,
    pub used: usize,
    pub expiring_soon: usize,
    pub today_tickets: usize,
    pub today_revenue: Decimal,
    /// Últimos tickets emitidos, del más reciente al más antiguo
    pub recent: Vec<Ticket>,
}

/// Número de tickets en `TicketStats::recent`
pub const RECENT_TICKETS: usize = 5;

/// Ocupación de plazas por estado
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SpotSummary {
    pub total: usize,
    pub available: usize,
    pub occupied: usize,
    pub reserved: usize,
    pub maintenance: usize,
}

pub struct TicketAllocator {
    repositories: Repositories,
    policy: TicketPolicy,
}

impl TicketAllocator {
    pub fn new(repositories: Repositories, policy: TicketPolicy) -> Self {
        Self { repositories, policy }
    }

    /// Emitir un ticket ocupando la plaza indicada
    pub async fn issue_ticket(&self, command: IssueTicket) -> AppResult<Ticket> {
        ensure_window(command.issued_time, command.expired_time)?;

        let vehicle = self.require_vehicle(&command.license_plate).await?;

        // Lectura previa solo para fallar rápido; la garantía real es el CAS de `create`
        match self.repositories.spots.find_by_id(command.parking_spot_id).await? {
            Some(spot) if spot.status == SpotStatus::Available => {}
            Some(spot) => {
                warn!(
                    "⚠️ issue_ticket: plaza {} no disponible ({}) para {}",
                    spot.id, spot.status, vehicle.license_plate
                );
                return Err(spot_unavailable_error(command.parking_spot_id));
            }
            None => {
                warn!("⚠️ issue_ticket: plaza {} no existe", command.parking_spot_id);
                return Err(spot_unavailable_error(command.parking_spot_id));
            }
        }

        let amount = self.price_snapshot(command.service_id).await?;

        let ticket = self
            .repositories
            .tickets
            .create(NewTicket {
                license_plate: vehicle.license_plate,
                parking_spot_id: Some(command.parking_spot_id),
                service_id: command.service_id,
                issued_time: command.issued_time,
                expired_time: command.expired_time,
                amount,
            })
            .await
            .map_err(|e| {
                warn!(
                    "❌ issue_ticket: no se pudo emitir en plaza {}: {}",
                    command.parking_spot_id, e
                );
                e
            })?;

        info!(
            "🎫 Ticket {} emitido para {} en plaza {} (importe {})",
            ticket.id, ticket.license_plate, command.parking_spot_id, ticket.amount
        );
        Ok(ticket)
    }

    /// Extender la expiración; sin `delta` se usa la extensión por defecto
    pub async fn extend_ticket(&self, ticket_id: i64, delta: Option<Duration>) -> AppResult<Ticket> {
        let delta = delta.unwrap_or(self.policy.default_extend);
        validate_positive(delta.num_seconds())
            .map_err(|_| AppError::Validation("extension must be a positive duration".to_string()))?;
        if delta > self.policy.max_extend {
            return Err(AppError::Validation(format!(
                "extension of {} min exceeds the maximum of {} min",
                delta.num_minutes(),
                self.policy.max_extend.num_minutes()
            )));
        }

        let ticket = self
            .repositories
            .tickets
            .extend(ticket_id, delta)
            .await?
            .ok_or_else(|| {
                warn!("⚠️ extend_ticket: ticket {} no existe o está anulado", ticket_id);
                not_found_error("active ticket", ticket_id)
            })?;

        info!(
            "⏩ Ticket {} extendido {} min, expira {}",
            ticket.id,
            delta.num_minutes(),
            ticket.expired_time
        );
        Ok(ticket)
    }

    /// Anular un ticket; idempotente
    pub async fn void_ticket(&self, ticket_id: i64) -> AppResult<Ticket> {
        let ticket = self
            .repositories
            .tickets
            .update(
                ticket_id,
                TicketChanges {
                    used: Some(true),
                    ..Default::default()
                },
            )
            .await?;

        info!("🚫 Ticket {} anulado", ticket.id);
        Ok(ticket)
    }

    /// Reiniciar la ventana del ticket desde ahora y reactivarlo
    pub async fn renew_ticket(&self, ticket_id: i64) -> AppResult<Ticket> {
        let now = Utc::now();
        let expired_time = now
            .checked_add_signed(self.policy.default_renew)
            .ok_or_else(|| AppError::Internal("renew duration out of range".to_string()))?;
        let ticket = self
            .repositories
            .tickets
            .renew(ticket_id, now, expired_time)
            .await?
            .ok_or_else(|| not_found_error("ticket", ticket_id))?;

        info!("🔄 Ticket {} renovado hasta {}", ticket.id, ticket.expired_time);
        Ok(ticket)
    }

    /// Edición administrativa: re-calcula el importe si cambia el servicio
    pub async fn edit_ticket(&self, ticket_id: i64, edit: EditTicket) -> AppResult<Ticket> {
        ensure_window(edit.issued_time, edit.expired_time)?;

        let current = self
            .repositories
            .tickets
            .find_by_id(ticket_id)
            .await?
            .ok_or_else(|| not_found_error("ticket", ticket_id))?;
        let vehicle = self.require_vehicle(&edit.license_plate).await?;

        let amount = if edit.service_id != current.service_id {
            Some(self.price_snapshot(edit.service_id).await?)
        } else {
            None
        };

        let ticket = self
            .repositories
            .tickets
            .update(
                ticket_id,
                TicketChanges {
                    license_plate: Some(vehicle.license_plate),
                    service_id: Some(edit.service_id),
                    issued_time: Some(edit.issued_time),
                    expired_time: Some(edit.expired_time),
                    amount,
                    used: None,
                },
            )
            .await?;

        info!("✏️ Ticket {} editado", ticket.id);
        Ok(ticket)
    }

    /// Liberar una plaza, independientemente del estado de sus tickets
    pub async fn release_spot(&self, spot_id: i64) -> AppResult<ParkingSpot> {
        let spot = self
            .repositories
            .spots
            .transition(spot_id, &SpotStatus::ALL, SpotState::Available)
            .await?;

        info!("🅿️ Plaza {} liberada", spot.id);
        Ok(spot)
    }

    /// Reservar u ocupar manualmente una plaza disponible
    pub async fn claim_spot(
        &self,
        spot_id: i64,
        status: SpotStatus,
        license_plate: &str,
        start_time: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
    ) -> AppResult<ParkingSpot> {
        if let Some(end_time) = end_time {
            ensure_window(start_time, end_time)?;
        }
        let vehicle = self.require_vehicle(license_plate).await?;

        let occupant = Occupant {
            license_plate: vehicle.license_plate,
            start_time,
            end_time,
        };
        let target = match status {
            SpotStatus::Reserved => SpotState::Reserved(occupant),
            SpotStatus::Occupied => SpotState::Occupied(occupant),
            other => {
                return Err(AppError::Validation(format!(
                    "status {} does not take an occupant",
                    other
                )))
            }
        };

        let spot = self
            .repositories
            .spots
            .transition(spot_id, &[SpotStatus::Available], target)
            .await?;

        info!("📌 Plaza {} ahora {} por {}", spot.id, spot.status, license_plate);
        Ok(spot)
    }

    /// Poner una plaza libre en mantenimiento
    pub async fn start_maintenance(&self, spot_id: i64) -> AppResult<ParkingSpot> {
        let spot = self
            .repositories
            .spots
            .transition(
                spot_id,
                &[SpotStatus::Available, SpotStatus::Maintenance],
                SpotState::Maintenance,
            )
            .await?;

        info!("🔧 Plaza {} en mantenimiento", spot.id);
        Ok(spot)
    }

    /// Estadísticas calculadas en el momento de la lectura
    pub async fn ticket_stats(&self, now: DateTime<Utc>) -> AppResult<TicketStats> {
        let tickets = self.repositories.tickets.list().await?;
        Ok(summarize_tickets(&tickets, now, self.policy.expiring_soon_window))
    }

    async fn require_vehicle(&self, license_plate: &str) -> AppResult<Vehicle> {
        let plate = normalize_license_plate(license_plate);
        self.repositories
            .vehicles
            .find_by_plate(&plate)
            .await?
            .ok_or_else(|| {
                warn!("⚠️ Vehículo {} no encontrado", plate);
                not_found_error("vehicle", plate)
            })
    }

    async fn price_snapshot(&self, service_id: i64) -> AppResult<Decimal> {
        match self.repositories.services.find_by_id(service_id).await? {
            Some(service) => Ok(service.price),
            None => {
                warn!(
                    "⚠️ Servicio {} no existe, se usa el precio por defecto {}",
                    service_id, self.policy.missing_service_price
                );
                Ok(self.policy.missing_service_price)
            }
        }
    }
}

fn ensure_window(start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<()> {
    if end <= start {
        return Err(AppError::Validation(
            "expired_time must be after issued_time".to_string(),
        ));
    }
    Ok(())
}

/// Contar tickets por estado derivado en `now`.
///
/// "Hoy" es el día UTC de `now`; la recaudación suma el importe congelado en
/// cada ticket emitido ese día, anulados incluidos.
pub fn summarize_tickets(tickets: &[Ticket], now: DateTime<Utc>, window: Duration) -> TicketStats {
    let today = now.date_naive();
    let mut stats = tickets.iter().fold(TicketStats::default(), |mut stats, ticket| {
        stats.total += 1;
        match ticket.status_at(now) {
            TicketStatus::Active => stats.active += 1,
            TicketStatus::Expired => stats.expired += 1,
            TicketStatus::Used => stats.used += 1,
        }
        if ticket.is_expiring_soon(now, window) {
            stats.expiring_soon += 1;
        }
        if ticket.issued_time.date_naive() == today {
            stats.today_tickets += 1;
            stats.today_revenue += ticket.amount;
        }
        stats
    });

    let mut recent: Vec<&Ticket> = tickets.iter().collect();
    recent.sort_by(|a, b| b.issued_time.cmp(&a.issued_time).then(b.id.cmp(&a.id)));
    stats.recent = recent.into_iter().take(RECENT_TICKETS).cloned().collect();
    stats
}

pub fn summarize_spots(spots: &[ParkingSpot]) -> SpotSummary {
    spots.iter().fold(SpotSummary::default(), |mut summary, spot| {
        summary.total += 1;
        match spot.status {
            SpotStatus::Available => summary.available += 1,
            SpotStatus::Occupied => summary.occupied += 1,
            SpotStatus::Reserved => summary.reserved += 1,
            SpotStatus::Maintenance => summary.maintenance += 1,
        }
        summary
    })
}
