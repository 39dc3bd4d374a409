use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use validator::{ValidationError, ValidationErrors};

use crate::models::{Ticket, TicketStatus};
use crate::services::ticket_allocator::{EditTicket, IssueTicket, TicketStats};
use crate::utils::errors::{missing_fields_error, AppError, AppResult};
use crate::utils::validation::{parse_timestamp, validate_license_plate};

// Request para emitir un ticket. Los campos son opcionales para poder
// informar de todos los que faltan en un único 400.
#[derive(Debug, Default, Deserialize)]
pub struct CreateTicketRequest {
    #[serde(alias = "LicensePlate")]
    pub license_plate: Option<String>,
    #[serde(alias = "IssuedTime")]
    pub issued_time: Option<String>,
    #[serde(alias = "ExpiredTime")]
    pub expired_time: Option<String>,
    #[serde(alias = "ServiceID")]
    pub service_id: Option<i64>,
    #[serde(alias = "ParkingSpotID", alias = "SpotID")]
    pub parking_spot_id: Option<i64>,
}

impl CreateTicketRequest {
    pub fn into_command(self) -> AppResult<IssueTicket> {
        let mut missing = Vec::new();
        let license_plate = non_empty(self.license_plate, "license_plate", &mut missing);
        let issued_time = non_empty(self.issued_time, "issued_time", &mut missing);
        let expired_time = non_empty(self.expired_time, "expired_time", &mut missing);
        if self.service_id.is_none() {
            missing.push("service_id");
        }
        if self.parking_spot_id.is_none() {
            missing.push("parking_spot_id");
        }

        match (license_plate, issued_time, expired_time, self.service_id, self.parking_spot_id) {
            (Some(plate), Some(issued), Some(expired), Some(service_id), Some(parking_spot_id)) => {
                Ok(IssueTicket {
                    license_plate: checked_plate(plate)?,
                    issued_time: timestamp_field("issued_time", &issued)?,
                    expired_time: timestamp_field("expired_time", &expired)?,
                    service_id,
                    parking_spot_id,
                })
            }
            _ => Err(missing_fields_error(&missing)),
        }
    }
}

// Request de actualización: la operación se decide por los campos presentes
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTicketRequest {
    pub action: Option<String>,
    pub extend_by_minutes: Option<i64>,
    #[serde(alias = "Status")]
    pub status: Option<String>,
    #[serde(alias = "LicensePlate")]
    pub license_plate: Option<String>,
    #[serde(alias = "IssuedTime")]
    pub issued_time: Option<String>,
    #[serde(alias = "ExpiredTime")]
    pub expired_time: Option<String>,
    #[serde(alias = "ServiceID")]
    pub service_id: Option<i64>,
}

/// Operación resultante de un `PUT /api/tickets/:id`
#[derive(Debug, Clone)]
pub enum TicketCommand {
    Extend(Option<Duration>),
    Void,
    Renew,
    Edit(EditTicket),
}

impl UpdateTicketRequest {
    fn has_edit_fields(&self) -> bool {
        self.license_plate.is_some()
            || self.issued_time.is_some()
            || self.expired_time.is_some()
            || self.service_id.is_some()
    }

    pub fn into_command(self) -> AppResult<TicketCommand> {
        let extend = self
            .extend_by_minutes
            .map(|minutes| {
                Duration::try_minutes(minutes).ok_or_else(|| {
                    AppError::Validation(format!("extend_by_minutes {} is out of range", minutes))
                })
            })
            .transpose()?;

        if let Some(action) = self.action.as_deref() {
            return match action.trim().to_ascii_lowercase().as_str() {
                "extend" => Ok(TicketCommand::Extend(extend)),
                "void" => Ok(TicketCommand::Void),
                "renew" => Ok(TicketCommand::Renew),
                other => Err(AppError::Validation(format!(
                    "unknown action '{}', expected extend, void or renew",
                    other
                ))),
            };
        }

        let status_command = match self.status.as_deref() {
            None => None,
            Some(raw) => match raw.parse::<TicketStatus>() {
                Ok(TicketStatus::Used) => Some(TicketCommand::Void),
                Ok(TicketStatus::Active) => Some(TicketCommand::Renew),
                Ok(TicketStatus::Expired) => {
                    return Err(AppError::Validation(
                        "status Expired is derived and cannot be set".to_string(),
                    ))
                }
                Err(e) => return Err(AppError::Validation(e)),
            },
        };

        let has_edit = self.has_edit_fields();
        let signals = [extend.is_some(), status_command.is_some(), has_edit]
            .iter()
            .filter(|present| **present)
            .count();
        match signals {
            0 => return Err(AppError::Validation("empty ticket update".to_string())),
            1 => {}
            _ => {
                return Err(AppError::Validation(
                    "ticket update mixes extend, status and field changes".to_string(),
                ))
            }
        }

        if extend.is_some() {
            return Ok(TicketCommand::Extend(extend));
        }
        if let Some(command) = status_command {
            return Ok(command);
        }

        let mut missing = Vec::new();
        let license_plate = non_empty(self.license_plate, "license_plate", &mut missing);
        let issued_time = non_empty(self.issued_time, "issued_time", &mut missing);
        let expired_time = non_empty(self.expired_time, "expired_time", &mut missing);
        if self.service_id.is_none() {
            missing.push("service_id");
        }

        match (license_plate, issued_time, expired_time, self.service_id) {
            (Some(plate), Some(issued), Some(expired), Some(service_id)) => {
                Ok(TicketCommand::Edit(EditTicket {
                    license_plate: checked_plate(plate)?,
                    issued_time: timestamp_field("issued_time", &issued)?,
                    expired_time: timestamp_field("expired_time", &expired)?,
                    service_id,
                }))
            }
            _ => Err(missing_fields_error(&missing)),
        }
    }
}

// Response de ticket con su estado derivado
#[derive(Debug, Serialize)]
pub struct TicketResponse {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub status: TicketStatus,
}

impl TicketResponse {
    pub fn at(ticket: Ticket, now: DateTime<Utc>) -> Self {
        let status = ticket.status_at(now);
        Self { ticket, status }
    }
}

// Filtros del listado de tickets
#[derive(Debug, Default, Deserialize)]
pub struct TicketListQuery {
    pub status: Option<String>,
    pub search: Option<String>,
}

impl TicketListQuery {
    pub fn status_filter(&self) -> AppResult<Option<TicketStatus>> {
        self.status
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse::<TicketStatus>().map_err(AppError::Validation))
            .transpose()
    }

    pub fn matches(&self, response: &TicketResponse, status: Option<TicketStatus>) -> bool {
        if status.is_some_and(|s| s != response.status) {
            return false;
        }
        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(term) => response
                .ticket
                .license_plate
                .to_ascii_uppercase()
                .contains(&term.to_ascii_uppercase()),
            None => true,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TicketStatsResponse {
    #[serde(flatten)]
    pub stats: TicketStats,
    pub generated_at: DateTime<Utc>,
}

fn non_empty(value: Option<String>, field: &'static str, missing: &mut Vec<&'static str>) -> Option<String> {
    let value = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    if value.is_none() {
        missing.push(field);
    }
    value
}

fn field_error(field: &'static str, error: ValidationError) -> AppError {
    let mut errors = ValidationErrors::new();
    errors.add(field, error);
    AppError::InvalidFields(errors)
}

fn checked_plate(plate: String) -> AppResult<String> {
    validate_license_plate(&plate).map_err(|e| field_error("license_plate", e))?;
    Ok(plate)
}

fn timestamp_field(field: &'static str, value: &str) -> AppResult<DateTime<Utc>> {
    parse_timestamp(value).map_err(|e| field_error(field, e))
}
