use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

use crate::models::{normalize_license_plate, NewParkingSpot, SpotDetails, SpotState, SpotStatus};
use crate::services::ticket_allocator::SpotSummary;
use crate::utils::errors::{missing_fields_error, AppError, AppResult};
use crate::utils::validation::{
    parse_timestamp, validate_license_plate, validate_not_empty, validate_timestamp,
};

// Request para crear una plaza
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateParkingSpotRequest {
    #[serde(alias = "SpotType")]
    #[validate(custom = "validate_not_empty", length(max = 50))]
    pub spot_type: Option<String>,
    #[serde(alias = "Status")]
    pub status: Option<SpotStatus>,
    #[serde(alias = "ParkID")]
    #[validate(range(min = 1))]
    pub park_id: Option<i64>,
    #[serde(alias = "LicensePlate")]
    #[validate(custom = "validate_license_plate")]
    pub license_plate: Option<String>,
    #[serde(alias = "StartTime")]
    #[validate(custom = "validate_timestamp")]
    pub start_time: Option<String>,
    #[serde(alias = "EndTime")]
    #[validate(custom = "validate_timestamp")]
    pub end_time: Option<String>,
}

impl CreateParkingSpotRequest {
    pub fn into_new_spot(self) -> AppResult<NewParkingSpot> {
        self.validate()?;

        let spot_type = self.spot_type.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let missing: Vec<&str> = [
            ("spot_type", spot_type.is_none()),
            ("status", self.status.is_none()),
            ("park_id", self.park_id.is_none()),
        ]
        .into_iter()
        .filter_map(|(field, absent)| absent.then_some(field))
        .collect();
        let (Some(spot_type), Some(status), Some(park_id)) = (spot_type, self.status, self.park_id) else {
            return Err(missing_fields_error(&missing));
        };

        let state = occupancy_state(
            status,
            self.license_plate,
            optional_timestamp(self.start_time)?,
            optional_timestamp(self.end_time)?,
        )?;

        Ok(NewParkingSpot {
            spot_type,
            park_id,
            state,
        })
    }
}

// Request para actualizar una plaza: datos administrativos y/o cambio de estado
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateParkingSpotRequest {
    #[serde(alias = "SpotType")]
    #[validate(custom = "validate_not_empty", length(max = 50))]
    pub spot_type: Option<String>,
    #[serde(alias = "ParkID")]
    #[validate(range(min = 1))]
    pub park_id: Option<i64>,
    #[serde(alias = "Status")]
    pub status: Option<SpotStatus>,
    #[serde(alias = "LicensePlate")]
    #[validate(custom = "validate_license_plate")]
    pub license_plate: Option<String>,
    #[serde(alias = "StartTime")]
    #[validate(custom = "validate_timestamp")]
    pub start_time: Option<String>,
    #[serde(alias = "EndTime")]
    #[validate(custom = "validate_timestamp")]
    pub end_time: Option<String>,
}

/// Cambio de estado pedido sobre una plaza
#[derive(Debug, Clone, PartialEq)]
pub enum SpotStatusChange {
    Release,
    Maintenance,
    Claim {
        status: SpotStatus,
        license_plate: String,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    },
}

#[derive(Debug, Clone)]
pub struct SpotUpdate {
    pub details: SpotDetails,
    pub status_change: Option<SpotStatusChange>,
}

impl UpdateParkingSpotRequest {
    pub fn into_update(self) -> AppResult<SpotUpdate> {
        self.validate()?;

        let details = SpotDetails {
            spot_type: self.spot_type.map(|s| s.trim().to_string()),
            park_id: self.park_id,
        };

        let status_change = match self.status {
            None => {
                if self.license_plate.is_some() || self.start_time.is_some() || self.end_time.is_some() {
                    return Err(AppError::Validation(
                        "occupant fields require a status".to_string(),
                    ));
                }
                None
            }
            Some(SpotStatus::Available) => Some(SpotStatusChange::Release),
            Some(SpotStatus::Maintenance) => Some(SpotStatusChange::Maintenance),
            Some(status) => {
                let license_plate = self
                    .license_plate
                    .filter(|p| !p.trim().is_empty())
                    .ok_or_else(|| missing_fields_error(&["license_plate"]))?;
                Some(SpotStatusChange::Claim {
                    status,
                    license_plate: normalize_license_plate(&license_plate),
                    start_time: optional_timestamp(self.start_time)?,
                    end_time: optional_timestamp(self.end_time)?,
                })
            }
        };

        if details.is_empty() && status_change.is_none() {
            return Err(AppError::Validation("empty parking spot update".to_string()));
        }

        Ok(SpotUpdate {
            details,
            status_change,
        })
    }
}

// Query para buscar una plaza libre por tipo de vehículo
#[derive(Debug, Default, Deserialize)]
pub struct AvailableSpotQuery {
    #[serde(alias = "type", alias = "vehicle_type")]
    pub spot_type: Option<String>,
}

impl AvailableSpotQuery {
    pub fn required_type(self) -> AppResult<String> {
        self.spot_type
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| missing_fields_error(&["spot_type"]))
    }
}

/// Resumen de ocupación con marca de tiempo
#[derive(Debug, serde::Serialize)]
pub struct SpotSummaryResponse {
    #[serde(flatten)]
    pub summary: SpotSummary,
    pub generated_at: DateTime<Utc>,
}

fn optional_timestamp(value: Option<String>) -> AppResult<Option<DateTime<Utc>>> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| {
            parse_timestamp(&v).map_err(|_| AppError::Validation(format!("invalid timestamp '{}'", v)))
        })
        .transpose()
}

fn occupancy_state(
    status: SpotStatus,
    license_plate: Option<String>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
) -> AppResult<SpotState> {
    if !status.holds_vehicle() && (license_plate.is_some() || start_time.is_some() || end_time.is_some()) {
        return Err(AppError::Validation(format!(
            "a {} spot cannot have an occupant",
            status
        )));
    }
    SpotState::from_parts(
        status,
        license_plate.map(|p| normalize_license_plate(&p)),
        start_time,
        end_time,
    )
    .ok_or_else(|| {
        AppError::Validation(format!(
            "a {} spot requires license_plate and start_time",
            status
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_requires_core_fields() {
        let request = CreateParkingSpotRequest {
            spot_type: Some("Car".to_string()),
            ..Default::default()
        };
        match request.into_new_spot() {
            Err(AppError::Validation(msg)) => {
                assert!(msg.contains("status"));
                assert!(msg.contains("park_id"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_create_enforces_occupant_invariant() {
        let occupied_without_plate = CreateParkingSpotRequest {
            spot_type: Some("Car".to_string()),
            status: Some(SpotStatus::Occupied),
            park_id: Some(1),
            start_time: Some("2024-05-01T08:00:00Z".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            occupied_without_plate.into_new_spot(),
            Err(AppError::Validation(_))
        ));

        let available_with_plate = CreateParkingSpotRequest {
            spot_type: Some("Car".to_string()),
            status: Some(SpotStatus::Available),
            park_id: Some(1),
            license_plate: Some("ABC-123".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            available_with_plate.into_new_spot(),
            Err(AppError::Validation(_))
        ));

        let reserved = CreateParkingSpotRequest {
            spot_type: Some("Car".to_string()),
            status: Some(SpotStatus::Reserved),
            park_id: Some(1),
            license_plate: Some("abc-123".to_string()),
            start_time: Some("2024-05-01T08:00:00Z".to_string()),
            ..Default::default()
        };
        let spot = reserved.into_new_spot().unwrap();
        assert_eq!(spot.state.status(), SpotStatus::Reserved);
        assert_eq!(spot.state.occupant().map(|o| o.license_plate.as_str()), Some("ABC-123"));
    }

    #[test]
    fn test_create_runs_field_validators() {
        let request = CreateParkingSpotRequest {
            spot_type: Some("Car".to_string()),
            status: Some(SpotStatus::Available),
            park_id: Some(0),
            ..Default::default()
        };
        assert!(matches!(request.into_new_spot(), Err(AppError::InvalidFields(_))));
    }

    #[test]
    fn test_update_maps_status_changes() {
        let release = UpdateParkingSpotRequest {
            status: Some(SpotStatus::Available),
            ..Default::default()
        };
        assert_eq!(release.into_update().unwrap().status_change, Some(SpotStatusChange::Release));

        let reserve = UpdateParkingSpotRequest {
            status: Some(SpotStatus::Reserved),
            license_plate: Some("abc-123".to_string()),
            ..Default::default()
        };
        match reserve.into_update().unwrap().status_change {
            Some(SpotStatusChange::Claim { status, license_plate, start_time, .. }) => {
                assert_eq!(status, SpotStatus::Reserved);
                assert_eq!(license_plate, "ABC-123");
                assert!(start_time.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }

        let reserve_without_plate = UpdateParkingSpotRequest {
            status: Some(SpotStatus::Reserved),
            ..Default::default()
        };
        assert!(reserve_without_plate.into_update().is_err());
    }

    #[test]
    fn test_available_query_requires_type() {
        let query: AvailableSpotQuery = serde_json::from_value(serde_json::json!({ "type": " Car " })).unwrap();
        assert_eq!(query.required_type().unwrap(), "Car");

        let blank = AvailableSpotQuery {
            spot_type: Some("  ".to_string()),
        };
        assert!(matches!(blank.required_type(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_update_rejects_empty_body() {
        assert!(matches!(
            UpdateParkingSpotRequest::default().into_update(),
            Err(AppError::Validation(_))
        ));

        let details_only = UpdateParkingSpotRequest {
            park_id: Some(3),
            ..Default::default()
        };
        let update = details_only.into_update().unwrap();
        assert_eq!(update.details.park_id, Some(3));
        assert!(update.status_change.is_none());
    }
}
