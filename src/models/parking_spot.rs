//! Modelo de ParkingSpot
//!
//! Mapea la tabla `parking_spots`. El estado de ocupación se expone como
//! [`SpotState`], que solo permite ocupante en `Occupied` y `Reserved`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

/// Estado de la plaza - mapea al ENUM spot_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "spot_status")]
pub enum SpotStatus {
    Available,
    Occupied,
    Reserved,
    Maintenance,
}

impl SpotStatus {
    pub const ALL: [SpotStatus; 4] = [
        SpotStatus::Available,
        SpotStatus::Occupied,
        SpotStatus::Reserved,
        SpotStatus::Maintenance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SpotStatus::Available => "Available",
            SpotStatus::Occupied => "Occupied",
            SpotStatus::Reserved => "Reserved",
            SpotStatus::Maintenance => "Maintenance",
        }
    }

    /// Una plaza con ocupante no puede borrarse ni reasignarse
    pub fn holds_vehicle(&self) -> bool {
        matches!(self, SpotStatus::Occupied | SpotStatus::Reserved)
    }
}

impl std::fmt::Display for SpotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ParkingSpot principal - mapea exactamente a la tabla parking_spots
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct ParkingSpot {
    pub id: i64,
    pub spot_type: String,
    pub status: SpotStatus,
    pub park_id: i64,
    pub license_plate: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Vehículo que ocupa o reservó una plaza
#[derive(Debug, Clone, PartialEq)]
pub struct Occupant {
    pub license_plate: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Estado completo de ocupación de una plaza
#[derive(Debug, Clone, PartialEq)]
pub enum SpotState {
    Available,
    Occupied(Occupant),
    Reserved(Occupant),
    Maintenance,
}

impl SpotState {
    pub fn status(&self) -> SpotStatus {
        match self {
            SpotState::Available => SpotStatus::Available,
            SpotState::Occupied(_) => SpotStatus::Occupied,
            SpotState::Reserved(_) => SpotStatus::Reserved,
            SpotState::Maintenance => SpotStatus::Maintenance,
        }
    }

    pub fn occupant(&self) -> Option<&Occupant> {
        match self {
            SpotState::Occupied(occupant) | SpotState::Reserved(occupant) => Some(occupant),
            SpotState::Available | SpotState::Maintenance => None,
        }
    }

    /// Construir el estado a partir de un status y los campos opcionales del ocupante
    pub fn from_parts(
        status: SpotStatus,
        license_plate: Option<String>,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> Option<Self> {
        match status {
            SpotStatus::Available => Some(SpotState::Available),
            SpotStatus::Maintenance => Some(SpotState::Maintenance),
            SpotStatus::Occupied | SpotStatus::Reserved => {
                let occupant = Occupant {
                    license_plate: license_plate.filter(|p| !p.trim().is_empty())?,
                    start_time: start_time?,
                    end_time,
                };
                Some(if status == SpotStatus::Occupied {
                    SpotState::Occupied(occupant)
                } else {
                    SpotState::Reserved(occupant)
                })
            }
        }
    }
}

impl ParkingSpot {
    /// Aplicar un nuevo estado, limpiando el ocupante cuando no corresponde
    pub fn apply_state(&mut self, state: &SpotState) {
        self.status = state.status();
        match state.occupant() {
            Some(occupant) => {
                self.license_plate = Some(occupant.license_plate.clone());
                self.start_time = Some(occupant.start_time);
                self.end_time = occupant.end_time;
            }
            None => {
                self.license_plate = None;
                self.start_time = None;
                self.end_time = None;
            }
        }
    }

    /// Verificar si la plaza está ocupada por la matrícula indicada
    pub fn is_occupied_by(&self, license_plate: &str) -> bool {
        self.status == SpotStatus::Occupied && self.license_plate.as_deref() == Some(license_plate)
    }
}

/// Datos para crear una plaza
#[derive(Debug, Clone)]
pub struct NewParkingSpot {
    pub spot_type: String,
    pub park_id: i64,
    pub state: SpotState,
}

/// Cambios administrativos que no tocan la ocupación
#[derive(Debug, Clone, Default)]
pub struct SpotDetails {
    pub spot_type: Option<String>,
    pub park_id: Option<i64>,
}

impl SpotDetails {
    pub fn is_empty(&self) -> bool {
        self.spot_type.is_none() && self.park_id.is_none()
    }
}
