//! Modelos del sistema
//!
//! Este módulo contiene todos los modelos de datos que mapean exactamente
//! al schema PostgreSQL definido en `migrations/`.

pub mod parking_spot;
pub mod service;
pub mod ticket;
pub mod vehicle;

pub use parking_spot::{NewParkingSpot, Occupant, ParkingSpot, SpotDetails, SpotState, SpotStatus};
pub use service::Service;
pub use ticket::{derive_status, NewTicket, Ticket, TicketChanges, TicketStatus};
pub use vehicle::{normalize_license_plate, Vehicle};
