//! Modelo de Ticket
//!
//! Mapea la tabla `tickets`. El estado `Active`/`Expired` nunca se persiste:
//! se deriva en cada lectura con [`derive_status`]. Solo `used` es explícito.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

/// Estado derivado de un ticket
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TicketStatus {
    Active,
    Expired,
    Used,
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(TicketStatus::Active),
            "expired" => Ok(TicketStatus::Expired),
            "used" | "void" | "voided" => Ok(TicketStatus::Used),
            other => Err(format!("unknown ticket status '{}'", other)),
        }
    }
}

/// `Used` domina; si no, expira cuando `now >= expired_time`.
pub fn derive_status(now: DateTime<Utc>, expired_time: DateTime<Utc>, used: bool) -> TicketStatus {
    if used {
        TicketStatus::Used
    } else if now >= expired_time {
        TicketStatus::Expired
    } else {
        TicketStatus::Active
    }
}

/// Ticket principal - mapea exactamente a la tabla tickets
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Ticket {
    pub id: i64,
    pub license_plate: String,
    pub parking_spot_id: Option<i64>,
    pub service_id: i64,
    pub issued_time: DateTime<Utc>,
    pub expired_time: DateTime<Utc>,
    pub amount: Decimal,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    pub fn status_at(&self, now: DateTime<Utc>) -> TicketStatus {
        derive_status(now, self.expired_time, self.used)
    }

    /// Activo y a punto de expirar dentro de la ventana indicada
    pub fn is_expiring_soon(&self, now: DateTime<Utc>, window: chrono::Duration) -> bool {
        self.status_at(now) == TicketStatus::Active && self.expired_time - now <= window
    }
}

/// Datos para insertar un ticket
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub license_plate: String,
    pub parking_spot_id: Option<i64>,
    pub service_id: i64,
    pub issued_time: DateTime<Utc>,
    pub expired_time: DateTime<Utc>,
    pub amount: Decimal,
}

/// Conjunto parcial de campos para `update`
#[derive(Debug, Clone, Default)]
pub struct TicketChanges {
    pub license_plate: Option<String>,
    pub service_id: Option<i64>,
    pub issued_time: Option<DateTime<Utc>>,
    pub expired_time: Option<DateTime<Utc>>,
    pub amount: Option<Decimal>,
    pub used: Option<bool>,
}

impl TicketChanges {
    /// Cambia matrícula u horas, que la plaza ocupada debe reflejar
    pub fn touches_window(&self) -> bool {
        self.license_plate.is_some() || self.issued_time.is_some() || self.expired_time.is_some()
    }

    pub fn apply_to(&self, ticket: &mut Ticket) {
        if let Some(license_plate) = &self.license_plate {
            ticket.license_plate = license_plate.clone();
        }
        if let Some(service_id) = self.service_id {
            ticket.service_id = service_id;
        }
        if let Some(issued_time) = self.issued_time {
            ticket.issued_time = issued_time;
        }
        if let Some(expired_time) = self.expired_time {
            ticket.expired_time = expired_time;
        }
        if let Some(amount) = self.amount {
            ticket.amount = amount;
        }
        if let Some(used) = self.used {
            ticket.used = used;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_derive_status_boundaries() {
        let now = Utc::now();
        assert_eq!(derive_status(now, now + Duration::seconds(1), false), TicketStatus::Active);
        assert_eq!(derive_status(now, now, false), TicketStatus::Expired);
        assert_eq!(derive_status(now, now - Duration::hours(1), false), TicketStatus::Expired);
    }

    #[test]
    fn test_used_dominates() {
        let now = Utc::now();
        assert_eq!(derive_status(now, now + Duration::hours(3), true), TicketStatus::Used);
        assert_eq!(derive_status(now, now - Duration::hours(3), true), TicketStatus::Used);
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("ACTIVE".parse::<TicketStatus>(), Ok(TicketStatus::Active));
        assert_eq!("expired".parse::<TicketStatus>(), Ok(TicketStatus::Expired));
        assert_eq!("Used".parse::<TicketStatus>(), Ok(TicketStatus::Used));
        assert!("pending".parse::<TicketStatus>().is_err());
    }

    #[test]
    fn test_is_expiring_soon() {
        let now = Utc::now();
        let mut ticket = Ticket {
            id: 1,
            license_plate: "ABC-123".to_string(),
            parking_spot_id: Some(7),
            service_id: 2,
            issued_time: now - Duration::hours(6),
            expired_time: now + Duration::minutes(90),
            amount: Decimal::new(50, 0),
            used: false,
            created_at: now,
        };
        assert!(ticket.is_expiring_soon(now, Duration::hours(2)));

        ticket.expired_time = now + Duration::hours(5);
        assert!(!ticket.is_expiring_soon(now, Duration::hours(2)));

        ticket.expired_time = now - Duration::minutes(1);
        assert!(!ticket.is_expiring_soon(now, Duration::hours(2)));
    }

    #[test]
    fn test_changes_apply_only_present_fields() {
        let now = Utc::now();
        let mut ticket = Ticket {
            id: 1,
            license_plate: "ABC-123".to_string(),
            parking_spot_id: None,
            service_id: 2,
            issued_time: now,
            expired_time: now + Duration::hours(1),
            amount: Decimal::new(50, 0),
            used: false,
            created_at: now,
        };
        TicketChanges {
            used: Some(true),
            ..Default::default()
        }
        .apply_to(&mut ticket);
        assert!(ticket.used);
        assert_eq!(ticket.license_plate, "ABC-123");
        assert_eq!(ticket.service_id, 2);
    }
}
