//! Almacén en memoria
//!
//! Implementa todos los repositorios sobre un único estado protegido por un
//! mutex, de modo que las operaciones multi-tabla (crear ticket + ocupar
//! plaza) son atómicas igual que en PostgreSQL. Se usa en tests y con
//! `STORAGE_BACKEND=memory`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use crate::models::{
    NewParkingSpot, NewTicket, Occupant, ParkingSpot, Service, SpotDetails, SpotState, SpotStatus,
    Ticket, TicketChanges, Vehicle,
};
use crate::repositories::{
    ParkingSpotRepository, ServiceRepository, TicketRepository, VehicleRepository,
};
use crate::utils::errors::{not_found_error, spot_unavailable_error, AppError, AppResult};

#[derive(Default)]
struct MemoryState {
    vehicles: BTreeMap<String, Vehicle>,
    services: BTreeMap<i64, Service>,
    spots: BTreeMap<i64, ParkingSpot>,
    tickets: BTreeMap<i64, Ticket>,
    next_service_id: i64,
    next_spot_id: i64,
    next_ticket_id: i64,
}

impl MemoryState {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }

    fn sync_spot_window(&mut self, ticket: &Ticket, occupant_plate: &str) {
        let Some(spot_id) = ticket.parking_spot_id else {
            return;
        };
        let Some(spot) = self.spots.get_mut(&spot_id) else {
            return;
        };
        if spot.is_occupied_by(occupant_plate) {
            spot.license_plate = Some(ticket.license_plate.clone());
            spot.start_time = Some(ticket.issued_time);
            spot.end_time = Some(ticket.expired_time);
        }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Datos de ejemplo para ejecutar el servidor sin base de datos
    pub async fn with_demo_data() -> Self {
        let store = Self::new();
        store
            .insert_vehicle(Vehicle {
                license_plate: "ABC-123".to_string(),
                customer_id: Some(1),
                vehicle_type: "Car".to_string(),
                brand: Some("Toyota".to_string()),
                color: Some("White".to_string()),
            })
            .await;
        store
            .insert_vehicle(Vehicle {
                license_plate: "59X1-234.56".to_string(),
                customer_id: Some(2),
                vehicle_type: "Motorbike".to_string(),
                brand: Some("Honda".to_string()),
                color: Some("Black".to_string()),
            })
            .await;
        store.insert_service("Hourly", Decimal::new(10, 0), "Car").await;
        store.insert_service("Daily", Decimal::new(50, 0), "Car").await;
        store.insert_service("Monthly", Decimal::new(900, 0), "Motorbike").await;
        for spot_type in ["Car", "Car", "Car", "Motorbike"] {
            store.insert_spot(spot_type, 1, SpotState::Available).await;
        }
        store
    }

    pub async fn insert_vehicle(&self, vehicle: Vehicle) {
        let mut state = self.state.lock().await;
        state.vehicles.insert(vehicle.license_plate.clone(), vehicle);
    }

    pub async fn insert_service(&self, name: &str, price: Decimal, vehicle_type: &str) -> Service {
        let mut state = self.state.lock().await;
        let id = MemoryState::next_id(&mut state.next_service_id);
        let service = Service {
            id,
            name: name.to_string(),
            price,
            vehicle_type: vehicle_type.to_string(),
        };
        state.services.insert(id, service.clone());
        service
    }

    pub async fn insert_spot(&self, spot_type: &str, park_id: i64, spot_state: SpotState) -> ParkingSpot {
        let mut state = self.state.lock().await;
        let id = MemoryState::next_id(&mut state.next_spot_id);
        let mut spot = ParkingSpot {
            id,
            spot_type: spot_type.to_string(),
            status: SpotStatus::Available,
            park_id,
            license_plate: None,
            start_time: None,
            end_time: None,
        };
        spot.apply_state(&spot_state);
        state.spots.insert(id, spot.clone());
        spot
    }

    /// Sobrescribir un ticket tal cual (tests con horas en el pasado)
    pub async fn put_ticket(&self, ticket: Ticket) {
        let mut state = self.state.lock().await;
        state.next_ticket_id = state.next_ticket_id.max(ticket.id);
        state.tickets.insert(ticket.id, ticket);
    }

    pub async fn ticket_count(&self) -> usize {
        self.state.lock().await.tickets.len()
    }
}

#[async_trait]
impl VehicleRepository for InMemoryStore {
    async fn find_by_plate(&self, license_plate: &str) -> AppResult<Option<Vehicle>> {
        Ok(self.state.lock().await.vehicles.get(license_plate).cloned())
    }

    async fn list(&self) -> AppResult<Vec<Vehicle>> {
        Ok(self.state.lock().await.vehicles.values().cloned().collect())
    }
}

#[async_trait]
impl ServiceRepository for InMemoryStore {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Service>> {
        Ok(self.state.lock().await.services.get(&id).cloned())
    }

    async fn list(&self) -> AppResult<Vec<Service>> {
        Ok(self.state.lock().await.services.values().cloned().collect())
    }
}

#[async_trait]
impl ParkingSpotRepository for InMemoryStore {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<ParkingSpot>> {
        Ok(self.state.lock().await.spots.get(&id).cloned())
    }

    async fn list(&self) -> AppResult<Vec<ParkingSpot>> {
        Ok(self.state.lock().await.spots.values().cloned().collect())
    }

    async fn find_available_by_type(&self, spot_type: &str) -> AppResult<Option<ParkingSpot>> {
        let spot_type = spot_type.trim();
        Ok(self
            .state
            .lock()
            .await
            .spots
            .values()
            .find(|spot| {
                spot.status == SpotStatus::Available && spot.spot_type.eq_ignore_ascii_case(spot_type)
            })
            .cloned())
    }

    async fn create(&self, spot: NewParkingSpot) -> AppResult<ParkingSpot> {
        Ok(self.insert_spot(&spot.spot_type, spot.park_id, spot.state).await)
    }

    async fn update(&self, id: i64, details: SpotDetails) -> AppResult<ParkingSpot> {
        let mut state = self.state.lock().await;
        let spot = state
            .spots
            .get_mut(&id)
            .ok_or_else(|| not_found_error("parking spot", id))?;
        if let Some(spot_type) = details.spot_type {
            spot.spot_type = spot_type;
        }
        if let Some(park_id) = details.park_id {
            spot.park_id = park_id;
        }
        Ok(spot.clone())
    }

    async fn transition(&self, id: i64, from: &[SpotStatus], to: SpotState) -> AppResult<ParkingSpot> {
        let mut state = self.state.lock().await;
        let spot = state
            .spots
            .get_mut(&id)
            .ok_or_else(|| not_found_error("parking spot", id))?;
        if !from.contains(&spot.status) {
            return Err(AppError::Conflict(format!(
                "spot unavailable: parking spot {} is {}",
                id, spot.status
            )));
        }
        spot.apply_state(&to);
        Ok(spot.clone())
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let spot = state.spots.get(&id).ok_or_else(|| not_found_error("parking spot", id))?;
        if spot.status.holds_vehicle() {
            return Err(AppError::Conflict(format!(
                "parking spot {} is occupied or reserved",
                id
            )));
        }
        state.spots.remove(&id);
        for ticket in state.tickets.values_mut() {
            if ticket.parking_spot_id == Some(id) {
                ticket.parking_spot_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TicketRepository for InMemoryStore {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Ticket>> {
        Ok(self.state.lock().await.tickets.get(&id).cloned())
    }

    async fn list(&self) -> AppResult<Vec<Ticket>> {
        let mut tickets: Vec<Ticket> = self.state.lock().await.tickets.values().cloned().collect();
        tickets.sort_by(|a, b| b.issued_time.cmp(&a.issued_time).then(b.id.cmp(&a.id)));
        Ok(tickets)
    }

    async fn create(&self, ticket: NewTicket) -> AppResult<Ticket> {
        let mut state = self.state.lock().await;

        if let Some(spot_id) = ticket.parking_spot_id {
            let spot = state
                .spots
                .get_mut(&spot_id)
                .filter(|spot| spot.status == SpotStatus::Available)
                .ok_or_else(|| spot_unavailable_error(spot_id))?;
            spot.apply_state(&SpotState::Occupied(Occupant {
                license_plate: ticket.license_plate.clone(),
                start_time: ticket.issued_time,
                end_time: Some(ticket.expired_time),
            }));
        }

        let id = MemoryState::next_id(&mut state.next_ticket_id);
        let created = Ticket {
            id,
            license_plate: ticket.license_plate,
            parking_spot_id: ticket.parking_spot_id,
            service_id: ticket.service_id,
            issued_time: ticket.issued_time,
            expired_time: ticket.expired_time,
            amount: ticket.amount,
            used: false,
            created_at: Utc::now(),
        };
        state.tickets.insert(id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: i64, changes: TicketChanges) -> AppResult<Ticket> {
        let mut state = self.state.lock().await;
        let ticket = state
            .tickets
            .get_mut(&id)
            .ok_or_else(|| not_found_error("ticket", id))?;
        let previous_plate = ticket.license_plate.clone();
        changes.apply_to(ticket);
        let updated = ticket.clone();
        if changes.touches_window() {
            state.sync_spot_window(&updated, &previous_plate);
        }
        Ok(updated)
    }

    async fn extend(&self, id: i64, delta: chrono::Duration) -> AppResult<Option<Ticket>> {
        let mut state = self.state.lock().await;
        let Some(ticket) = state.tickets.get_mut(&id).filter(|t| !t.used) else {
            return Ok(None);
        };
        ticket.expired_time = ticket
            .expired_time
            .checked_add_signed(delta)
            .ok_or_else(|| AppError::Validation(format!("extending ticket {} overflows its expiry", id)))?;
        let extended = ticket.clone();
        state.sync_spot_window(&extended, &extended.license_plate);
        Ok(Some(extended))
    }

    async fn renew(
        &self,
        id: i64,
        issued_time: DateTime<Utc>,
        expired_time: DateTime<Utc>,
    ) -> AppResult<Option<Ticket>> {
        let mut state = self.state.lock().await;
        let Some(ticket) = state.tickets.get_mut(&id) else {
            return Ok(None);
        };
        ticket.issued_time = issued_time;
        ticket.expired_time = expired_time;
        ticket.used = false;
        let renewed = ticket.clone();
        state.sync_spot_window(&renewed, &renewed.license_plate);
        Ok(Some(renewed))
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        self.state
            .lock()
            .await
            .tickets
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found_error("ticket", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_ticket(spot_id: Option<i64>) -> NewTicket {
        let now = Utc::now();
        NewTicket {
            license_plate: "ABC-123".to_string(),
            parking_spot_id: spot_id,
            service_id: 1,
            issued_time: now,
            expired_time: now + Duration::hours(8),
            amount: Decimal::new(50, 0),
        }
    }

    #[tokio::test]
    async fn test_create_claims_available_spot() {
        let store = InMemoryStore::new();
        let spot = store.insert_spot("Car", 1, SpotState::Available).await;

        let ticket = TicketRepository::create(&store, new_ticket(Some(spot.id))).await.unwrap();
        assert_eq!(ticket.parking_spot_id, Some(spot.id));

        let spot = ParkingSpotRepository::find_by_id(&store, spot.id).await.unwrap().unwrap();
        assert!(spot.is_occupied_by("ABC-123"));
        assert_eq!(spot.end_time, Some(ticket.expired_time));
    }

    #[tokio::test]
    async fn test_create_on_taken_spot_writes_nothing() {
        let store = InMemoryStore::new();
        let spot = store.insert_spot("Car", 1, SpotState::Maintenance).await;

        let result = TicketRepository::create(&store, new_ticket(Some(spot.id))).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(store.ticket_count().await, 0);

        let result = TicketRepository::create(&store, new_ticket(Some(999))).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_extend_skips_used_tickets() {
        let store = InMemoryStore::new();
        let ticket = TicketRepository::create(&store, new_ticket(None)).await.unwrap();
        TicketRepository::update(
            &store,
            ticket.id,
            TicketChanges {
                used: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(store.extend(ticket.id, Duration::hours(2)).await.unwrap().is_none());
        assert!(store.extend(42, Duration::hours(2)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_extend_overflow_is_validation_error() {
        let store = InMemoryStore::new();
        let ticket = TicketRepository::create(&store, new_ticket(None)).await.unwrap();

        let huge = Duration::try_days(100_000_000).unwrap();
        let result = store.extend(ticket.id, huge).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let stored = TicketRepository::find_by_id(&store, ticket.id).await.unwrap().unwrap();
        assert_eq!(stored.expired_time, ticket.expired_time);
    }

    #[tokio::test]
    async fn test_transition_is_compare_and_swap() {
        let store = InMemoryStore::new();
        let spot = store.insert_spot("Car", 1, SpotState::Available).await;

        let moved = store
            .transition(spot.id, &[SpotStatus::Available], SpotState::Maintenance)
            .await
            .unwrap();
        assert_eq!(moved.status, SpotStatus::Maintenance);

        let again = store
            .transition(spot.id, &[SpotStatus::Available], SpotState::Maintenance)
            .await;
        assert!(matches!(again, Err(AppError::Conflict(_))));

        let missing = store.transition(404, &[SpotStatus::Available], SpotState::Available).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_find_available_by_type_skips_taken_spots() {
        let store = InMemoryStore::new();
        let taken = store.insert_spot("Car", 1, SpotState::Maintenance).await;
        let motorbike = store.insert_spot("Motorbike", 1, SpotState::Available).await;
        let car = store.insert_spot("Car", 2, SpotState::Available).await;
        store.insert_spot("Car", 2, SpotState::Available).await;

        let found = store.find_available_by_type(" car ").await.unwrap().unwrap();
        assert_eq!(found.id, car.id);
        assert_ne!(found.id, taken.id);

        let found = store.find_available_by_type("Motorbike").await.unwrap().unwrap();
        assert_eq!(found.id, motorbike.id);

        assert!(store.find_available_by_type("Truck").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_occupied_spot_conflicts() {
        let store = InMemoryStore::new();
        let spot = store.insert_spot("Car", 1, SpotState::Available).await;
        TicketRepository::create(&store, new_ticket(Some(spot.id))).await.unwrap();

        let result = ParkingSpotRepository::delete(&store, spot.id).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }
}
