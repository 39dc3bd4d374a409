pub mod parking_spot_controller;
pub mod service_controller;
pub mod ticket_controller;
pub mod vehicle_controller;
