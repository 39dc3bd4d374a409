//! Services module
//!
//! Lógica de negocio de la aplicación. Los servicios coordinan varios
//! repositorios y no conocen HTTP.

pub mod ticket_allocator;

pub use ticket_allocator::{
    summarize_spots, summarize_tickets, EditTicket, IssueTicket, SpotSummary, TicketAllocator,
    TicketStats,
};
