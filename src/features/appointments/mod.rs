//! Appointments between customers and operators.
//!
//! An appointment is open until it is cancelled or completed. Both sides
//! confirm it separately; rescheduling clears both confirmations.

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::AppointmentService;
