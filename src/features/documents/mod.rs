//! Documents uploaded against a service request.
//!
//! Files live in object storage under a private key; the database keeps the
//! metadata and review state.

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::DocumentService;
