//! Frequently asked questions, optionally scoped to a category and a service type.

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::FaqService;
