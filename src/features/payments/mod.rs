//! Payments for paid service requests.
//!
//! | Method | Endpoint | Access |
//! |--------|----------|--------|
//! | POST | `/api/v1/payments` | request owner |
//! | GET | `/api/v1/payments` | own / all for admin |
//! | GET | `/api/v1/payments/{id}` | owner or admin |
//! | GET | `/api/v1/payments/{id}/invoice` | owner or admin |
//! | GET | `/api/v1/payments/{id}/receipt` | owner or admin, succeeded only |
//! | POST | `/api/v1/payments/webhook` | payment provider (signed) |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::PaymentService;
