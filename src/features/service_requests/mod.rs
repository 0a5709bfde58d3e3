//! Service requests and their status workflow.
//!
//! | Method | Endpoint | Access |
//! |--------|----------|--------|
//! | POST | `/api/v1/service-requests/initiate` | any user |
//! | GET | `/api/v1/service-requests` | own / all for staff |
//! | GET | `/api/v1/service-requests/{id}` | owner or staff |
//! | GET | `/api/v1/service-requests/{id}/history` | owner or staff |
//! | PATCH | `/api/v1/service-requests/{id}/form` | owner |
//! | PATCH | `/api/v1/service-requests/{id}/status` | operator |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::ServiceRequestService;
