//! Catalogue of services customers can request.
//!
//! | Method | Endpoint | Access |
//! |--------|----------|--------|
//! | GET | `/api/v1/service-types` | public (active only) |
//! | GET | `/api/v1/service-types/{id}` | public (active only) |
//! | POST | `/api/v1/service-types` | admin |
//! | PATCH | `/api/v1/service-types/{id}` | admin |
//! | DELETE | `/api/v1/service-types/{id}` | admin |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::ServiceTypeService;
