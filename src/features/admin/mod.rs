//! Back-office user management.
//!
//! Users live in the identity provider; these endpoints accept and validate
//! the same payloads but do not persist anything yet. Every route requires
//! the admin role.

pub mod dtos;
pub mod handlers;
pub mod routes;
pub mod services;

pub use services::AdminUserService;
