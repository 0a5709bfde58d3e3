pub mod admin;
pub mod appointments;
pub mod auth;
pub mod documents;
pub mod faqs;
pub mod payments;
pub mod service_requests;
pub mod service_types;
