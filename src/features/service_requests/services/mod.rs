mod service_request_service;
pub mod workflow;

pub use service_request_service::ServiceRequestService;
