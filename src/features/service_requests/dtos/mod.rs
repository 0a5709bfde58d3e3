mod service_request_dto;

pub use service_request_dto::*;
