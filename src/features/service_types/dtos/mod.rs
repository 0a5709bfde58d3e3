mod service_type_dto;

pub use service_type_dto::*;
