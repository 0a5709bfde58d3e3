mod service_type_service;

pub use service_type_service::ServiceTypeService;
