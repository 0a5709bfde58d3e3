mod service_type_handler;

pub use service_type_handler::*;
