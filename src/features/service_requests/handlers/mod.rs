mod service_request_handler;

pub use service_request_handler::*;
