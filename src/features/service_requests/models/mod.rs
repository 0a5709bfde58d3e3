mod service_request;
mod status;

pub use service_request::{ServiceRequest, StatusHistory};
pub use status::RequestStatus;
