mod service_type;

pub use service_type::{DocumentRequirement, ServiceType};
