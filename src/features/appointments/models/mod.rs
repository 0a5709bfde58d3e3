mod appointment;

pub use appointment::{Appointment, AppointmentState};
