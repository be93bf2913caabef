pub mod appointment;
pub mod status;

pub use appointment::AppointmentService;
pub use status::StatusService;
