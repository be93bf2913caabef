pub mod handlers;
pub mod router;
pub mod models;
pub mod services;

// Re-export models and services for the appointment cell
pub use models::*;
pub use services::*;
