pub mod auth_service;
pub mod twilio_service;
pub mod worker;
