pub mod service_controller;

pub use service_controller::ServiceController;
