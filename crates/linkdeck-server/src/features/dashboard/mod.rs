//! Read-side dashboard views

pub mod queries;
pub mod routes;

pub use routes::dashboard_routes;
