pub mod auth;
pub mod json;
pub mod service_auth;
