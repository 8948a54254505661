pub mod app;
pub mod auth;
pub mod backoff;
pub mod client;
pub mod config;
pub mod error;
pub mod readiness;
pub mod telemetry;
