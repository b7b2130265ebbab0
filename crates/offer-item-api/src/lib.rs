//! HTTP surface of the offer item service.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;
