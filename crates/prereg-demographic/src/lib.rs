pub mod config;
pub mod demographic;
pub mod error;
pub mod telemetry;
