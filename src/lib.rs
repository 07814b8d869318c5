//! Lifecycle engine and web service for candidate background-check workflows.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
