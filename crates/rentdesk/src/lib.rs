//! Core library for the rental desk service: association resolution between
//! properties and tenants, the schedule lifecycle, and per-schedule payment
//! ledgers, plus the configuration and telemetry plumbing the service binary
//! builds on.

pub mod config;
pub mod error;
pub mod rentals;
pub mod telemetry;
