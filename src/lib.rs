/// Basic application code
pub mod app;
/// Controllers for REST endpoints
pub mod controller;
/// Domain value objects
pub mod domain;
/// Stored records and store inputs
pub mod model;
/// Stores and the transaction boundary
pub mod repo;
/// Consistency engine
pub mod service;
/// Application settings
pub mod settings;
/// Application telemetry for tracing and logging
pub mod telemetry;
