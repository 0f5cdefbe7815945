//! Crop yield estimation service: library exports for the binaries, tests and
//! benchmarks.

/// Application directory helpers.
pub mod app_dirs;
/// TOML configuration.
pub mod config;
/// Static dataset documents served for display.
pub mod dataset;
/// Yield estimator and audit logging.
pub mod estimator;
/// Logging setup.
pub mod logging;
/// Feature preprocessing and scoring models.
pub mod ml;
/// Request/response envelope and HTTP routes.
pub mod service;
/// Reference row store and prediction audit log.
pub mod store;
