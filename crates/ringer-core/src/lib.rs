//! Ringer Core Library
//!
//! This crate provides the foundational types, traits, and error handling
//! for the Ringer trunk platform. It includes:
//!
//! - The SIP trunk configuration model (customer and vendor trunks)
//! - Dialed number parsing used by rate resolution and exclusion checks
//! - Common traits for the platform API and services
//! - Unified error handling with HTTP response mapping
//! - Application configuration

pub mod config;
pub mod error;
pub mod models;
pub mod samples;
pub mod traits;

pub use config::AppConfig;
pub use error::AppError;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
