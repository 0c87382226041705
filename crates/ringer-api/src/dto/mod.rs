//! Data Transfer Objects (DTOs) for API requests and responses

pub mod common;
pub mod trunk;

pub use common::*;
pub use trunk::*;
