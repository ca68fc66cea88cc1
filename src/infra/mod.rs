//! Infrastructure adapters and runtime bootstrap.

pub mod error;
pub mod policy;
pub mod store;
pub mod telemetry;
