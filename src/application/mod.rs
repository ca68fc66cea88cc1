//! Application services layer.

pub mod archive;
pub mod audience;
pub mod error;
pub mod posts;
pub mod repos;
pub mod security;
