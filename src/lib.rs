//! Commons: cache-coherent retrieval, archive export and merge for
//! collaboration-space posts and comments.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
