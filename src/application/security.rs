//! Permission collaborators.

use thiserror::Error;

use crate::domain::entities::PostRecord;
use crate::domain::query::PermissionContext;

#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("permission check failed: {0}")]
    Check(String),
    #[error("security filter failed: {0}")]
    Filter(String),
}

impl SecurityError {
    pub fn check(message: impl std::fmt::Display) -> Self {
        Self::Check(message.to_string())
    }

    pub fn filter(message: impl std::fmt::Display) -> Self {
        Self::Filter(message.to_string())
    }
}

/// Narrows an unfiltered post list to what the caller may see.
///
/// Implementations return an order-preserving subsequence of `posts`,
/// optionally with parts of a post (such as comments) removed. The input
/// is shared with the cache and is never modified.
pub trait SecurityFilter: Send + Sync {
    fn filter(
        &self,
        posts: &[PostRecord],
        site_id: &str,
        context: &PermissionContext,
    ) -> Result<Vec<PostRecord>, SecurityError>;
}

pub trait PermissionChecker: Send + Sync {
    fn can_delete_post(
        &self,
        post: &PostRecord,
        context: &PermissionContext,
    ) -> Result<bool, SecurityError>;
}
