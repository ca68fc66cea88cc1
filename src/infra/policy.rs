//! Permission policy for operator tooling.

use crate::application::security::{PermissionChecker, SecurityError, SecurityFilter};
use crate::domain::entities::PostRecord;
use crate::domain::query::PermissionContext;

/// Policy used by the command-line tools.
///
/// Operators see every post. Deletion is allowed with the site context or
/// when the context names the post's creator.
#[derive(Debug, Default, Clone, Copy)]
pub struct MaintenancePolicy;

impl SecurityFilter for MaintenancePolicy {
    fn filter(
        &self,
        posts: &[PostRecord],
        _site_id: &str,
        _context: &PermissionContext,
    ) -> Result<Vec<PostRecord>, SecurityError> {
        Ok(posts.to_vec())
    }
}

impl PermissionChecker for MaintenancePolicy {
    fn can_delete_post(
        &self,
        post: &PostRecord,
        context: &PermissionContext,
    ) -> Result<bool, SecurityError> {
        Ok(context.is_site() || context.as_str() == post.creator_id)
    }
}
