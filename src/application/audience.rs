//! Audience expansion for personal feeds.

use std::sync::Arc;

use tracing::debug;

use crate::application::repos::{ConnectionsRepo, RepoError};
use crate::domain::query::{AudienceMode, QuerySpec};

/// Resolves the author set of a personal feed request.
#[derive(Clone)]
pub struct AudienceExpander {
    connections: Arc<dyn ConnectionsRepo>,
}

impl AudienceExpander {
    pub fn new(connections: Arc<dyn ConnectionsRepo>) -> Self {
        Self { connections }
    }

    /// Returns `spec` with `from_ids` set to the caller plus every identity
    /// the caller is connected to right now. Scope requests pass through
    /// untouched.
    pub async fn expand(&self, mut spec: QuerySpec) -> Result<QuerySpec, RepoError> {
        if spec.mode != AudienceMode::PersonalFeed {
            return Ok(spec);
        }

        let connections = self.connections.connections_of(&spec.caller_id).await?;

        spec.from_ids.clear();
        spec.from_ids.insert(spec.caller_id.clone());
        spec.from_ids.extend(connections);

        debug!(
            caller = %spec.caller_id,
            authors = spec.from_ids.len(),
            "Expanded personal feed audience"
        );

        Ok(spec)
    }
}
