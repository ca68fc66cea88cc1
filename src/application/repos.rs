//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{CommentRecord, PostRecord};
use crate::domain::query::QuerySpec;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }
}

/// Create (`id: None`) or update (`id: Some`) a post.
#[derive(Debug, Clone)]
pub struct SavePostParams {
    pub id: Option<Uuid>,
    pub commons_id: String,
    pub site_id: String,
    pub creator_id: String,
    pub content: String,
    /// Preserved when supplied; imports keep the archived timestamps.
    pub created_at: Option<OffsetDateTime>,
    pub modified_at: Option<OffsetDateTime>,
}

/// Create (`id: None`) or update (`id: Some`) a comment.
#[derive(Debug, Clone)]
pub struct SaveCommentParams {
    pub id: Option<Uuid>,
    pub post_id: Uuid,
    pub creator_id: String,
    pub content: String,
    pub created_at: Option<OffsetDateTime>,
    pub modified_at: Option<OffsetDateTime>,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Full, unfiltered post list for a request. Personal feed requests
    /// carry their expanded author set in `spec.from_ids`.
    async fn list_posts(&self, spec: &QuerySpec) -> Result<Vec<PostRecord>, RepoError>;

    async fn find_post(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;

    async fn post_exists(&self, id: Uuid) -> Result<bool, RepoError>;

    async fn save_post(&self, params: SavePostParams) -> Result<PostRecord, RepoError>;

    /// Returns `false` when nothing was removed.
    async fn delete_post(&self, post: &PostRecord) -> Result<bool, RepoError>;

    async fn save_comment(&self, params: SaveCommentParams) -> Result<CommentRecord, RepoError>;

    async fn delete_comment(&self, id: Uuid) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait ConnectionsRepo: Send + Sync {
    /// Identities the user is connected to, as of now.
    async fn connections_of(&self, user_id: &str) -> Result<Vec<String>, RepoError>;
}
