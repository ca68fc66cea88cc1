//! Cached, audience-aware post retrieval and the write paths that keep the
//! cache coherent.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::application::audience::AudienceExpander;
use crate::application::repos::{
    ConnectionsRepo, PostsRepo, RepoError, SaveCommentParams, SavePostParams,
};
use crate::application::security::{PermissionChecker, SecurityError, SecurityFilter};
use crate::cache::{PostCache, PostList, PostListKey};
use crate::domain::entities::{CommentRecord, PostRecord};
use crate::domain::error::DomainError;
use crate::domain::query::{PermissionContext, QuerySpec};
use crate::domain::reference::EntityReference;

const SOURCE: &str = "application::posts";

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] DomainError),
    #[error("storage failure: {0}")]
    Storage(#[from] RepoError),
    #[error("security filter failure: {0}")]
    Security(#[from] SecurityError),
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("storage failure: {0}")]
    Storage(#[from] RepoError),
    #[error("permission check failure: {0}")]
    Security(#[from] SecurityError),
    #[error("post `{0}` not found")]
    NotFound(Uuid),
    #[error("not permitted to delete post `{0}`")]
    NotPermitted(Uuid),
    #[error("storage did not delete `{0}`")]
    NotDeleted(Uuid),
}

#[derive(Clone)]
pub struct CommonsService {
    posts: Arc<dyn PostsRepo>,
    audience: AudienceExpander,
    cache: Arc<dyn PostCache>,
    filter: Arc<dyn SecurityFilter>,
    permissions: Arc<dyn PermissionChecker>,
}

impl CommonsService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        connections: Arc<dyn ConnectionsRepo>,
        cache: Arc<dyn PostCache>,
        filter: Arc<dyn SecurityFilter>,
        permissions: Arc<dyn PermissionChecker>,
    ) -> Self {
        Self {
            posts,
            audience: AudienceExpander::new(connections),
            cache,
            filter,
            permissions,
        }
    }

    /// Posts visible to the caller described by `spec`.
    ///
    /// The cache holds unfiltered lists; the security filter runs on every
    /// call, hit or miss.
    pub async fn get_posts(&self, spec: QuerySpec) -> Result<Vec<PostRecord>, RetrievalError> {
        spec.validate()?;
        let spec = self.audience.expand(spec).await?;
        let key = PostListKey::for_query(&spec);

        let unfiltered = match self.cache.get(&key) {
            Some(posts) => {
                debug!(
                    target = SOURCE,
                    key = %key,
                    kind = key.kind(),
                    cache = "hit",
                    "Serving post list from cache"
                );
                posts
            }
            None => {
                let fetched: PostList = Arc::from(self.posts.list_posts(&spec).await?);
                debug!(
                    target = SOURCE,
                    key = %key,
                    kind = key.kind(),
                    cache = "miss",
                    fetched = fetched.len(),
                    "Loaded post list from storage"
                );
                self.cache.put(key, fetched.clone());
                fetched
            }
        };

        let visible = self
            .filter
            .filter(&unfiltered, &spec.site_id, &spec.context)?;
        Ok(visible)
    }

    pub async fn find_post(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        self.posts.find_post(id).await
    }

    pub async fn post_exists(&self, id: Uuid) -> Result<bool, RepoError> {
        self.posts.post_exists(id).await.inspect_err(|err| {
            error!(
                target = SOURCE,
                post_id = %id,
                error = %err,
                "Failed to check post existence"
            );
        })
    }

    /// Looks up the post an entity reference points at. The root reference
    /// names no post.
    pub async fn resolve_reference(
        &self,
        reference: &EntityReference,
    ) -> Result<Option<PostRecord>, RepoError> {
        match reference.post_id() {
            Some(id) => self.find_post(id).await,
            None => Ok(None),
        }
    }

    pub async fn save_post(&self, params: SavePostParams) -> Result<PostRecord, WriteError> {
        let key = PostListKey::scope(params.commons_id.clone());
        let post = self
            .posts
            .save_post(params)
            .await
            .map_err(WriteError::from)
            .inspect_err(|err| log_write_failure("save_post", &key, err))?;

        self.cache.invalidate(&key);
        info!(
            target = SOURCE,
            post_id = %post.id,
            commons_id = %post.commons_id,
            "Saved post"
        );
        Ok(post)
    }

    pub async fn delete_post(
        &self,
        id: Uuid,
        context: &PermissionContext,
    ) -> Result<(), WriteError> {
        let result = self.delete_post_inner(id, context).await;
        match &result {
            Ok(key) => {
                self.cache.invalidate(key);
                info!(target = SOURCE, post_id = %id, "Deleted post");
            }
            Err(err) => error!(
                target = SOURCE,
                op = "delete_post",
                post_id = %id,
                error = %err,
                "Post write failed"
            ),
        }
        result.map(|_| ())
    }

    async fn delete_post_inner(
        &self,
        id: Uuid,
        context: &PermissionContext,
    ) -> Result<PostListKey, WriteError> {
        let post = self
            .posts
            .find_post(id)
            .await?
            .ok_or(WriteError::NotFound(id))?;

        if !self.permissions.can_delete_post(&post, context)? {
            return Err(WriteError::NotPermitted(id));
        }

        if !self.posts.delete_post(&post).await? {
            return Err(WriteError::NotDeleted(id));
        }

        Ok(PostListKey::scope(post.commons_id))
    }

    pub async fn save_comment(
        &self,
        commons_id: &str,
        params: SaveCommentParams,
    ) -> Result<CommentRecord, WriteError> {
        let key = PostListKey::scope(commons_id);
        let comment = self
            .posts
            .save_comment(params)
            .await
            .map_err(WriteError::from)
            .inspect_err(|err| log_write_failure("save_comment", &key, err))?;

        self.cache.invalidate(&key);
        debug!(
            target = SOURCE,
            comment_id = %comment.id,
            post_id = %comment.post_id,
            "Saved comment"
        );
        Ok(comment)
    }

    pub async fn delete_comment(
        &self,
        commons_id: &str,
        comment_id: Uuid,
    ) -> Result<(), WriteError> {
        let key = PostListKey::scope(commons_id);
        let deleted = self
            .posts
            .delete_comment(comment_id)
            .await
            .map_err(WriteError::from)
            .inspect_err(|err| log_write_failure("delete_comment", &key, err))?;

        if !deleted {
            let err = WriteError::NotDeleted(comment_id);
            log_write_failure("delete_comment", &key, &err);
            return Err(err);
        }

        self.cache.invalidate(&key);
        Ok(())
    }
}

fn log_write_failure(op: &'static str, key: &PostListKey, err: &WriteError) {
    error!(
        target = SOURCE,
        op,
        commons_id = %key,
        error = %err,
        "Post write failed"
    );
}
