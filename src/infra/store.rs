//! File-backed storage adapter.
//!
//! Keeps the whole dataset in memory and rewrites the TOML data file on
//! every write. A write edits a copy of the dataset and only replaces the
//! shared one after the file was written, so a failed write leaves nothing
//! behind. Suitable for operator tooling and tests, not for concurrent
//! multi-process use.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::repos::{
    ConnectionsRepo, PostsRepo, RepoError, SaveCommentParams, SavePostParams,
};
use crate::domain::entities::{CommentRecord, PostRecord};
use crate::domain::query::{AudienceMode, QuerySpec};

use super::error::InfraError;

const SOURCE: &str = "infra::store";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Dataset {
    #[serde(default)]
    connections: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    posts: Vec<PostRecord>,
}

#[derive(Clone)]
pub struct TomlStore {
    dataset: Arc<RwLock<Dataset>>,
    path: Option<PathBuf>,
}

impl TomlStore {
    /// Store without a backing file.
    pub fn in_memory() -> Self {
        Self {
            dataset: Arc::new(RwLock::new(Dataset::default())),
            path: None,
        }
    }

    /// Opens `path`, starting empty when the file does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, InfraError> {
        let path = path.into();
        let dataset = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => toml::from_str::<Dataset>(&contents).map_err(|err| {
                InfraError::storage(format!("failed to parse `{}`: {err}", path.display()))
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Dataset::default(),
            Err(err) => return Err(InfraError::Io(err)),
        };

        info!(
            target = SOURCE,
            path = %path.display(),
            posts = dataset.posts.len(),
            "Opened data file"
        );

        Ok(Self {
            dataset: Arc::new(RwLock::new(dataset)),
            path: Some(path),
        })
    }

    /// Replaces the connections of `user_id`.
    pub async fn set_connections(
        &self,
        user_id: &str,
        connections: Vec<String>,
    ) -> Result<(), RepoError> {
        let mut dataset = self.dataset.write().await;
        let mut next = dataset.clone();
        next.connections.insert(user_id.to_string(), connections);
        self.commit(&mut dataset, next).await
    }

    /// Writes `next` to the data file, then makes it the live dataset.
    async fn commit(&self, current: &mut Dataset, next: Dataset) -> Result<(), RepoError> {
        self.persist(&next).await?;
        *current = next;
        Ok(())
    }

    async fn persist(&self, dataset: &Dataset) -> Result<(), RepoError> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        let encoded = toml::to_string_pretty(dataset).map_err(RepoError::from_persistence)?;
        tokio::fs::write(path, encoded)
            .await
            .map_err(RepoError::from_persistence)?;
        debug!(target = SOURCE, path = %path.display(), "Persisted data file");
        Ok(())
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), RepoError> {
    if value.trim().is_empty() {
        return Err(RepoError::invalid_input(format!("`{field}` must not be empty")));
    }
    Ok(())
}

#[async_trait]
impl PostsRepo for TomlStore {
    /// Newest posts first.
    async fn list_posts(&self, spec: &QuerySpec) -> Result<Vec<PostRecord>, RepoError> {
        let dataset = self.dataset.read().await;
        let mut posts: Vec<PostRecord> = dataset
            .posts
            .iter()
            .filter(|post| match spec.mode {
                AudienceMode::Scope => post.commons_id == spec.commons_id,
                AudienceMode::PersonalFeed => spec.from_ids.contains(&post.creator_id),
            })
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let dataset = self.dataset.read().await;
        Ok(dataset.posts.iter().find(|post| post.id == id).cloned())
    }

    async fn post_exists(&self, id: Uuid) -> Result<bool, RepoError> {
        let dataset = self.dataset.read().await;
        Ok(dataset.posts.iter().any(|post| post.id == id))
    }

    async fn save_post(&self, params: SavePostParams) -> Result<PostRecord, RepoError> {
        require_non_empty("commons_id", &params.commons_id)?;
        require_non_empty("creator_id", &params.creator_id)?;

        let now = OffsetDateTime::now_utc();
        let mut dataset = self.dataset.write().await;
        let mut next = dataset.clone();

        let saved = match params.id {
            Some(id) => {
                let existing = next
                    .posts
                    .iter_mut()
                    .find(|post| post.id == id)
                    .ok_or(RepoError::NotFound)?;
                existing.commons_id = params.commons_id;
                existing.site_id = params.site_id;
                existing.creator_id = params.creator_id;
                existing.content = params.content;
                if let Some(created_at) = params.created_at {
                    existing.created_at = created_at;
                }
                existing.modified_at = params.modified_at.unwrap_or(now);
                existing.clone()
            }
            None => {
                let record = PostRecord {
                    id: Uuid::new_v4(),
                    commons_id: params.commons_id,
                    site_id: params.site_id,
                    creator_id: params.creator_id,
                    content: params.content,
                    comments: Vec::new(),
                    created_at: params.created_at.unwrap_or(now),
                    modified_at: params.modified_at.unwrap_or(now),
                };
                next.posts.push(record.clone());
                record
            }
        };

        self.commit(&mut dataset, next).await?;
        Ok(saved)
    }

    async fn delete_post(&self, post: &PostRecord) -> Result<bool, RepoError> {
        let mut dataset = self.dataset.write().await;
        if !dataset.posts.iter().any(|existing| existing.id == post.id) {
            return Ok(false);
        }
        let mut next = dataset.clone();
        next.posts.retain(|existing| existing.id != post.id);
        self.commit(&mut dataset, next).await?;
        Ok(true)
    }

    async fn save_comment(&self, params: SaveCommentParams) -> Result<CommentRecord, RepoError> {
        require_non_empty("creator_id", &params.creator_id)?;

        let now = OffsetDateTime::now_utc();
        let mut dataset = self.dataset.write().await;
        let mut next = dataset.clone();
        let parent = next
            .posts
            .iter_mut()
            .find(|post| post.id == params.post_id)
            .ok_or(RepoError::NotFound)?;

        let saved = match params.id {
            Some(id) => {
                let existing = parent
                    .comments
                    .iter_mut()
                    .find(|comment| comment.id == id)
                    .ok_or(RepoError::NotFound)?;
                existing.creator_id = params.creator_id;
                existing.content = params.content;
                if let Some(created_at) = params.created_at {
                    existing.created_at = created_at;
                }
                existing.modified_at = params.modified_at.unwrap_or(now);
                existing.clone()
            }
            None => {
                let record = CommentRecord {
                    id: Uuid::new_v4(),
                    post_id: params.post_id,
                    creator_id: params.creator_id,
                    content: params.content,
                    created_at: params.created_at.unwrap_or(now),
                    modified_at: params.modified_at.unwrap_or(now),
                };
                parent.comments.push(record.clone());
                record
            }
        };

        self.commit(&mut dataset, next).await?;
        Ok(saved)
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool, RepoError> {
        let mut dataset = self.dataset.write().await;
        let mut next = dataset.clone();
        let Some(parent) = next
            .posts
            .iter_mut()
            .find(|post| post.comments.iter().any(|comment| comment.id == id))
        else {
            return Ok(false);
        };
        parent.comments.retain(|comment| comment.id != id);
        self.commit(&mut dataset, next).await?;
        Ok(true)
    }
}

#[async_trait]
impl ConnectionsRepo for TomlStore {
    async fn connections_of(&self, user_id: &str) -> Result<Vec<String>, RepoError> {
        let dataset = self.dataset.read().await;
        Ok(dataset
            .connections
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn params(commons_id: &str, creator_id: &str, content: &str) -> SavePostParams {
        SavePostParams {
            id: None,
            commons_id: commons_id.to_string(),
            site_id: commons_id.to_string(),
            creator_id: creator_id.to_string(),
            content: content.to_string(),
            created_at: None,
            modified_at: None,
        }
    }

    #[tokio::test]
    async fn scope_listing_is_newest_first() {
        let store = TomlStore::in_memory();
        let mut older = params("site-1", "alice", "older");
        older.created_at = Some(datetime!(2020-01-01 0:00 UTC));
        store.save_post(older).await.expect("older");
        store
            .save_post(params("site-1", "bob", "newer"))
            .await
            .expect("newer");
        store
            .save_post(params("site-2", "bob", "elsewhere"))
            .await
            .expect("elsewhere");

        let posts = store
            .list_posts(&QuerySpec::scope("site-1", "site-1", "alice"))
            .await
            .expect("listed");

        let contents: Vec<_> = posts.iter().map(|p| p.content.as_str()).collect();
        assert_eq!(contents, vec!["newer", "older"]);
    }

    #[tokio::test]
    async fn personal_feed_listing_uses_expanded_authors() {
        let store = TomlStore::in_memory();
        store
            .save_post(params("site-1", "alice", "a"))
            .await
            .expect("a");
        store
            .save_post(params("site-2", "bob", "b"))
            .await
            .expect("b");
        store
            .save_post(params("site-3", "carol", "c"))
            .await
            .expect("c");

        let mut spec = QuerySpec::personal_feed("~alice", "alice");
        spec.from_ids.extend(["alice".to_string(), "bob".to_string()]);

        let posts = store.list_posts(&spec).await.expect("listed");
        let mut authors: Vec<_> = posts.iter().map(|p| p.creator_id.as_str()).collect();
        authors.sort_unstable();
        assert_eq!(authors, vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn update_keeps_identity_and_creation_time() {
        let store = TomlStore::in_memory();
        let created = store
            .save_post(params("site-1", "alice", "draft"))
            .await
            .expect("created");

        let mut update = params("site-1", "alice", "final");
        update.id = Some(created.id);
        let updated = store.save_post(update).await.expect("updated");

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.content, "final");
        assert!(store.post_exists(created.id).await.expect("exists"));
    }

    #[tokio::test]
    async fn updating_unknown_post_is_not_found() {
        let store = TomlStore::in_memory();
        let mut update = params("site-1", "alice", "ghost");
        update.id = Some(Uuid::new_v4());

        assert!(matches!(
            store.save_post(update).await,
            Err(RepoError::NotFound)
        ));
    }

    #[tokio::test]
    async fn rejects_posts_without_creator() {
        let store = TomlStore::in_memory();
        assert!(matches!(
            store.save_post(params("site-1", " ", "anon")).await,
            Err(RepoError::InvalidInput { .. })
        ));
    }

    #[tokio::test]
    async fn comments_attach_to_parent_and_delete() {
        let store = TomlStore::in_memory();
        let post = store
            .save_post(params("site-1", "alice", "parent"))
            .await
            .expect("post");

        let comment = store
            .save_comment(SaveCommentParams {
                id: None,
                post_id: post.id,
                creator_id: "bob".to_string(),
                content: "reply".to_string(),
                created_at: None,
                modified_at: None,
            })
            .await
            .expect("comment");

        let stored = store
            .find_post(post.id)
            .await
            .expect("lookup")
            .expect("post present");
        assert_eq!(stored.comments, vec![comment.clone()]);

        assert!(store.delete_comment(comment.id).await.expect("delete"));
        assert!(!store.delete_comment(comment.id).await.expect("delete again"));
    }

    #[tokio::test]
    async fn comment_on_missing_post_is_not_found() {
        let store = TomlStore::in_memory();
        let result = store
            .save_comment(SaveCommentParams {
                id: None,
                post_id: Uuid::new_v4(),
                creator_id: "bob".to_string(),
                content: "lost".to_string(),
                created_at: None,
                modified_at: None,
            })
            .await;

        assert!(matches!(result, Err(RepoError::NotFound)));
    }

    #[tokio::test]
    async fn delete_post_reports_whether_anything_was_removed() {
        let store = TomlStore::in_memory();
        let post = store
            .save_post(params("site-1", "alice", "gone soon"))
            .await
            .expect("post");

        assert!(store.delete_post(&post).await.expect("delete"));
        assert!(!store.delete_post(&post).await.expect("delete again"));
    }

    #[tokio::test]
    async fn data_file_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.toml");

        let store = TomlStore::open(&path).await.expect("open");
        let post = store
            .save_post(params("site-1", "alice", "persisted"))
            .await
            .expect("post");
        store
            .save_comment(SaveCommentParams {
                id: None,
                post_id: post.id,
                creator_id: "bob".to_string(),
                content: "also persisted".to_string(),
                created_at: None,
                modified_at: None,
            })
            .await
            .expect("comment");
        store
            .set_connections("alice", vec!["bob".to_string()])
            .await
            .expect("connections");

        let reopened = TomlStore::open(&path).await.expect("reopen");
        let found = reopened
            .find_post(post.id)
            .await
            .expect("lookup")
            .expect("post present");
        assert_eq!(found.content, "persisted");
        assert_eq!(found.comments.len(), 1);
        assert_eq!(
            reopened.connections_of("alice").await.expect("connections"),
            vec!["bob".to_string()]
        );
    }

    #[tokio::test]
    async fn unreadable_data_file_is_a_storage_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.toml");
        std::fs::write(&path, "posts = 7").expect("write");

        match TomlStore::open(&path).await {
            Err(InfraError::Storage { message }) => assert!(message.contains("failed to parse")),
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("expected parse failure"),
        }
    }

    #[tokio::test]
    async fn failed_write_leaves_dataset_unchanged() {
        let dir = tempfile::tempdir().expect("tempdir");
        let data_dir = dir.path().join("data");
        std::fs::create_dir(&data_dir).expect("data dir");
        let store = TomlStore::open(data_dir.join("data.toml"))
            .await
            .expect("open");
        let kept = store
            .save_post(params("site-1", "alice", "kept"))
            .await
            .expect("post");
        let comment = store
            .save_comment(SaveCommentParams {
                id: None,
                post_id: kept.id,
                creator_id: "bob".to_string(),
                content: "reply".to_string(),
                created_at: None,
                modified_at: None,
            })
            .await
            .expect("comment");

        std::fs::remove_dir_all(&data_dir).expect("remove data dir");

        assert!(matches!(
            store.save_post(params("site-1", "alice", "lost")).await,
            Err(RepoError::Persistence(_))
        ));
        assert!(store.delete_post(&kept).await.is_err());
        assert!(store.delete_comment(comment.id).await.is_err());
        assert!(
            store
                .set_connections("alice", vec!["bob".to_string()])
                .await
                .is_err()
        );

        let posts = store
            .list_posts(&QuerySpec::scope("site-1", "site-1", "alice"))
            .await
            .expect("listed");
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, kept.id);
        assert_eq!(posts[0].comments, vec![comment]);
        assert!(
            store
                .connections_of("alice")
                .await
                .expect("connections")
                .is_empty()
        );
    }

    #[tokio::test]
    async fn supplied_timestamps_are_kept() {
        let store = TomlStore::in_memory();
        let mut post = params("site-1", "alice", "imported");
        post.created_at = Some(datetime!(2021-06-01 8:00 UTC));
        post.modified_at = Some(datetime!(2021-06-02 9:30 UTC));
        let saved = store.save_post(post).await.expect("post");

        let comment = store
            .save_comment(SaveCommentParams {
                id: None,
                post_id: saved.id,
                creator_id: "bob".to_string(),
                content: "old reply".to_string(),
                created_at: Some(datetime!(2021-06-01 10:00 UTC)),
                modified_at: Some(datetime!(2021-06-03 11:00 UTC)),
            })
            .await
            .expect("comment");

        assert_eq!(saved.created_at, datetime!(2021-06-01 8:00 UTC));
        assert_eq!(saved.modified_at, datetime!(2021-06-02 9:30 UTC));
        assert_eq!(comment.modified_at, datetime!(2021-06-03 11:00 UTC));
    }

    #[tokio::test]
    async fn unknown_user_has_no_connections() {
        let store = TomlStore::in_memory();
        assert!(
            store
                .connections_of("nobody")
                .await
                .expect("connections")
                .is_empty()
        );
    }
}
