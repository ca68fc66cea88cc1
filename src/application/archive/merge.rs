use std::fmt::{Display, Formatter};

use tracing::{error, info, warn};

use crate::application::posts::{CommonsService, WriteError};

use super::codec::{MalformedNodeError, POST_TAG, decode_post};
use super::node::ArchiveElement;

const SOURCE: &str = "application::archive::merge";

/// A `post` element that could not be reconstructed.
#[derive(Debug)]
pub struct SkippedNode {
    /// Position among the `post` elements of the merged tree.
    pub index: usize,
    pub error: MalformedNodeError,
}

/// A write that failed while merging.
#[derive(Debug)]
pub struct MergeFailure {
    pub index: usize,
    /// `post` or `comment`.
    pub record: &'static str,
    pub error: WriteError,
}

/// Outcome of a merge run. Per-node problems are collected here instead of
/// aborting the run.
#[derive(Debug, Default)]
pub struct MergeReport {
    pub stored: usize,
    pub comments_stored: usize,
    pub skipped: Vec<SkippedNode>,
    pub failures: Vec<MergeFailure>,
}

impl MergeReport {
    pub fn summary(&self) -> String {
        format!("Stored {} posts.", self.stored)
    }

    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.failures.is_empty()
    }

    /// The first failed write, if any. Malformed nodes alone do not fail a
    /// merge.
    pub fn into_first_failure(self) -> Option<WriteError> {
        self.failures.into_iter().next().map(|failure| failure.error)
    }
}

impl Display for MergeReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.summary())?;
        if !self.skipped.is_empty() {
            write!(
                f,
                "\nSkipped {} malformed post element(s).",
                self.skipped.len()
            )?;
            for skipped in &self.skipped {
                write!(f, "\n  post element {}: {}", skipped.index, skipped.error)?;
            }
        }
        for failure in &self.failures {
            write!(
                f,
                "\nFailed to store {} from post element {}: {}",
                failure.record, failure.index, failure.error
            )?;
        }
        Ok(())
    }
}

/// Recreates archived posts and comments inside a target commons.
#[derive(Clone)]
pub struct MergeImporter {
    service: CommonsService,
}

impl MergeImporter {
    pub fn new(service: CommonsService) -> Self {
        Self { service }
    }

    /// Stores every `post` element found below `root` in `target_scope`.
    ///
    /// Posts get fresh identities; their comments are re-parented onto the
    /// new ids. Writes go through the regular service so cache invalidation
    /// applies.
    pub async fn merge(&self, root: &ArchiveElement, target_scope: &str) -> MergeReport {
        let mut report = MergeReport::default();
        let elements = root.descendants_named(POST_TAG);
        info!(
            target = SOURCE,
            target_scope,
            root_tag = %root.tag,
            candidates = elements.len(),
            "Merging archived posts"
        );

        for (index, element) in elements.into_iter().enumerate() {
            let archived = match decode_post(element) {
                Ok(archived) => archived,
                Err(error) => {
                    warn!(
                        target = SOURCE,
                        index,
                        error = %error,
                        "Skipping malformed post element"
                    );
                    report.skipped.push(SkippedNode { index, error });
                    continue;
                }
            };

            let post = match self.service.save_post(archived.to_params(target_scope)).await {
                Ok(post) => post,
                Err(error) => {
                    error!(
                        target = SOURCE,
                        index,
                        error = %error,
                        "Failed to store archived post"
                    );
                    report.failures.push(MergeFailure {
                        index,
                        record: "post",
                        error,
                    });
                    continue;
                }
            };
            report.stored += 1;

            for comment in &archived.comments {
                match self
                    .service
                    .save_comment(target_scope, comment.to_params(post.id))
                    .await
                {
                    Ok(_) => report.comments_stored += 1,
                    Err(error) => {
                        error!(
                            target = SOURCE,
                            index,
                            post_id = %post.id,
                            error = %error,
                            "Failed to store archived comment"
                        );
                        report.failures.push(MergeFailure {
                            index,
                            record: "comment",
                            error,
                        });
                    }
                }
            }
        }

        info!(
            target = SOURCE,
            target_scope,
            stored = report.stored,
            skipped = report.skipped.len(),
            failures = report.failures.len(),
            "Merge finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use time::OffsetDateTime;
    use time::macros::datetime;
    use uuid::Uuid;

    use super::*;
    use crate::application::archive::codec::COMMENT_TAG;
    use crate::application::repos::{
        ConnectionsRepo, PostsRepo, RepoError, SaveCommentParams, SavePostParams,
    };
    use crate::application::security::{PermissionChecker, SecurityError, SecurityFilter};
    use crate::cache::DisabledPostCache;
    use crate::domain::entities::{CommentRecord, PostRecord};
    use crate::domain::query::{PermissionContext, QuerySpec};

    #[derive(Default)]
    struct RecordingWriter {
        posts: Mutex<Vec<SavePostParams>>,
        comments: Mutex<Vec<SaveCommentParams>>,
        reject_content: Option<String>,
        reject_comments: bool,
    }

    #[async_trait]
    impl PostsRepo for RecordingWriter {
        async fn list_posts(&self, _spec: &QuerySpec) -> Result<Vec<PostRecord>, RepoError> {
            Ok(Vec::new())
        }

        async fn find_post(&self, _id: Uuid) -> Result<Option<PostRecord>, RepoError> {
            Ok(None)
        }

        async fn post_exists(&self, _id: Uuid) -> Result<bool, RepoError> {
            Ok(false)
        }

        async fn save_post(&self, params: SavePostParams) -> Result<PostRecord, RepoError> {
            if self.reject_content.as_deref() == Some(params.content.as_str()) {
                return Err(RepoError::invalid_input("rejected content"));
            }
            let now = OffsetDateTime::now_utc();
            let record = PostRecord {
                id: Uuid::new_v4(),
                commons_id: params.commons_id.clone(),
                site_id: params.site_id.clone(),
                creator_id: params.creator_id.clone(),
                content: params.content.clone(),
                comments: Vec::new(),
                created_at: params.created_at.unwrap_or(now),
                modified_at: params.modified_at.unwrap_or(now),
            };
            self.posts.lock().expect("posts lock").push(params);
            Ok(record)
        }

        async fn delete_post(&self, _post: &PostRecord) -> Result<bool, RepoError> {
            Ok(false)
        }

        async fn save_comment(
            &self,
            params: SaveCommentParams,
        ) -> Result<CommentRecord, RepoError> {
            if self.reject_comments {
                return Err(RepoError::integrity("comments disabled"));
            }
            let now = OffsetDateTime::now_utc();
            let record = CommentRecord {
                id: Uuid::new_v4(),
                post_id: params.post_id,
                creator_id: params.creator_id.clone(),
                content: params.content.clone(),
                created_at: now,
                modified_at: now,
            };
            self.comments.lock().expect("comments lock").push(params);
            Ok(record)
        }

        async fn delete_comment(&self, _id: Uuid) -> Result<bool, RepoError> {
            Ok(false)
        }
    }

    struct NoConnections;

    #[async_trait]
    impl ConnectionsRepo for NoConnections {
        async fn connections_of(&self, _user_id: &str) -> Result<Vec<String>, RepoError> {
            Ok(Vec::new())
        }
    }

    struct AllowAll;

    impl SecurityFilter for AllowAll {
        fn filter(
            &self,
            posts: &[PostRecord],
            _site_id: &str,
            _context: &PermissionContext,
        ) -> Result<Vec<PostRecord>, SecurityError> {
            Ok(posts.to_vec())
        }
    }

    impl PermissionChecker for AllowAll {
        fn can_delete_post(
            &self,
            _post: &PostRecord,
            _context: &PermissionContext,
        ) -> Result<bool, SecurityError> {
            Ok(true)
        }
    }

    fn importer(writer: Arc<RecordingWriter>) -> MergeImporter {
        MergeImporter::new(CommonsService::new(
            writer,
            Arc::new(NoConnections),
            Arc::new(DisabledPostCache),
            Arc::new(AllowAll),
            Arc::new(AllowAll),
        ))
    }

    fn post_element(creator: &str, content: &str, comments: &[&str]) -> ArchiveElement {
        let mut element = ArchiveElement::new(POST_TAG)
            .with_attribute("id", Uuid::new_v4().to_string())
            .with_attribute("commonsId", "site-1")
            .with_attribute("creatorId", creator)
            .with_attribute("createdDate", "2023-11-05T08:00:00Z");
        element.push_text(content);
        for text in comments {
            let mut comment = ArchiveElement::new(COMMENT_TAG).with_attribute("creatorId", "bob");
            comment.push_text(*text);
            element.push_element(comment);
        }
        element
    }

    fn archive(posts: Vec<ArchiveElement>) -> ArchiveElement {
        let mut commons = ArchiveElement::new("commons");
        for post in posts {
            commons.push_element(post);
        }
        let mut service = ArchiveElement::new("CommonsManager").with_attribute("version", "1.0");
        service.push_text("\n");
        service.push_element(commons);
        let mut root = ArchiveElement::new("archive");
        root.push_element(service);
        root
    }

    #[tokio::test]
    async fn skips_malformed_post_and_stores_the_rest() {
        let writer = Arc::new(RecordingWriter::default());
        let root = archive(vec![
            post_element("alice", "one", &[]),
            post_element("alice", "two", &["c1"]),
            ArchiveElement::new(POST_TAG).with_attribute("creatorId", "mallory"),
            post_element("carol", "three", &[]),
        ]);

        let report = importer(writer.clone()).merge(&root, "site-2").await;

        assert_eq!(report.summary(), "Stored 3 posts.");
        assert_eq!(report.stored, 3);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].index, 2);
        assert!(report.failures.is_empty());

        let stored = writer.posts.lock().expect("posts lock");
        let contents: Vec<_> = stored.iter().map(|p| p.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn posts_are_rebound_to_target_scope_with_fresh_ids() {
        let writer = Arc::new(RecordingWriter::default());
        let root = archive(vec![post_element("alice", "hello", &["first", "second"])]);

        let report = importer(writer.clone()).merge(&root, "site-2").await;
        assert!(report.is_clean());
        assert_eq!(report.comments_stored, 2);

        let posts = writer.posts.lock().expect("posts lock");
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, None);
        assert_eq!(posts[0].commons_id, "site-2");
        assert_eq!(posts[0].site_id, "site-2");
        assert_eq!(posts[0].created_at, Some(datetime!(2023-11-05 08:00 UTC)));

        let comments = writer.comments.lock().expect("comments lock");
        let texts: Vec<_> = comments.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert!(comments.iter().all(|c| c.post_id == comments[0].post_id));
    }

    #[tokio::test]
    async fn storage_failures_do_not_stop_the_merge() {
        let writer = Arc::new(RecordingWriter {
            reject_content: Some("bad".to_string()),
            ..Default::default()
        });
        let root = archive(vec![
            post_element("alice", "bad", &[]),
            post_element("alice", "good", &[]),
        ]);

        let report = importer(writer).merge(&root, "site-2").await;

        assert_eq!(report.stored, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].record, "post");
        assert_eq!(report.failures[0].index, 0);
        assert!(report.to_string().starts_with("Stored 1 posts.\nFailed to store post"));
        match report.into_first_failure() {
            Some(WriteError::Storage(RepoError::InvalidInput { message })) => {
                assert_eq!(message, "rejected content")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn comment_failures_are_recorded_but_post_counts() {
        let writer = Arc::new(RecordingWriter {
            reject_comments: true,
            ..Default::default()
        });
        let root = archive(vec![post_element("alice", "hello", &["x"])]);

        let report = importer(writer).merge(&root, "site-2").await;

        assert_eq!(report.summary(), "Stored 1 posts.");
        assert_eq!(report.comments_stored, 0);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].record, "comment");
    }

    #[tokio::test]
    async fn empty_tree_stores_nothing() {
        let writer = Arc::new(RecordingWriter::default());
        let report = importer(writer)
            .merge(&ArchiveElement::new("archive"), "site-2")
            .await;

        assert_eq!(report.to_string(), "Stored 0 posts.");
    }

    #[tokio::test]
    async fn report_lists_skipped_nodes() {
        let writer = Arc::new(RecordingWriter::default());
        let root = archive(vec![ArchiveElement::new(POST_TAG)]);

        let report = importer(writer).merge(&root, "site-2").await;

        let rendered = report.to_string();
        assert!(rendered.starts_with("Stored 0 posts.\nSkipped 1 malformed post element(s)."));
        assert!(rendered.contains("post element 0: `post` element is missing attribute `creatorId`"));
    }
}
