//! Mapping between posts and archive elements.

use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::application::repos::{SaveCommentParams, SavePostParams};
use crate::domain::entities::{CommentRecord, PostRecord};

use super::ArchiveError;
use super::node::ArchiveElement;

pub const COMMONS_TAG: &str = "commons";
pub const POST_TAG: &str = "post";
pub const COMMENT_TAG: &str = "comment";

const ID_ATTR: &str = "id";
const COMMONS_ID_ATTR: &str = "commonsId";
const SITE_ID_ATTR: &str = "siteId";
const POST_ID_ATTR: &str = "postId";
const CREATOR_ID_ATTR: &str = "creatorId";
const CREATED_ATTR: &str = "createdDate";
const MODIFIED_ATTR: &str = "modifiedDate";

/// An archive element that cannot be turned back into a post.
#[derive(Debug, Error)]
pub enum MalformedNodeError {
    #[error("`{tag}` element is missing attribute `{attribute}`")]
    MissingAttribute {
        tag: &'static str,
        attribute: &'static str,
    },
    #[error("`{tag}` element has no content")]
    MissingContent { tag: &'static str },
    #[error("`{tag}` attribute `{attribute}` is not a valid {expected}: `{value}`")]
    InvalidAttribute {
        tag: &'static str,
        attribute: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("comment {index} is malformed: {source}")]
    Comment {
        index: usize,
        #[source]
        source: Box<MalformedNodeError>,
    },
}

/// A post read back from an archive, not yet bound to a scope.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedPost {
    pub id: Option<Uuid>,
    pub creator_id: String,
    pub content: String,
    pub created_at: Option<OffsetDateTime>,
    pub modified_at: Option<OffsetDateTime>,
    pub comments: Vec<ArchivedComment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedComment {
    pub creator_id: String,
    pub content: String,
    pub created_at: Option<OffsetDateTime>,
    pub modified_at: Option<OffsetDateTime>,
}

impl ArchivedPost {
    /// Save parameters placing the post in `target_scope` under a fresh
    /// identity.
    pub fn to_params(&self, target_scope: &str) -> SavePostParams {
        SavePostParams {
            id: None,
            commons_id: target_scope.to_string(),
            site_id: target_scope.to_string(),
            creator_id: self.creator_id.clone(),
            content: self.content.clone(),
            created_at: self.created_at,
            modified_at: self.modified_at,
        }
    }
}

impl ArchivedComment {
    pub fn to_params(&self, post_id: Uuid) -> SaveCommentParams {
        SaveCommentParams {
            id: None,
            post_id,
            creator_id: self.creator_id.clone(),
            content: self.content.clone(),
            created_at: self.created_at,
            modified_at: self.modified_at,
        }
    }
}

pub fn encode_post(post: &PostRecord) -> Result<ArchiveElement, ArchiveError> {
    let mut element = ArchiveElement::new(POST_TAG)
        .with_attribute(ID_ATTR, post.id.to_string())
        .with_attribute(COMMONS_ID_ATTR, post.commons_id.as_str())
        .with_attribute(SITE_ID_ATTR, post.site_id.as_str())
        .with_attribute(CREATOR_ID_ATTR, post.creator_id.as_str())
        .with_attribute(CREATED_ATTR, format_timestamp(post.created_at)?)
        .with_attribute(MODIFIED_ATTR, format_timestamp(post.modified_at)?);
    element.push_text(post.content.as_str());

    for comment in &post.comments {
        element.push_element(encode_comment(comment)?);
    }

    Ok(element)
}

fn encode_comment(comment: &CommentRecord) -> Result<ArchiveElement, ArchiveError> {
    let mut element = ArchiveElement::new(COMMENT_TAG)
        .with_attribute(ID_ATTR, comment.id.to_string())
        .with_attribute(POST_ID_ATTR, comment.post_id.to_string())
        .with_attribute(CREATOR_ID_ATTR, comment.creator_id.as_str())
        .with_attribute(CREATED_ATTR, format_timestamp(comment.created_at)?)
        .with_attribute(MODIFIED_ATTR, format_timestamp(comment.modified_at)?);
    element.push_text(comment.content.as_str());
    Ok(element)
}

fn format_timestamp(value: OffsetDateTime) -> Result<String, ArchiveError> {
    Ok(value.format(&Rfc3339)?)
}

/// Reads a `post` element and its direct `comment` children.
pub fn decode_post(element: &ArchiveElement) -> Result<ArchivedPost, MalformedNodeError> {
    let id = optional_uuid(element, POST_TAG, ID_ATTR)?;
    let creator_id = required_attribute(element, POST_TAG, CREATOR_ID_ATTR)?;
    let content = element
        .text()
        .ok_or(MalformedNodeError::MissingContent { tag: POST_TAG })?;
    let created_at = optional_timestamp(element, POST_TAG, CREATED_ATTR)?;
    let modified_at = optional_timestamp(element, POST_TAG, MODIFIED_ATTR)?;

    let comments = element
        .elements()
        .filter(|child| child.tag == COMMENT_TAG)
        .enumerate()
        .map(|(index, child)| {
            decode_comment(child).map_err(|source| MalformedNodeError::Comment {
                index,
                source: Box::new(source),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ArchivedPost {
        id,
        creator_id,
        content,
        created_at,
        modified_at,
        comments,
    })
}

fn decode_comment(element: &ArchiveElement) -> Result<ArchivedComment, MalformedNodeError> {
    let creator_id = required_attribute(element, COMMENT_TAG, CREATOR_ID_ATTR)?;
    let content = element
        .text()
        .ok_or(MalformedNodeError::MissingContent { tag: COMMENT_TAG })?;
    let created_at = optional_timestamp(element, COMMENT_TAG, CREATED_ATTR)?;
    let modified_at = optional_timestamp(element, COMMENT_TAG, MODIFIED_ATTR)?;

    Ok(ArchivedComment {
        creator_id,
        content,
        created_at,
        modified_at,
    })
}

fn required_attribute(
    element: &ArchiveElement,
    tag: &'static str,
    attribute: &'static str,
) -> Result<String, MalformedNodeError> {
    element
        .attribute(attribute)
        .filter(|value| !value.trim().is_empty())
        .map(str::to_string)
        .ok_or(MalformedNodeError::MissingAttribute { tag, attribute })
}

fn optional_timestamp(
    element: &ArchiveElement,
    tag: &'static str,
    attribute: &'static str,
) -> Result<Option<OffsetDateTime>, MalformedNodeError> {
    element
        .attribute(attribute)
        .map(|value| {
            OffsetDateTime::parse(value, &Rfc3339).map_err(|_| {
                MalformedNodeError::InvalidAttribute {
                    tag,
                    attribute,
                    expected: "RFC 3339 timestamp",
                    value: value.to_string(),
                }
            })
        })
        .transpose()
}

fn optional_uuid(
    element: &ArchiveElement,
    tag: &'static str,
    attribute: &'static str,
) -> Result<Option<Uuid>, MalformedNodeError> {
    element
        .attribute(attribute)
        .map(|value| {
            Uuid::parse_str(value).map_err(|_| MalformedNodeError::InvalidAttribute {
                tag,
                attribute,
                expected: "UUID",
                value: value.to_string(),
            })
        })
        .transpose()
}
