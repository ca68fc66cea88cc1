//! Entity reference strings (`/commons/{site}/posts/{post}`).

use std::fmt::{Display, Formatter};

use uuid::Uuid;

pub const ENTITY_PREFIX: &str = "commons";
const SEPARATOR: char = '/';
const POSTS_SEGMENT: &str = "posts";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityReference {
    /// The commons tool itself, with no particular entity.
    Root,
    Post { site_id: String, post_id: Uuid },
}

impl EntityReference {
    /// Parses a reference string, returning `None` for references that do
    /// not belong to commons or name an unknown entity kind.
    pub fn parse(reference: &str) -> Option<Self> {
        let mut parts = reference.split(SEPARATOR);

        // Leading separator yields an empty first segment.
        if parts.next() != Some("") || parts.next() != Some(ENTITY_PREFIX) {
            return None;
        }

        let Some(site_id) = parts.next() else {
            return Some(Self::Root);
        };
        let kind = parts.next()?;
        let entity_id = parts.next()?;
        if parts.next().is_some() || site_id.is_empty() || kind != POSTS_SEGMENT {
            return None;
        }

        let post_id = Uuid::parse_str(entity_id).ok()?;
        Some(Self::Post {
            site_id: site_id.to_string(),
            post_id,
        })
    }

    pub fn post(site_id: impl Into<String>, post_id: Uuid) -> Self {
        Self::Post {
            site_id: site_id.into(),
            post_id,
        }
    }

    pub fn post_id(&self) -> Option<Uuid> {
        match self {
            Self::Root => None,
            Self::Post { post_id, .. } => Some(*post_id),
        }
    }
}

impl Display for EntityReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Root => write!(f, "{SEPARATOR}{ENTITY_PREFIX}"),
            Self::Post { site_id, post_id } => write!(
                f,
                "{SEPARATOR}{ENTITY_PREFIX}{SEPARATOR}{site_id}{SEPARATOR}{POSTS_SEGMENT}{SEPARATOR}{post_id}"
            ),
        }
    }
}
