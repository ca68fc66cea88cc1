//! Cache key definitions.

use std::fmt::{Display, Formatter};

use crate::domain::query::{AudienceMode, QuerySpec};

/// Identifies one cached post list.
///
/// A scope entry is shared by every caller reading that commons; a personal
/// feed entry belongs to a single caller. The variant keeps the two apart
/// even when a caller id and a commons id are the same string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PostListKey {
    Scope(String),
    PersonalFeed(String),
}

impl PostListKey {
    pub fn for_query(spec: &QuerySpec) -> Self {
        match spec.mode {
            AudienceMode::Scope => Self::Scope(spec.commons_id.clone()),
            AudienceMode::PersonalFeed => Self::PersonalFeed(spec.caller_id.clone()),
        }
    }

    pub fn scope(commons_id: impl Into<String>) -> Self {
        Self::Scope(commons_id.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Scope(id) | Self::PersonalFeed(id) => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scope(_) => "scope",
            Self::PersonalFeed(_) => "personal_feed",
        }
    }
}

impl Display for PostListKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
