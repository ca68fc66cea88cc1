//! Retrieval requests.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use crate::domain::error::DomainError;

/// Which audience a retrieval request is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudienceMode {
    /// Posts of a single commons.
    Scope,
    /// Posts authored by the caller and everyone the caller is connected to.
    PersonalFeed,
}

/// Opaque permission token handed through to the security filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PermissionContext(String);

impl PermissionContext {
    const SITE: &'static str = "SITE";

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Site-wide administrative reads (archiving, maintenance).
    pub fn site() -> Self {
        Self(Self::SITE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_site(&self) -> bool {
        self.0 == Self::SITE
    }
}

impl Display for PermissionContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A retrieval request.
///
/// Built once per request. `from_ids` stays empty until the audience of a
/// personal feed has been expanded, and the expanded set is never carried
/// over to another request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub commons_id: String,
    pub site_id: String,
    pub caller_id: String,
    pub mode: AudienceMode,
    pub from_ids: BTreeSet<String>,
    pub context: PermissionContext,
}

impl QuerySpec {
    /// Posts of one commons, as seen by `caller_id`.
    pub fn scope(
        commons_id: impl Into<String>,
        site_id: impl Into<String>,
        caller_id: impl Into<String>,
    ) -> Self {
        Self {
            commons_id: commons_id.into(),
            site_id: site_id.into(),
            caller_id: caller_id.into(),
            mode: AudienceMode::Scope,
            from_ids: BTreeSet::new(),
            context: PermissionContext::new(String::new()),
        }
    }

    /// The caller's personal feed, hosted in the caller's own site.
    pub fn personal_feed(site_id: impl Into<String>, caller_id: impl Into<String>) -> Self {
        let site_id = site_id.into();
        Self {
            commons_id: site_id.clone(),
            site_id,
            caller_id: caller_id.into(),
            mode: AudienceMode::PersonalFeed,
            from_ids: BTreeSet::new(),
            context: PermissionContext::new(String::new()),
        }
    }

    /// Every post of a site's commons, read with site-wide permissions.
    pub fn site_archive(site_id: impl Into<String>) -> Self {
        let site_id = site_id.into();
        Self {
            commons_id: site_id.clone(),
            site_id,
            caller_id: String::new(),
            mode: AudienceMode::Scope,
            from_ids: BTreeSet::new(),
            context: PermissionContext::site(),
        }
    }

    pub fn with_context(mut self, context: PermissionContext) -> Self {
        self.context = context;
        self
    }

    pub fn is_personal_feed(&self) -> bool {
        self.mode == AudienceMode::PersonalFeed
    }

    /// Rejects requests that cannot be keyed.
    pub fn validate(&self) -> Result<(), DomainError> {
        match self.mode {
            AudienceMode::PersonalFeed if self.caller_id.trim().is_empty() => Err(
                DomainError::validation("personal feed requests need a caller"),
            ),
            AudienceMode::Scope if self.commons_id.trim().is_empty() => {
                Err(DomainError::validation("scope requests need a commons id"))
            }
            _ => Ok(()),
        }
    }
}
