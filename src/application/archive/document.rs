use serde::{Deserialize, Serialize};

use super::ArchiveError;
use super::node::ArchiveElement;

const ROOT_TAG: &str = "archive";
const SOURCE_SITE_ATTR: &str = "source";

/// An archive tree as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveDocument {
    pub root: ArchiveElement,
}

impl ArchiveDocument {
    /// Empty document recording the site it was exported from.
    pub fn new(source_site: &str) -> Self {
        Self {
            root: ArchiveElement::new(ROOT_TAG).with_attribute(SOURCE_SITE_ATTR, source_site),
        }
    }

    pub fn source_site(&self) -> Option<&str> {
        self.root.attribute(SOURCE_SITE_ATTR)
    }

    pub fn to_toml(&self) -> Result<String, ArchiveError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn from_toml(input: &str) -> Result<Self, ArchiveError> {
        Ok(toml::from_str(input)?)
    }
}
