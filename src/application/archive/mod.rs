//! Export of a commons to an archive tree and merge of such a tree back
//! into a (possibly different) commons.

mod codec;
mod document;
mod export;
mod merge;
mod node;

use thiserror::Error;

use crate::application::posts::RetrievalError;

pub use codec::{
    ArchivedComment, ArchivedPost, COMMENT_TAG, COMMONS_TAG, MalformedNodeError, POST_TAG,
    decode_post, encode_post,
};
pub use document::ArchiveDocument;
pub use export::{ArchiveExporter, ArchiveSummary};
pub use merge::{MergeFailure, MergeImporter, MergeReport, SkippedNode};
pub use node::{ArchiveElement, ArchiveNode};

/// Label prefixed to every line of the export narrative.
pub const ARCHIVE_LABEL: &str = "commons";

const DEFAULT_SERVICE_NAME: &str = "CommonsManager";
const DEFAULT_FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to read posts: {0}")]
    Retrieval(#[from] RetrievalError),
    #[error("failed to encode timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
    #[error("failed to encode archive: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("failed to decode archive: {0}")]
    Decode(#[from] toml::de::Error),
}

/// Naming of the service element written by the exporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveConfig {
    pub service_name: String,
    pub format_version: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            format_version: DEFAULT_FORMAT_VERSION.to_string(),
        }
    }
}

impl From<&crate::config::ArchiveSettings> for ArchiveConfig {
    fn from(settings: &crate::config::ArchiveSettings) -> Self {
        Self {
            service_name: settings.service_name.clone(),
            format_version: settings.format_version.clone(),
        }
    }
}
