use std::fmt::{Display, Formatter};

use tracing::{info, warn};

use crate::application::posts::CommonsService;
use crate::domain::query::QuerySpec;

use super::codec::{COMMONS_TAG, encode_post};
use super::node::ArchiveElement;
use super::{ARCHIVE_LABEL, ArchiveConfig, ArchiveError};

const VERSION_ATTR: &str = "version";

/// Narrative returned by an export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    lines: Vec<String>,
    archived: usize,
    failed: bool,
}

impl ArchiveSummary {
    fn started() -> Self {
        Self {
            lines: vec![format!("{ARCHIVE_LABEL}: Started.")],
            archived: 0,
            failed: false,
        }
    }

    fn finished(&mut self, archived: usize) {
        self.archived = archived;
        self.lines.push(format!(
            "{ARCHIVE_LABEL}: Finished. {archived} post(s) archived."
        ));
    }

    fn record_failure(&mut self, error: &ArchiveError) {
        self.failed = true;
        self.lines
            .push(format!("{ARCHIVE_LABEL}: exception caught. Message: {error}"));
    }

    pub fn archived(&self) -> usize {
        self.archived
    }

    pub fn is_success(&self) -> bool {
        !self.failed
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl Display for ArchiveSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Writes every post of a site into an archive tree.
#[derive(Clone)]
pub struct ArchiveExporter {
    service: CommonsService,
    config: ArchiveConfig,
}

impl ArchiveExporter {
    pub fn new(service: CommonsService, config: ArchiveConfig) -> Self {
        Self { service, config }
    }

    /// Appends one service element for `site_id` to `parent`.
    ///
    /// The element is attached exactly once on every path. If reading or
    /// encoding fails, whatever was built before the failure is kept and
    /// the failure is reported in the summary.
    pub async fn export(&self, site_id: &str, parent: &mut ArchiveElement) -> ArchiveSummary {
        let mut summary = ArchiveSummary::started();
        info!(
            target = "application::archive::export",
            site_id, "Archiving commons"
        );

        let mut service_element = ArchiveElement::new(self.config.service_name.as_str())
            .with_attribute(VERSION_ATTR, self.config.format_version.as_str());
        let outcome = self.fill(site_id, &mut service_element).await;
        parent.push_element(service_element);

        match outcome {
            Ok(archived) => {
                info!(
                    target = "application::archive::export",
                    site_id, archived, "Archived commons"
                );
                summary.finished(archived);
            }
            Err(err) => {
                warn!(
                    target = "application::archive::export",
                    site_id,
                    error = %err,
                    "Archiving commons failed"
                );
                summary.record_failure(&err);
            }
        }

        summary
    }

    async fn fill(
        &self,
        site_id: &str,
        service_element: &mut ArchiveElement,
    ) -> Result<usize, ArchiveError> {
        let posts = self
            .service
            .get_posts(QuerySpec::site_archive(site_id))
            .await?;

        let mut commons = ArchiveElement::new(COMMONS_TAG);
        let encoded = posts.iter().try_fold(0usize, |count, post| {
            commons.push_element(encode_post(post)?);
            Ok::<_, ArchiveError>(count + 1)
        });
        service_element.push_element(commons);

        encoded
    }
}
