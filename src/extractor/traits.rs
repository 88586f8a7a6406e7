use crate::extractor::models::{VideoIdentifier, VideoMetadata};
use crate::utils::error::RenameError;
use async_trait::async_trait;

/// A remote source that maps a video identifier to display metadata.
///
/// One call to [`MetadataSource::lookup`] is exactly one attempt; retrying
/// is the resolver's job.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Short name used in log lines (e.g. "youtube-oembed")
    fn id(&self) -> &'static str;

    async fn lookup(&self, id: &VideoIdentifier) -> Result<VideoMetadata, RenameError>;
}
