//! Media-server notification after a run

pub mod plex;

use crate::utils::error::RenameError;
use async_trait::async_trait;

pub use plex::PlexNotifier;

/// Asks a media server to rescan its library
#[async_trait]
pub trait LibraryNotifier: Send + Sync {
    fn id(&self) -> &'static str;

    async fn refresh(&self) -> Result<(), RenameError>;
}
