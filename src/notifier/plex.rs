use crate::notifier::LibraryNotifier;
use crate::utils::config::PipelineConfig;
use crate::utils::error::RenameError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::info;

/// Triggers `GET /library/sections/{id}/refresh` on a Plex server
pub struct PlexNotifier {
    client: Client,
    base_url: String,
    token: String,
    section_id: String,
}

impl PlexNotifier {
    pub fn new(base_url: &str, token: &str, section_id: &str) -> Result<Self, RenameError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.trim().to_string(),
            section_id: section_id.trim().to_string(),
        })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self, RenameError> {
        Self::new(
            &config.plex_url,
            &config.plex_token,
            &config.library_section_id,
        )
    }

    pub fn is_configured(&self) -> bool {
        !self.token.is_empty() && !self.section_id.is_empty()
    }

    fn refresh_url(&self) -> String {
        format!(
            "{}/library/sections/{}/refresh",
            self.base_url, self.section_id
        )
    }
}

#[async_trait]
impl LibraryNotifier for PlexNotifier {
    fn id(&self) -> &'static str {
        "plex"
    }

    async fn refresh(&self) -> Result<(), RenameError> {
        if !self.is_configured() {
            info!("Plex token or library section id missing, skipping library scan");
            return Ok(());
        }

        let response = self
            .client
            .get(self.refresh_url())
            .header("X-Plex-Token", &self.token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RenameError::HttpStatus(response.status()));
        }

        info!(section = %self.section_id, "Triggered Plex library scan");
        Ok(())
    }
}
