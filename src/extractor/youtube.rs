//! YouTube metadata lookup through the public oEmbed endpoint.

use crate::extractor::models::{VideoIdentifier, VideoMetadata};
use crate::extractor::traits::MetadataSource;
use crate::utils::error::RenameError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "https://www.youtube.com";

#[derive(Debug, Deserialize)]
struct OembedResponse {
    #[serde(default)]
    title: String,
    #[serde(default)]
    author_name: String,
}

pub struct YoutubeOembedSource {
    client: Client,
    endpoint: String,
}

impl YoutubeOembedSource {
    pub fn new(endpoint: &str) -> Result<Self, RenameError> {
        let client = Client::builder()
            .user_agent(concat!("tuberename/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn watch_url(id: &VideoIdentifier) -> String {
        format!("https://www.youtube.com/watch?v={}", id)
    }

    fn oembed_url(&self) -> String {
        format!("{}/oembed", self.endpoint)
    }
}

#[async_trait]
impl MetadataSource for YoutubeOembedSource {
    fn id(&self) -> &'static str {
        "youtube-oembed"
    }

    async fn lookup(&self, id: &VideoIdentifier) -> Result<VideoMetadata, RenameError> {
        let watch_url = Self::watch_url(id);
        debug!(video_id = %id, "Requesting oEmbed metadata");

        let response = self
            .client
            .get(self.oembed_url())
            .query(&[("url", watch_url.as_str()), ("format", "json")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RenameError::HttpStatus(response.status()));
        }

        let body = response.text().await?;
        let parsed: OembedResponse = serde_json::from_str(&body)?;

        let title = parsed.title.trim();
        let channel_name = parsed.author_name.trim();
        if title.is_empty() || channel_name.is_empty() {
            return Err(RenameError::MetadataUnavailable(format!(
                "empty title or channel for {}",
                id
            )));
        }

        Ok(VideoMetadata {
            title: title.to_string(),
            channel_name: channel_name.to_string(),
        })
    }
}
