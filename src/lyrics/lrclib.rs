use anyhow::{anyhow, Result};
use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use super::LyricsProvider;

const DEFAULT_SERVER_URL: &str = "https://lrclib.net";

/// Record returned by `GET /api/get`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LrclibRecord {
    #[serde(default)]
    pub instrumental: bool,
    pub plain_lyrics: Option<String>,
    pub synced_lyrics: Option<String>,
}

impl LrclibRecord {
    /// Plain lyrics if present, synced lyrics with their time tags stripped otherwise.
    fn into_text(self) -> Option<String> {
        if self.instrumental {
            return None;
        }
        self.plain_lyrics
            .filter(|l| !l.trim().is_empty())
            .or_else(|| {
                self.synced_lyrics
                    .map(|l| strip_time_tags(&l))
                    .filter(|l| !l.trim().is_empty())
            })
    }
}

/// Remove leading `[mm:ss.xx]` tags from every line.
fn strip_time_tags(synced: &str) -> String {
    synced
        .lines()
        .map(|mut line| {
            while let Some(rest) = line
                .strip_prefix('[')
                .and_then(|l| l.split_once(']'))
                .map(|(_, rest)| rest)
            {
                line = rest;
            }
            line.trim_start()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Client for the public LRCLIB lyrics database.
#[derive(Debug, Clone)]
pub struct LrclibProvider {
    server_url: String,
    client: Client,
}

impl Default for LrclibProvider {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_URL)
    }
}

impl LrclibProvider {
    #[must_use]
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            client: Client::new(),
        }
    }

    async fn lookup(&self, artist: &str, title: &str) -> Result<Option<String>> {
        let url = format!("{}/api/get", self.server_url);
        debug!(%url, %artist, %title, "Querying LRCLIB");

        let response = self
            .client
            .get(&url)
            .query(&[("artist_name", artist), ("track_name", title)])
            .header(
                reqwest::header::USER_AGENT,
                concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),
            )
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(anyhow!("LRCLIB request failed: {}", response.status()));
        }

        let record: LrclibRecord = response.json().await?;
        Ok(record.into_text())
    }
}

impl LyricsProvider for LrclibProvider {
    fn name(&self) -> &'static str {
        "lrclib"
    }

    fn fetch_lyrics<'a>(
        &'a self,
        artist: &'a str,
        title: &'a str,
    ) -> BoxFuture<'a, Option<String>> {
        Box::pin(async move {
            self.lookup(artist, title)
                .await
                .inspect_err(|e| warn!("Failed to fetch lyrics from LRCLIB: {:?}", e))
                .ok()
                .flatten()
        })
    }
}
