pub mod api;
pub mod types;
pub mod utils;

use futures::future::BoxFuture;
use tracing::{debug, warn};

// Re-export main functionality
pub use api::NavidromeClient;
pub use types::{NavidromeConfig, TrackQuery};

use super::LyricsProvider;

/// Lyrics from a Navidrome (or any Subsonic-compatible) server
pub struct NavidromeProvider {
    client: NavidromeClient,
}

impl NavidromeProvider {
    pub fn new(config: NavidromeConfig) -> Self {
        Self {
            client: NavidromeClient::new(config),
        }
    }
}

impl LyricsProvider for NavidromeProvider {
    fn name(&self) -> &'static str {
        "navidrome"
    }

    fn fetch_lyrics<'a>(
        &'a self,
        artist: &'a str,
        title: &'a str,
    ) -> BoxFuture<'a, Option<String>> {
        Box::pin(async move {
            debug!("Starting Navidrome lyrics fetch");
            match self.client.fetch_lyrics(&TrackQuery { artist, title }).await {
                Ok(lyrics) => lyrics,
                Err(e) => {
                    warn!("Failed to fetch lyrics from Navidrome: {}", e);
                    None
                }
            }
        })
    }
}
