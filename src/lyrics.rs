//! Network lyrics providers.

pub(crate) mod fetch;
pub mod lrclib;
pub mod navidrome;

use clap::ValueEnum;
use futures::future::BoxFuture;

pub use lrclib::LrclibProvider;
pub use navidrome::{NavidromeConfig, NavidromeProvider};

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum LyricsSource {
    Lrclib,
    Navidrome,
}

/// A source of lyrics for a given artist and title.
///
/// Lookups are best-effort: any network or provider error is reported as
/// "not found".
pub trait LyricsProvider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Look up the lyrics of a track, returning [`None`] if they can't be found.
    fn fetch_lyrics<'a>(&'a self, artist: &'a str, title: &'a str)
        -> BoxFuture<'a, Option<String>>;
}

/// Queries providers in order until one of them finds the lyrics.
#[derive(Default)]
pub struct ProviderChain {
    providers: Vec<Box<dyn LyricsProvider>>,
}

impl ProviderChain {
    #[must_use]
    pub fn new(providers: Vec<Box<dyn LyricsProvider>>) -> Self {
        Self { providers }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl LyricsProvider for ProviderChain {
    fn name(&self) -> &'static str {
        "chain"
    }

    fn fetch_lyrics<'a>(
        &'a self,
        artist: &'a str,
        title: &'a str,
    ) -> BoxFuture<'a, Option<String>> {
        Box::pin(async move {
            for provider in &self.providers {
                if let Some(lyrics) = provider.fetch_lyrics(artist, title).await {
                    tracing::info!(provider = provider.name(), %artist, %title, "Found lyrics");
                    return Some(lyrics);
                }
                tracing::debug!(provider = provider.name(), %artist, %title, "No lyrics from provider");
            }
            None
        })
    }
}
