use std::{num::NonZeroU32, path::PathBuf};

/// Settings shared by every coordinator created from a [`crate::Registry`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Where resolved cover art is cached
    pub cache_dir: PathBuf,
    pub lyrics: LyricsConfig,
}

#[derive(Debug, Clone, Default)]
pub struct LyricsConfig {
    /// Give up on a track after this many fetches were invalidated by track
    /// changes. Unbounded if [`None`].
    pub max_attempts: Option<NonZeroU32>,
}

impl Config {
    #[must_use]
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            lyrics: LyricsConfig::default(),
        }
    }

    /// The platform cache directory, falling back to the system temporary directory.
    #[must_use]
    pub fn default_cache_dir() -> PathBuf {
        directories::ProjectDirs::from("", "", env!("CARGO_PKG_NAME")).map_or_else(
            || std::env::temp_dir().join(env!("CARGO_PKG_NAME")),
            |dirs| dirs.cache_dir().to_owned(),
        )
    }
}
