use std::{fs::File, io, num::NonZeroUsize, path::PathBuf, sync::Mutex, time::Duration};

use anyhow::{Context as _, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use nowplaying::lyrics::LyricsSource;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Player names to follow. `all` follows any MPRIS player, preferring one that is playing.
    #[clap(long, short, default_values_t = ["all".to_string()])]
    pub player: Vec<String>,
    /// Number of measures sharing the player
    #[clap(long, short, default_value = "1")]
    pub measures: NonZeroUsize,
    /// Polling interval in milliseconds
    #[clap(long, short, default_value_t = 1000)]
    pub interval_ms: u64,
    /// Directory to cache cover art in. Defaults to the platform cache directory.
    #[clap(long)]
    pub cache_dir: Option<PathBuf>,
    /// Don't resolve cover art
    #[clap(long)]
    pub no_cover: bool,
    /// Don't fetch lyrics
    #[clap(long)]
    pub no_lyrics: bool,
    /// Lyrics providers to query, in order
    #[clap(long, value_enum, default_values_t = [LyricsSource::Lrclib])]
    pub lyrics_provider: Vec<LyricsSource>,
    /// Navidrome server URL (e.g., "http://localhost:4533")
    /// --- only used if `lyrics_provider` includes `navidrome`
    #[clap(long)]
    pub navidrome_server_url: Option<String>,
    /// Navidrome username --- only used if `lyrics_provider` includes `navidrome`
    #[clap(long)]
    pub navidrome_username: Option<String>,
    /// Navidrome password --- only used if `lyrics_provider` includes `navidrome`
    #[clap(long)]
    pub navidrome_password: Option<String>,
    /// File to write the log to. If not specified, logs will be written to stderr.
    #[clap(long, short)]
    log_file: Option<PathBuf>,
}

impl Args {
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Build the tracing subscriber using parameters from the command line arguments
    ///
    /// # Errors
    ///
    /// Returns an error if the log file cannot be created.
    pub fn init_tracing_subscriber(&self) -> Result<()> {
        let builder = tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(EnvFilter::from_default_env());

        match self.log_file.as_ref() {
            None => builder.with_writer(io::stderr).init(),
            Some(f) => {
                let file = File::create(f)
                    .with_context(|| format!("Failed to create log file {}", f.display()))?;
                builder.with_writer(Mutex::new(file)).init();
            }
        }
        Ok(())
    }
}
