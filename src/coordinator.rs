//! Shared state of one media player, refreshed once per polling round.
//!
//! Every measure attached to a player polls the same [`Coordinator`]. Polls
//! are counted, and the backend is refreshed only when all attached measures
//! have polled, so the player is queried once per cycle however many
//! measures display it.

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
};

use bitflags::bitflags;
use parking_lot::{Mutex, RwLock};

use crate::{
    backend::Backend,
    config::{Config, LyricsConfig},
    cover::CoverResolver,
    lyrics::{
        fetch::{self, LyricsSlot, TrackIdentity},
        LyricsProvider,
    },
    player::{Command, PlaybackStatus, PlayerReport, PlayerSnapshot},
};


bitflags! {
    /// Auxiliary assets a coordinator resolves for the current track.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Capabilities: u8 {
        const COVER = 1;
        const LYRICS = 1 << 1;
    }
}

#[derive(Debug, Default)]
struct TrackState {
    report: PlayerReport,
    cover_path: PathBuf,
    /// Epoch the cover was last looked up for
    cover_epoch: Option<u64>,
    /// Bumped on every change of (artist, title)
    epoch: u64,
}

/// State reachable from background fetches.
struct Shared {
    track: RwLock<TrackState>,
    /// Held by the running fetch, if any
    lyrics: Arc<tokio::sync::Mutex<LyricsSlot>>,
}

impl Shared {
    fn identity(&self) -> TrackIdentity {
        let track = self.track.read();
        TrackIdentity {
            epoch: track.epoch,
            artist: track.report.artist.clone(),
            title: track.report.title.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct Cycle {
    instances: usize,
    votes: usize,
}

pub struct Coordinator {
    name: String,
    shared: Arc<Shared>,
    /// Also serializes refreshes
    backend: Mutex<Box<dyn Backend>>,
    cycle: Mutex<Cycle>,
    capabilities: AtomicU8,
    cover: CoverResolver,
    lyrics_provider: Arc<dyn LyricsProvider>,
    lyrics_config: LyricsConfig,
}

impl Coordinator {
    pub(crate) fn new(
        name: String,
        backend: Box<dyn Backend>,
        config: &Config,
        lyrics_provider: Arc<dyn LyricsProvider>,
    ) -> Self {
        Self {
            name,
            shared: Arc::new(Shared {
                track: RwLock::default(),
                lyrics: Arc::default(),
            }),
            backend: Mutex::new(backend),
            cycle: Mutex::default(),
            capabilities: AtomicU8::new(Capabilities::empty().bits()),
            cover: CoverResolver::new(config.cache_dir.clone()),
            lyrics_provider,
            lyrics_config: config.lyrics.clone(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Count one more measure. Returns the number of attached measures.
    pub(crate) fn attach(&self) -> usize {
        let mut cycle = self.cycle.lock();
        cycle.instances += 1;
        cycle.instances
    }

    /// Count one measure less. Returns the number of measures still attached.
    pub(crate) fn detach(&self) -> usize {
        let mut cycle = self.cycle.lock();
        cycle.instances = cycle.instances.saturating_sub(1);
        cycle.votes = cycle.votes.min(cycle.instances);
        cycle.instances
    }

    /// Start resolving the given assets. Capabilities are never removed.
    pub fn register(&self, capabilities: Capabilities) {
        let previous = Capabilities::from_bits_truncate(
            self.capabilities
                .fetch_or(capabilities.bits(), Ordering::AcqRel),
        );
        if !previous.contains(capabilities) {
            tracing::debug!(coordinator = %self.name, ?capabilities, "Registered capabilities");
        }
    }

    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::from_bits_truncate(self.capabilities.load(Ordering::Acquire))
    }

    /// Vote for a refresh. The vote completing the round refreshes the
    /// player and starts a new round; returns whether this call did so.
    pub fn poll(&self) -> bool {
        {
            let mut cycle = self.cycle.lock();
            cycle.votes += 1;
            if cycle.votes < cycle.instances {
                return false;
            }
            cycle.votes = 0;
        }
        self.refresh();
        true
    }

    fn refresh(&self) {
        let mut backend = self.backend.lock();
        let report = backend.refresh().unwrap_or_else(|e| {
            tracing::debug!(coordinator = %self.name, ?e, "Player unavailable");
            PlayerReport::cleared(self.shared.track.read().report.volume)
        });
        self.apply(report);
    }

    /// Swap in a new report, resolving assets if the track changed.
    fn apply(&self, report: PlayerReport) {
        let capabilities = self.capabilities();

        let (changed, epoch, mut cover_path, mut cover_epoch) = {
            let track = self.shared.track.read();
            let changed = !track.report.same_track(&report);
            if changed {
                (true, track.epoch + 1, PathBuf::new(), None)
            } else {
                (false, track.epoch, track.cover_path.clone(), track.cover_epoch)
            }
        };

        if changed {
            tracing::info!(
                coordinator = %self.name,
                epoch,
                artist = %report.artist,
                title = %report.title,
                "Track changed"
            );
        }

        if capabilities.contains(Capabilities::COVER) && cover_epoch != Some(epoch) {
            cover_path = self.resolve_cover(&report);
            cover_epoch = Some(epoch);
        }

        *self.shared.track.write() = TrackState {
            report,
            cover_path,
            cover_epoch,
            epoch,
        };

        if changed {
            // A running fetch clears the slot itself
            if let Ok(mut slot) = self.shared.lyrics.try_lock() {
                slot.clear();
            }
        }
        if capabilities.contains(Capabilities::LYRICS) {
            self.request_lyrics();
        }
    }

    fn resolve_cover(&self, report: &PlayerReport) -> PathBuf {
        self.cover
            .resolve(&report.artist, &report.title, &report.file_path)
            .unwrap_or_default()
    }

    /// Start a background lyrics fetch unless one is running or the current
    /// track is already resolved.
    fn request_lyrics(&self) {
        let identity = self.shared.identity();
        if identity.artist.is_empty() || identity.title.is_empty() {
            return;
        }
        let Ok(slot) = Arc::clone(&self.shared.lyrics).try_lock_owned() else {
            tracing::trace!(coordinator = %self.name, "Lyrics fetch already in flight");
            return;
        };
        if slot.is_resolved_for(identity.epoch) {
            return;
        }

        tracing::debug!(coordinator = %self.name, epoch = identity.epoch, "Starting lyrics fetch");
        let weak = Arc::downgrade(&self.shared);
        if let Err(e) = fetch::spawn(
            slot,
            Arc::clone(&self.lyrics_provider),
            self.lyrics_config.max_attempts,
            move || weak.upgrade().map(|shared| shared.identity()),
        ) {
            tracing::warn!(coordinator = %self.name, ?e, "Cannot start background lyrics fetch");
        }
    }

    /// A consistent copy of the current state.
    ///
    /// Lyrics read as empty while a fetch is in flight.
    #[must_use]
    pub fn snapshot(&self) -> PlayerSnapshot {
        let track = self.shared.track.read();
        let lyrics = self
            .shared
            .lyrics
            .try_lock()
            .map(|slot| slot.text_for(track.epoch).to_owned())
            .unwrap_or_default();
        let report = track.report.clone();
        PlayerSnapshot {
            status: report.status,
            duration: report.duration,
            position: report.position,
            rating: report.rating,
            volume: report.volume,
            artist: report.artist,
            album: report.album,
            title: report.title,
            file_path: report.file_path,
            cover_path: track.cover_path.clone(),
            lyrics,
            epoch: track.epoch,
        }
    }

    /// Forward a command to the player. Failures are logged.
    pub fn execute(&self, command: Command) {
        let status = self.shared.track.read().report.status;
        let mut backend = self.backend.lock();
        let result = match &command {
            Command::Play => backend.play(),
            Command::Pause => backend.pause(),
            Command::PlayPause if status == PlaybackStatus::Playing => backend.pause(),
            Command::PlayPause => backend.play(),
            Command::Stop => backend.stop(),
            Command::Next => backend.next(),
            Command::Previous => backend.previous(),
            Command::SetPosition(position) => backend.set_position(*position),
            Command::SetRating(rating) => backend.set_rating((*rating).min(5)),
            Command::SetVolume(volume) => backend.set_volume((*volume).min(100)),
            Command::OpenPlayer(path) => backend.open_player(path.as_deref()),
            Command::ClosePlayer => backend.close_player(),
        };
        if let Err(e) = result {
            tracing::warn!(coordinator = %self.name, ?command, ?e, "Player command failed");
        }
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        tracing::debug!(coordinator = %self.name, "Coordinator destroyed");
    }
}
