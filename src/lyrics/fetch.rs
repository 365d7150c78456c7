//! Background lyrics fetch.
//!
//! A fetch runs on its own thread while holding the lyrics lock for its whole
//! lifetime, so a held lock means "a fetch is in flight". The track may
//! change any number of times while a request is outstanding; a result is
//! only kept if the track identity epoch did not move during the request.

use std::{num::NonZeroU32, sync::Arc, thread};

use anyhow::{Context as _, Result};
use tokio::sync::OwnedMutexGuard;

use super::LyricsProvider;

/// The lyrics resolved for one track identity.
#[derive(Debug, Default)]
pub(crate) struct LyricsSlot {
    epoch: u64,
    resolved: bool,
    text: String,
}

impl LyricsSlot {
    pub fn clear(&mut self) {
        self.resolved = false;
        self.text.clear();
    }

    fn store(&mut self, epoch: u64, lyrics: Option<String>) {
        self.epoch = epoch;
        self.resolved = true;
        self.text = lyrics.unwrap_or_default();
    }

    /// Whether a lookup, successful or not, already completed for `epoch`.
    pub fn is_resolved_for(&self, epoch: u64) -> bool {
        self.resolved && self.epoch == epoch
    }

    /// The lyrics of track `epoch`, empty if unresolved or not found.
    pub fn text_for(&self, epoch: u64) -> &str {
        if self.is_resolved_for(epoch) {
            &self.text
        } else {
            ""
        }
    }
}

/// The track a fetch is looking for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TrackIdentity {
    pub epoch: u64,
    pub artist: String,
    pub title: String,
}

impl TrackIdentity {
    fn is_empty(&self) -> bool {
        self.artist.is_empty() || self.title.is_empty()
    }
}

/// Start a detached fetch thread that owns the lyrics lock until it finishes.
///
/// `current` returns the identity of the track being played, or [`None`]
/// once the owning player is gone.
///
/// # Errors
///
/// Returns an error if the runtime or the thread can't be created. The lock
/// is released in that case.
pub(crate) fn spawn<F>(
    slot: OwnedMutexGuard<LyricsSlot>,
    provider: Arc<dyn LyricsProvider>,
    max_attempts: Option<NonZeroU32>,
    current: F,
) -> Result<()>
where
    F: Fn() -> Option<TrackIdentity> + Send + 'static,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create lyrics runtime")?;
    thread::Builder::new()
        .name("lyrics-fetch".to_owned())
        .spawn(move || {
            runtime.block_on(run(slot, provider.as_ref(), max_attempts, current));
        })
        .context("Failed to start lyrics thread")?;
    Ok(())
}

/// Fetch until a result is obtained for a track that didn't change meanwhile.
pub(crate) async fn run<F>(
    mut slot: OwnedMutexGuard<LyricsSlot>,
    provider: &dyn LyricsProvider,
    max_attempts: Option<NonZeroU32>,
    current: F,
) where
    F: Fn() -> Option<TrackIdentity>,
{
    slot.clear();
    let mut invalidated = 0;

    loop {
        let Some(before) = current() else {
            tracing::debug!("Player gone before lyrics fetch");
            return;
        };

        let lyrics = if before.is_empty() {
            None
        } else {
            provider.fetch_lyrics(&before.artist, &before.title).await
        };

        let Some(after) = current() else {
            tracing::debug!(artist = %before.artist, title = %before.title, "Player gone during lyrics fetch, discarding result");
            return;
        };

        if after.epoch == before.epoch {
            tracing::debug!(epoch = before.epoch, found = lyrics.is_some(), artist = %before.artist, title = %before.title, "Lyrics fetch finished");
            slot.store(before.epoch, lyrics);
            return;
        }

        invalidated += 1;
        tracing::info!(
            stale = %before.title,
            current = %after.title,
            "Track changed during lyrics fetch, retrying"
        );
        if max_attempts.is_some_and(|max| invalidated >= max.get()) {
            tracing::warn!(invalidated, "Giving up on lyrics after repeated track changes");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use futures::future::BoxFuture;
    use parking_lot::Mutex;

    use super::*;

    /// Tracks requests and bumps the shared epoch for the first `skips` of them.
    struct Skipping {
        epoch: Arc<AtomicU64>,
        skips: u64,
        calls: Mutex<Vec<String>>,
    }

    impl LyricsProvider for Skipping {
        fn name(&self) -> &'static str {
            "skipping"
        }

        fn fetch_lyrics<'a>(&'a self, _: &'a str, title: &'a str) -> BoxFuture<'a, Option<String>> {
            Box::pin(async move {
                let mut calls = self.calls.lock();
                calls.push(title.to_owned());
                if (calls.len() as u64) <= self.skips {
                    self.epoch.fetch_add(1, Ordering::SeqCst);
                }
                Some(format!("lyrics of {title}"))
            })
        }
    }

    fn identity_from(epoch: &AtomicU64) -> TrackIdentity {
        let epoch = epoch.load(Ordering::SeqCst);
        TrackIdentity {
            epoch,
            artist: "Artist".to_owned(),
            title: format!("Track {epoch}"),
        }
    }

    fn locked_slot() -> (Arc<tokio::sync::Mutex<LyricsSlot>>, OwnedMutexGuard<LyricsSlot>) {
        let slot = Arc::new(tokio::sync::Mutex::new(LyricsSlot::default()));
        let guard = Arc::clone(&slot).try_lock_owned().unwrap();
        (slot, guard)
    }

    #[tokio::test]
    async fn stores_result_for_unchanged_track() {
        let epoch = Arc::new(AtomicU64::new(1));
        let provider = Skipping { epoch: Arc::clone(&epoch), skips: 0, calls: Mutex::default() };
        let (slot, guard) = locked_slot();

        run(guard, &provider, None, || Some(identity_from(&epoch))).await;

        let slot = slot.try_lock().unwrap();
        assert!(slot.is_resolved_for(1));
        assert_eq!(slot.text_for(1), "lyrics of Track 1");
        assert_eq!(*provider.calls.lock(), ["Track 1"]);
    }

    #[tokio::test]
    async fn discards_result_of_changed_track() {
        let epoch = Arc::new(AtomicU64::new(1));
        let provider = Skipping { epoch: Arc::clone(&epoch), skips: 2, calls: Mutex::default() };
        let (slot, guard) = locked_slot();

        run(guard, &provider, None, || Some(identity_from(&epoch))).await;

        let slot = slot.try_lock().unwrap();
        assert_eq!(*provider.calls.lock(), ["Track 1", "Track 2", "Track 3"]);
        assert!(!slot.is_resolved_for(1));
        assert_eq!(slot.text_for(3), "lyrics of Track 3");
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let epoch = Arc::new(AtomicU64::new(1));
        let provider = Skipping { epoch: Arc::clone(&epoch), skips: u64::MAX, calls: Mutex::default() };
        let (slot, guard) = locked_slot();

        run(guard, &provider, NonZeroU32::new(3), || Some(identity_from(&epoch))).await;

        assert_eq!(provider.calls.lock().len(), 3);
        let slot = slot.try_lock().unwrap();
        assert!(!slot.is_resolved_for(epoch.load(Ordering::SeqCst)));
    }

    #[tokio::test]
    async fn abandons_when_player_is_gone() {
        let epoch = Arc::new(AtomicU64::new(1));
        let provider = Skipping { epoch: Arc::clone(&epoch), skips: 0, calls: Mutex::default() };
        let (slot, guard) = locked_slot();
        let alive = AtomicU64::new(1);

        // The owner disappears while the first request is in flight.
        run(guard, &provider, None, || {
            (alive.fetch_sub(1, Ordering::SeqCst) > 0).then(|| identity_from(&epoch))
        })
        .await;

        let slot = slot.try_lock().unwrap();
        assert!(!slot.is_resolved_for(1));
        assert_eq!(provider.calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn empty_identity_is_not_fetched() {
        let epoch = Arc::new(AtomicU64::new(4));
        let provider = Skipping { epoch: Arc::clone(&epoch), skips: 0, calls: Mutex::default() };
        let (slot, guard) = locked_slot();

        run(guard, &provider, None, || {
            Some(TrackIdentity { epoch: 4, artist: String::new(), title: "Title".to_owned() })
        })
        .await;

        assert!(provider.calls.lock().is_empty());
        let slot = slot.try_lock().unwrap();
        assert!(slot.is_resolved_for(4));
        assert_eq!(slot.text_for(4), "");
    }

    #[test]
    fn slot_hides_text_of_other_tracks() {
        let mut slot = LyricsSlot::default();
        slot.store(2, Some("words".to_owned()));
        assert_eq!(slot.text_for(2), "words");
        assert_eq!(slot.text_for(3), "");
        slot.clear();
        assert_eq!(slot.text_for(2), "");
    }
}
