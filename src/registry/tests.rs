use std::{
    path::Path,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use anyhow::bail;
use futures::future::BoxFuture;

use super::*;
use crate::player::PlayerReport;

#[derive(Default)]
struct Probe {
    created: AtomicUsize,
    refreshes: AtomicUsize,
    dropped: AtomicBool,
}

struct Silent(Arc<Probe>);

impl Backend for Silent {
    fn refresh(&mut self) -> Result<PlayerReport> {
        self.0.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(PlayerReport::default())
    }

    fn play(&mut self) -> Result<()> {
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn next(&mut self) -> Result<()> {
        Ok(())
    }

    fn previous(&mut self) -> Result<()> {
        Ok(())
    }

    fn set_position(&mut self, _: u32) -> Result<()> {
        Ok(())
    }

    fn set_rating(&mut self, _: u8) -> Result<()> {
        Ok(())
    }

    fn set_volume(&mut self, _: u8) -> Result<()> {
        Ok(())
    }

    fn open_player(&mut self, _: Option<&Path>) -> Result<()> {
        Ok(())
    }

    fn close_player(&mut self) -> Result<()> {
        Ok(())
    }
}

impl Drop for Silent {
    fn drop(&mut self) {
        self.0.dropped.store(true, Ordering::SeqCst);
    }
}

struct NoLyrics;

impl LyricsProvider for NoLyrics {
    fn name(&self) -> &'static str {
        "none"
    }

    fn fetch_lyrics<'a>(&'a self, _: &'a str, _: &'a str) -> BoxFuture<'a, Option<String>> {
        Box::pin(async { None })
    }
}

fn registry() -> Registry {
    Registry::new(Config::new(std::env::temp_dir()), Arc::new(NoLyrics))
}

fn backend(probe: &Arc<Probe>) -> impl FnOnce() -> Result<Box<dyn Backend>> + '_ {
    move || {
        probe.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(Silent(Arc::clone(probe))) as Box<dyn Backend>)
    }
}

#[test]
fn shared_until_last_detach() {
    let registry = registry();
    let probe = Arc::new(Probe::default());

    let measures = (0..3)
        .map(|_| registry.attach("mpris", backend(&probe)).unwrap())
        .collect::<Vec<_>>();
    assert_eq!(probe.created.load(Ordering::SeqCst), 1);
    assert_eq!(registry.len(), 1);

    let refreshed = measures.iter().filter(|m| m.poll()).count();
    assert_eq!(refreshed, 1);
    assert_eq!(probe.refreshes.load(Ordering::SeqCst), 1);

    let mut measures = measures.into_iter();
    measures.next().unwrap().detach();
    measures.next().unwrap().detach();
    assert!(!probe.dropped.load(Ordering::SeqCst));
    assert!(registry.is_attached("mpris"));

    measures.next().unwrap().detach();
    assert!(probe.dropped.load(Ordering::SeqCst));
    assert!(!registry.is_attached("mpris"));
    assert!(registry.is_empty());
}

#[test]
fn dropping_a_measure_detaches_it() {
    let registry = registry();
    let probe = Arc::new(Probe::default());
    {
        let _measure = registry.attach("mpris", backend(&probe)).unwrap();
        assert!(registry.is_attached("mpris"));
    }
    assert!(probe.dropped.load(Ordering::SeqCst));
    assert!(registry.is_empty());
}

#[test]
fn reattach_creates_a_new_coordinator() {
    let registry = registry();
    let probe = Arc::new(Probe::default());

    registry.attach("mpris", backend(&probe)).unwrap().detach();
    let measure = registry.attach("mpris", backend(&probe)).unwrap();
    assert_eq!(probe.created.load(Ordering::SeqCst), 2);
    assert_eq!(measure.player(), "mpris");
}

#[test]
fn players_are_independent() {
    let registry = registry();
    let first = Arc::new(Probe::default());
    let second = Arc::new(Probe::default());

    let a = registry.attach("spotify", backend(&first)).unwrap();
    let b = registry.attach("mpv", backend(&second)).unwrap();
    assert_eq!(registry.len(), 2);

    // A single measure completes its own round
    assert!(a.poll());
    assert!(b.poll());

    a.detach();
    assert!(first.dropped.load(Ordering::SeqCst));
    assert!(!second.dropped.load(Ordering::SeqCst));
    assert!(registry.is_attached("mpv"));
    drop(b);
}

#[test]
fn failed_backend_is_not_registered() {
    let registry = registry();
    let result = registry.attach("mpris", || bail!("no session bus"));
    assert!(result.is_err());
    assert!(registry.is_empty());
}
