//! Players speaking MPRIS on the D-Bus session bus.

use std::{collections::HashMap, ops::Deref as _, path::Path, process};

use anyhow::{anyhow, bail, Context as _, Result};
use futures::future::LocalBoxFuture;
use tokio::runtime::Runtime;
use zbus::{
    names::OwnedBusName,
    proxy::CacheProperties,
    zvariant::{ObjectPath, OwnedObjectPath, OwnedValue},
    Connection,
};

use super::Backend;
use crate::{
    dbus::{player_buses, MediaPlayer2Proxy, PlayerProxy},
    player::{PlaybackStatus, PlayerReport},
    utils::{audio_url_to_path, value_to_f64, value_to_i64, value_to_string},
};

const MICROS_PER_SEC: i64 = 1_000_000;

/// The player currently followed on the bus
struct Connected {
    bus: OwnedBusName,
    player: PlayerProxy<'static>,
    /// Needed by `SetPosition` to refer to the current track
    track_id: Option<OwnedObjectPath>,
}

/// Backend driving an MPRIS player.
///
/// The adapter owns a single-threaded runtime and blocks on it for every
/// call, so it can be driven from the host's synchronous polling thread.
pub struct MprisBackend {
    runtime: Runtime,
    conn: Connection,
    allowed: Vec<String>,
    connected: Option<Connected>,
}

impl MprisBackend {
    /// Connect to the session bus. `allowed` selects players as in
    /// [`crate::dbus::matches_players`].
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime can't be built or the session bus is unreachable.
    pub fn connect(allowed: Vec<String>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to create D-Bus runtime")?;
        let conn = runtime
            .block_on(Connection::session())
            .context("Failed to connect to the session bus")?;
        Ok(Self {
            runtime,
            conn,
            allowed,
            connected: None,
        })
    }

    /// Follow the first allowed player, preferring one that is playing.
    async fn discover(conn: &Connection, allowed: &[String]) -> Result<Connected> {
        let mut fallback = None;
        for bus in player_buses(conn, allowed).await? {
            let player = PlayerProxy::builder(conn)
                .destination(bus.clone())?
                .cache_properties(CacheProperties::No)
                .build()
                .await?;
            let status = player
                .playback_status()
                .await
                .inspect_err(|e| tracing::debug!(%bus, ?e, "Failed to get playback status"))
                .ok()
                .and_then(|s| s.parse::<PlaybackStatus>().ok());
            let connected = Connected {
                bus,
                player,
                track_id: None,
            };
            if status == Some(PlaybackStatus::Playing) {
                return Ok(connected);
            }
            fallback.get_or_insert(connected);
        }
        fallback.ok_or_else(|| anyhow!("No MPRIS player found"))
    }

    fn connected(&mut self) -> Result<&mut Connected> {
        if self.connected.is_none() {
            let found = self
                .runtime
                .block_on(Self::discover(&self.conn, &self.allowed))?;
            tracing::info!(bus = %found.bus, "Following MPRIS player");
            self.connected = Some(found);
        }
        self.connected
            .as_mut()
            .ok_or_else(|| anyhow!("No MPRIS player found"))
    }

    /// Run a call against the followed player.
    fn call<T, F>(&mut self, name: &str, call: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a PlayerProxy<'static>) -> LocalBoxFuture<'a, zbus::Result<T>>,
    {
        let connected = self.connected()?;
        let player = connected.player.clone();
        let result = self.runtime.block_on(call(&player));
        result.with_context(|| format!("MPRIS {name} failed"))
    }
}

async fn read_report(player: &PlayerProxy<'_>) -> Result<(PlayerReport, Option<OwnedObjectPath>)> {
    let status = player
        .playback_status()
        .await
        .context("Failed to get player playback status")?
        .parse()?;
    let metadata = player
        .metadata()
        .await
        .inspect_err(|e| tracing::warn!(?e, "Failed to get player metadata"))
        .unwrap_or_default();
    let position = player
        .position()
        .await
        .inspect_err(|e| tracing::debug!(?e, "Failed to get player position"))
        .unwrap_or_default();
    let volume = player
        .volume()
        .await
        .inspect_err(|e| tracing::debug!(?e, "Failed to get player volume"))
        .unwrap_or_default();

    let track_id = metadata
        .get("mpris:trackid")
        .map(|v| v.deref())
        .and_then(value_to_string)
        .and_then(|s| OwnedObjectPath::try_from(s).ok());
    Ok((report_from(status, &metadata, position, volume), track_id))
}

fn report_from(
    status: PlaybackStatus,
    metadata: &HashMap<String, OwnedValue>,
    position: i64,
    volume: f64,
) -> PlayerReport {
    let text = |key: &str| {
        metadata
            .get(key)
            .map(|v| v.deref())
            .and_then(value_to_string)
            .unwrap_or_default()
    };
    let seconds = |micros: i64| u32::try_from(micros.max(0) / MICROS_PER_SEC).unwrap_or(u32::MAX);

    let duration = metadata
        .get("mpris:length")
        .map(|v| v.deref())
        .and_then(value_to_i64)
        .map_or(0, seconds);
    let rating = metadata
        .get("xesam:userRating")
        .map(|v| v.deref())
        .and_then(value_to_f64)
        .map_or(0, |r| (r.clamp(0.0, 1.0) * 5.0).round() as u8);
    let file_path = metadata
        .get("xesam:url")
        .map(|v| v.deref())
        .and_then(value_to_string)
        .and_then(|url| {
            audio_url_to_path(&url)
                .inspect_err(|e| tracing::trace!(%e, "Track is not a local file"))
                .ok()
        })
        .unwrap_or_default();

    PlayerReport {
        status,
        duration,
        position: seconds(position),
        rating,
        volume: (volume.clamp(0.0, 1.0) * 100.0).round() as u8,
        artist: text("xesam:artist"),
        album: text("xesam:album"),
        title: text("xesam:title"),
        file_path,
    }
}

impl Backend for MprisBackend {
    fn refresh(&mut self) -> Result<PlayerReport> {
        let connected = self.connected()?;
        let player = connected.player.clone();
        match self.runtime.block_on(read_report(&player)) {
            Ok((report, track_id)) => {
                if let Some(connected) = self.connected.as_mut() {
                    connected.track_id = track_id;
                }
                Ok(report)
            }
            Err(e) => {
                // Rediscover on the next refresh, the player may have quit
                self.connected = None;
                Err(e)
            }
        }
    }

    fn play(&mut self) -> Result<()> {
        self.call("Play", |p| Box::pin(p.play()))
    }

    fn pause(&mut self) -> Result<()> {
        self.call("Pause", |p| Box::pin(p.pause()))
    }

    fn stop(&mut self) -> Result<()> {
        self.call("Stop", |p| Box::pin(p.stop()))
    }

    fn next(&mut self) -> Result<()> {
        self.call("Next", |p| Box::pin(p.next()))
    }

    fn previous(&mut self) -> Result<()> {
        self.call("Previous", |p| Box::pin(p.previous()))
    }

    fn set_position(&mut self, position: u32) -> Result<()> {
        let track_id = self
            .connected()?
            .track_id
            .clone()
            .ok_or_else(|| anyhow!("Current track has no MPRIS track id"))?;
        let micros = i64::from(position) * MICROS_PER_SEC;
        self.call("SetPosition", move |p| {
            Box::pin(async move {
                let path: &ObjectPath<'_> = &track_id;
                p.set_position(path, micros).await
            })
        })
    }

    fn set_rating(&mut self, _rating: u8) -> Result<()> {
        bail!("MPRIS has no rating control")
    }

    fn set_volume(&mut self, volume: u8) -> Result<()> {
        let volume = f64::from(volume.min(100)) / 100.0;
        self.call("Volume", move |p| Box::pin(p.set_volume(volume)))
    }

    fn open_player(&mut self, path: Option<&Path>) -> Result<()> {
        let path = path.ok_or_else(|| anyhow!("No player executable given"))?;
        process::Command::new(path)
            .spawn()
            .with_context(|| format!("Failed to launch {}", path.display()))?;
        // Follow whichever player shows up next
        self.connected = None;
        Ok(())
    }

    fn close_player(&mut self) -> Result<()> {
        let bus = self.connected()?.bus.clone();
        let conn = self.conn.clone();
        self.runtime
            .block_on(async move {
                MediaPlayer2Proxy::builder(&conn)
                    .destination(bus)?
                    .cache_properties(CacheProperties::No)
                    .build()
                    .await?
                    .quit()
                    .await
            })
            .context("MPRIS Quit failed")?;
        self.connected = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use zbus::zvariant::Value;

    use super::*;

    fn owned(v: Value<'_>) -> OwnedValue {
        OwnedValue::try_from(v).unwrap()
    }

    #[test]
    fn report_from_metadata() {
        let metadata = HashMap::from([
            ("xesam:artist".to_owned(), owned(Value::from(vec!["AC/DC"]))),
            ("xesam:title".to_owned(), owned(Value::from("T.N.T"))),
            ("xesam:album".to_owned(), owned(Value::from("High Voltage"))),
            ("mpris:length".to_owned(), owned(Value::from(215_000_000_i64))),
            ("xesam:userRating".to_owned(), owned(Value::from(0.8_f64))),
            (
                "xesam:url".to_owned(),
                owned(Value::from("file:///music/AC%2FDC/03%20T.N.T.flac")),
            ),
        ]);

        let report = report_from(PlaybackStatus::Playing, &metadata, 61_500_000, 0.46);
        assert_eq!(
            report,
            PlayerReport {
                status: PlaybackStatus::Playing,
                duration: 215,
                position: 61,
                rating: 4,
                volume: 46,
                artist: "AC/DC".to_owned(),
                album: "High Voltage".to_owned(),
                title: "T.N.T".to_owned(),
                file_path: PathBuf::from("/music/AC/DC/03 T.N.T.flac"),
            }
        );
    }

    #[test]
    fn report_from_sparse_metadata() {
        let metadata = HashMap::from([(
            "xesam:url".to_owned(),
            owned(Value::from("https://radio.example/stream")),
        )]);
        let report = report_from(PlaybackStatus::Paused, &metadata, -5, 2.0);
        assert_eq!(report.status, PlaybackStatus::Paused);
        assert_eq!(report.position, 0);
        assert_eq!(report.volume, 100);
        assert!(report.title.is_empty());
        assert!(report.file_path.as_os_str().is_empty());
    }
}
