use std::collections::HashMap;

use anyhow::{Context as _, Result};
use zbus::{
    fdo::DBusProxy,
    names::OwnedBusName,
    proxy,
    zvariant::{ObjectPath, OwnedValue},
    Connection,
};

const MPRIS_PREFIX: &str = "org.mpris.MediaPlayer2.";

/// `org.mpris.MediaPlayer2.Player`, the playback control interface of MPRIS
#[proxy(
    interface = "org.mpris.MediaPlayer2.Player",
    default_path = "/org/mpris/MediaPlayer2",
    gen_blocking = false
)]
pub trait Player {
    fn play(&self) -> zbus::Result<()>;
    fn pause(&self) -> zbus::Result<()>;
    fn stop(&self) -> zbus::Result<()>;
    fn next(&self) -> zbus::Result<()>;
    fn previous(&self) -> zbus::Result<()>;
    fn set_position(&self, track_id: &ObjectPath<'_>, position: i64) -> zbus::Result<()>;

    #[zbus(property)]
    fn metadata(&self) -> zbus::Result<HashMap<String, OwnedValue>>;
    #[zbus(property)]
    fn playback_status(&self) -> zbus::Result<String>;
    #[zbus(property)]
    fn position(&self) -> zbus::Result<i64>;
    #[zbus(property)]
    fn volume(&self) -> zbus::Result<f64>;
    #[zbus(property)]
    fn set_volume(&self, value: f64) -> zbus::Result<()>;
}

/// `org.mpris.MediaPlayer2`, the application-level interface of MPRIS
#[proxy(
    interface = "org.mpris.MediaPlayer2",
    default_path = "/org/mpris/MediaPlayer2",
    gen_blocking = false
)]
pub trait MediaPlayer2 {
    fn quit(&self) -> zbus::Result<()>;
}

/// Whether an MPRIS bus name belongs to one of the `allowed` players.
///
/// `all` allows every player; otherwise the part after the MPRIS prefix must
/// start with one of the given names (`spotify` matches
/// `org.mpris.MediaPlayer2.spotify.instance42`).
pub fn matches_players(name: &str, allowed: &[String]) -> bool {
    let Some(player) = name.strip_prefix(MPRIS_PREFIX) else {
        return false;
    };
    allowed
        .iter()
        .any(|a| a == "all" || player.starts_with(a.as_str()))
}

/// Return all MPRIS players currently on the bus that match `allowed`
pub async fn player_buses(conn: &Connection, allowed: &[String]) -> Result<Vec<OwnedBusName>> {
    let proxy = DBusProxy::new(conn)
        .await
        .context("Failed to create DBusProxy")?;

    Ok(proxy
        .list_names()
        .await
        .context("Failed to list currently-owned names on DBus")?
        .into_iter()
        .filter(|name| matches_players(name.as_str(), allowed))
        .collect())
}
