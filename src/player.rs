use std::{path::PathBuf, str::FromStr};

use anyhow::{anyhow, bail, Context as _, Result};
use serde::Serialize;

/// Current playback status of the monitored player
#[derive(Clone, Copy, Default, Eq, PartialEq, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    #[default]
    Stopped,
    Playing,
    Paused,
}
impl FromStr for PlaybackStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_ref() {
            "playing" => Ok(Self::Playing),
            "paused" => Ok(Self::Paused),
            "stopped" => Ok(Self::Stopped),
            _ => Err(anyhow!("Unknown PlaybackStatus {s}")),
        }
    }
}

/// State of the player as reported by a backend on refresh.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct PlayerReport {
    pub status: PlaybackStatus,
    /// Track length in seconds
    pub duration: u32,
    /// Playback position in seconds
    pub position: u32,
    /// Rating from 0 to 5
    pub rating: u8,
    /// Volume from 0 to 100
    pub volume: u8,
    pub artist: String,
    pub album: String,
    pub title: String,
    /// Audio file of the current track, empty if the player doesn't expose it
    pub file_path: PathBuf,
}

impl PlayerReport {
    /// A stopped report with no track, keeping the last known volume.
    #[must_use]
    pub fn cleared(volume: u8) -> Self {
        Self {
            volume,
            ..Self::default()
        }
    }

    /// Whether two reports refer to the same track.
    #[must_use]
    pub fn same_track(&self, other: &Self) -> bool {
        self.artist == other.artist && self.title == other.title
    }
}

/// A consistent copy of the shared player state, as seen by measures.
#[derive(Clone, Default, Debug, PartialEq, Eq, Serialize)]
pub struct PlayerSnapshot {
    pub status: PlaybackStatus,
    pub duration: u32,
    pub position: u32,
    pub rating: u8,
    pub volume: u8,
    pub artist: String,
    pub album: String,
    pub title: String,
    pub file_path: PathBuf,
    /// Resolved cover art, empty if none was found
    pub cover_path: PathBuf,
    /// Resolved lyrics, empty while unresolved or when none were found
    pub lyrics: String,
    /// Track identity epoch the snapshot was taken at
    pub epoch: u64,
}

impl PlayerSnapshot {
    /// Playback progress in percent
    #[must_use]
    pub fn progress(&self) -> u8 {
        if self.duration == 0 {
            return 0;
        }
        let percent = u64::from(self.position.min(self.duration)) * 100 / u64::from(self.duration);
        // Bounded by 100 above
        percent as u8
    }
}

/// A transport or control request sent by a measure to the player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Play,
    Pause,
    PlayPause,
    Stop,
    Next,
    Previous,
    /// Seek to the given position in seconds
    SetPosition(u32),
    /// Rate the current track from 0 to 5
    SetRating(u8),
    /// Set the volume from 0 to 100
    SetVolume(u8),
    /// Launch the player, optionally from a given executable
    OpenPlayer(Option<PathBuf>),
    ClosePlayer,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (verb, arg) = s
            .split_once(char::is_whitespace)
            .map_or((s, ""), |(verb, arg)| (verb, arg.trim()));
        let number = |max: u32| -> Result<u32> {
            let value = arg
                .parse::<u32>()
                .with_context(|| format!("Invalid argument {arg:?} for {verb}"))?;
            if value > max {
                bail!("Argument {value} for {verb} exceeds {max}");
            }
            Ok(value)
        };
        Ok(match verb.to_lowercase().as_ref() {
            "play" => Self::Play,
            "pause" => Self::Pause,
            "playpause" => Self::PlayPause,
            "stop" => Self::Stop,
            "next" => Self::Next,
            "previous" => Self::Previous,
            "setposition" => Self::SetPosition(number(u32::MAX)?),
            // Both bounded by `number`
            "setrating" => Self::SetRating(number(5)? as u8),
            "setvolume" => Self::SetVolume(number(100)? as u8),
            "openplayer" if arg.is_empty() => Self::OpenPlayer(None),
            "openplayer" => Self::OpenPlayer(Some(PathBuf::from(arg))),
            "closeplayer" => Self::ClosePlayer,
            _ => bail!("Unknown command {s}"),
        })
    }
}
