//! Player backends: how the state of a specific player is read and controlled.

pub mod mpris;

use std::path::Path;

use anyhow::Result;

use crate::player::PlayerReport;

/// Control surface of one kind of media player.
///
/// A coordinator owns exactly one backend and calls [`Backend::refresh`] once
/// per aggregated cycle, from the host's polling thread. Commands are fire
/// and forget: their errors are logged by the caller and otherwise ignored.
pub trait Backend: Send {
    /// Read the current state of the player.
    ///
    /// # Errors
    ///
    /// An error means the player is unavailable (closed, or its control
    /// interface is gone). It is shown to measures as a stopped, empty state.
    fn refresh(&mut self) -> Result<PlayerReport>;

    fn play(&mut self) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
    fn next(&mut self) -> Result<()>;
    fn previous(&mut self) -> Result<()>;

    /// Seek to `position` seconds into the current track.
    fn set_position(&mut self, position: u32) -> Result<()>;
    /// Rate the current track from 0 to 5.
    fn set_rating(&mut self, rating: u8) -> Result<()>;
    /// Set the player volume from 0 to 100.
    fn set_volume(&mut self, volume: u8) -> Result<()>;

    /// Launch the player, from `path` if given.
    fn open_player(&mut self, path: Option<&Path>) -> Result<()>;
    fn close_player(&mut self) -> Result<()>;
}
