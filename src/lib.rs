//! Now-playing state of a media player, shared between many polling measures.
//!
//! A host attaches any number of [`Measure`]s to a player through a
//! [`Registry`]. The measures of one player share a [`Coordinator`], which
//! refreshes the player once per polling round, resolves cover art from a
//! disk cache, tags or the track folder, and fetches lyrics in the
//! background without ever showing lyrics of a previous track.

pub mod backend;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod cover;
pub mod dbus;
pub mod lyrics;
pub mod output;
pub mod player;
pub mod registry;
mod utils;

pub use backend::{mpris::MprisBackend, Backend};
pub use config::{Config, LyricsConfig};
pub use coordinator::{Capabilities, Coordinator};
pub use lyrics::{LyricsProvider, ProviderChain};
pub use player::{Command, PlaybackStatus, PlayerReport, PlayerSnapshot};
pub use registry::{Measure, Registry};
