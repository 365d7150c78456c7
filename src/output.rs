use serde::Serialize;
use std::io::{self, Write};

use crate::player::{PlaybackStatus, PlayerSnapshot};

/// A structure that can be serialized to JSON and parsed by Waybar.
#[derive(Serialize, Debug, Default, PartialEq, Eq)]
pub struct WaybarCustomModule {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    alt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tooltip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    percentage: Option<usize>,
}

impl WaybarCustomModule {
    /// Create a new module with the given contents.
    #[must_use]
    pub fn new(
        text: Option<&str>,
        alt: Option<&str>,
        tooltip: Option<&str>,
        class: Option<&str>,
        percentage: Option<usize>,
    ) -> Self {
        Self {
            text: text.map(html_escape::encode_text).map(String::from),
            alt: alt.map(html_escape::encode_text).map(String::from),
            tooltip: tooltip.map(html_escape::encode_text).map(String::from),
            class: class.map(html_escape::encode_text).map(String::from),
            percentage,
        }
    }

    /// Render the state of a player: `artist - title` as text, album and
    /// lyrics as tooltip, status as class and progress as percentage.
    #[must_use]
    pub fn from_snapshot(snapshot: &PlayerSnapshot) -> Self {
        if snapshot.status == PlaybackStatus::Stopped && snapshot.title.is_empty() {
            return Self::new(None, None, None, Some("stopped"), None);
        }

        let text = match (snapshot.artist.as_str(), snapshot.title.as_str()) {
            ("", title) => title.to_owned(),
            (artist, "") => artist.to_owned(),
            (artist, title) => format!("{artist} - {title}"),
        };
        let tooltip = [snapshot.album.as_str(), snapshot.lyrics.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        let class = match snapshot.status {
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Paused => "paused",
            PlaybackStatus::Stopped => "stopped",
        };

        Self::new(
            Some(&text),
            None,
            (!tooltip.is_empty()).then_some(tooltip.as_str()),
            Some(class),
            Some(usize::from(snapshot.progress())),
        )
    }

    /// Format the module as JSON and write it to the given writer.
    ///
    /// # Errors
    ///
    /// This function will return an error if writing to the given writer fails.
    pub fn format<T: Write>(&self, mut f: &mut T) -> io::Result<()> {
        serde_json::to_writer(&mut f, self)?;
        f.write_all(b"\n")?;
        Ok(())
    }

    /// Print the module to stdout.
    ///
    /// # Errors
    ///
    /// This function will return an error if writing to stdout fails.
    pub fn print(&self) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        self.format(&mut stdout)?;
        stdout.flush()
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    fn render(module: &WaybarCustomModule) -> String {
        let mut buf = Vec::new();
        module.format(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_format() {
        let module = WaybarCustomModule {
            text: Some("text".to_owned()),
            alt: Some("alt".to_owned()),
            tooltip: Some("tooltip".to_owned()),
            class: Some("class".to_owned()),
            percentage: Some(50),
        };
        assert_eq!(
            render(&module),
            "{\"text\":\"text\",\"alt\":\"alt\",\"tooltip\":\"tooltip\",\"class\":\"class\",\"percentage\":50}\n"
        );
    }

    #[test]
    fn test_missing_fields() {
        assert_eq!(render(&WaybarCustomModule::default()), "{}\n");
    }

    #[test]
    fn test_from_snapshot() {
        let snapshot = PlayerSnapshot {
            status: PlaybackStatus::Paused,
            duration: 200,
            position: 100,
            artist: "Simon & Garfunkel".to_owned(),
            title: "Mrs. Robinson".to_owned(),
            album: "Bookends".to_owned(),
            lyrics: "And here's to you".to_owned(),
            ..PlayerSnapshot::default()
        };
        assert_eq!(
            WaybarCustomModule::from_snapshot(&snapshot),
            WaybarCustomModule {
                text: Some("Simon &amp; Garfunkel - Mrs. Robinson".to_owned()),
                alt: None,
                tooltip: Some("Bookends\n\nAnd here's to you".to_owned()),
                class: Some("paused".to_owned()),
                percentage: Some(50),
            }
        );
    }

    #[test]
    fn test_from_empty_snapshot() {
        assert_eq!(
            render(&WaybarCustomModule::from_snapshot(&PlayerSnapshot::default())),
            "{\"class\":\"stopped\"}\n"
        );
    }
}
