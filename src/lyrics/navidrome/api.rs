use anyhow::{anyhow, Result};
use rand::Rng as _;
use reqwest::Client;
use tracing::{debug, error};

use super::{
    types::{NavidromeConfig, SearchResponse, Song, SubsonicResponse, TrackQuery},
    utils::{calculate_similarity, render_plain},
};

/// Minimum similarity for a search result to be considered the requested track
const MIN_SIMILARITY: f64 = 0.5;

/// Navidrome API client
pub struct NavidromeClient {
    config: NavidromeConfig,
    client: Client,
}

impl NavidromeClient {
    /// Create new Navidrome client
    pub fn new(config: NavidromeConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    /// Fetch lyrics for the given track, [`None`] if the server has none
    pub async fn fetch_lyrics(&self, query: &TrackQuery<'_>) -> Result<Option<String>> {
        debug!("Fetching lyrics for: {} - {}", query.artist, query.title);

        let Some(song_id) = self.search_song(query).await? else {
            return Ok(None);
        };
        debug!("Found song ID: {}", song_id);

        self.get_lyrics_by_id(&song_id).await
    }

    /// Search for a song and return the best matching song ID
    async fn search_song(&self, query: &TrackQuery<'_>) -> Result<Option<String>> {
        let search_query = format!("{} {}", query.artist, query.title);
        let url = format!("{}/rest/search3", self.config.server_url);

        let auth_params = self.generate_auth_params();
        let mut params = vec![
            ("query", search_query.as_str()),
            ("songCount", "10"),
            ("f", "json"),
        ];
        params.extend(auth_params.iter().map(|(k, v)| (*k, v.as_str())));

        let response = self.client.get(&url).query(&params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Search request failed: {} - {}", status, body);
            return Err(anyhow!("Search request failed: {}", status));
        }

        let search_response: SearchResponse = response.json().await?;

        if search_response.subsonic_response.status != "ok" {
            return Err(anyhow!("Search API returned error status"));
        }

        let songs = search_response
            .subsonic_response
            .search_result3
            .map(|r| r.song)
            .unwrap_or_default();

        Ok(best_match(query, &songs).map(|song| song.id.clone()))
    }

    /// Get lyrics by song ID
    async fn get_lyrics_by_id(&self, song_id: &str) -> Result<Option<String>> {
        let url = format!("{}/rest/getLyricsBySongId", self.config.server_url);

        let auth_params = self.generate_auth_params();
        let mut params = vec![("id", song_id), ("f", "json")];
        params.extend(auth_params.iter().map(|(k, v)| (*k, v.as_str())));

        let response = self.client.get(&url).query(&params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Lyrics request failed: {} - {}", status, body);
            return Err(anyhow!("Lyrics request failed: {}", status));
        }

        let lyrics_response: SubsonicResponse = response.json().await?;

        if lyrics_response.subsonic_response.status != "ok" {
            return Err(anyhow!("Lyrics API returned error status"));
        }

        let text = lyrics_response
            .subsonic_response
            .lyrics_list
            .and_then(|l| l.structured_lyrics.into_iter().next())
            .map(|l| render_plain(&l.line))
            .filter(|text| !text.trim().is_empty());
        Ok(text)
    }

    /// Generate authentication parameters for Subsonic API
    fn generate_auth_params(&self) -> [(&'static str, String); 5] {
        let salt = format!("{:016x}", rand::rng().random::<u64>());
        let token = format!(
            "{:x}",
            md5::compute(format!("{}{}", self.config.password, salt).as_bytes())
        );

        [
            ("u", self.config.username.clone()),
            ("t", token),
            ("s", salt),
            ("v", "1.16.1".to_string()),
            ("c", env!("CARGO_PKG_NAME").to_string()),
        ]
    }
}

/// The most similar song above [`MIN_SIMILARITY`]
fn best_match<'a>(query: &TrackQuery<'_>, songs: &'a [Song]) -> Option<&'a Song> {
    songs
        .iter()
        .map(|song| (song, calculate_similarity(query, song)))
        .inspect(|(song, score)| {
            debug!(
                "Song: {} - {} (similarity: {:.2})",
                song.artist.as_deref().unwrap_or("Unknown"),
                song.title,
                score
            );
        })
        .filter(|(_, score)| *score > MIN_SIMILARITY)
        .fold(None, |best: Option<(&Song, f64)>, (song, score)| match best {
            Some((_, best_score)) if best_score >= score => best,
            _ => Some((song, score)),
        })
        .map(|(song, _)| song)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: &str, artist: &str, title: &str) -> Song {
        Song {
            id: id.to_string(),
            title: title.to_string(),
            artist: Some(artist.to_string()),
        }
    }

    #[test]
    fn test_best_match() {
        let query = TrackQuery {
            artist: "Daft Punk",
            title: "One More Time",
        };
        let songs = vec![
            song("1", "Someone Else", "One More Time"),
            song("2", "Daft Punk", "One More Time"),
            song("3", "Daft Punk", "Aerodynamic"),
        ];
        assert_eq!(best_match(&query, &songs).map(|s| s.id.as_str()), Some("2"));
        assert!(best_match(&query, &songs[2..]).is_none());
    }

    #[test]
    fn test_auth_params() {
        let client = NavidromeClient::new(NavidromeConfig {
            server_url: "http://localhost:4533".to_string(),
            username: "user".to_string(),
            password: "secret".to_string(),
        });
        let params = client.generate_auth_params();
        let salt = &params[2].1;
        let expected = format!("{:x}", md5::compute(format!("secret{salt}").as_bytes()));
        assert_eq!(params[0], ("u", "user".to_string()));
        assert_eq!(params[1], ("t", expected));
    }
}
