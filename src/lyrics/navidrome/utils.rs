use super::types::{LyricsLine, Song, TrackQuery};

/// Calculate similarity score between the requested track and a search result
pub fn calculate_similarity(query: &TrackQuery<'_>, song: &Song) -> f64 {
    let mut score = 0.0;

    // Title similarity (highest weight)
    let title_weight = 3.0;
    if is_similar(query.title, &song.title) {
        score += title_weight;
    }

    let artist_weight = 2.0;
    if let Some(song_artist) = &song.artist {
        if is_similar(query.artist, song_artist) {
            score += artist_weight;
        }
    }

    score / (title_weight + artist_weight)
}

/// Check if two strings are similar (case-insensitive)
fn is_similar(a: &str, b: &str) -> bool {
    let a_normalized = a.trim().to_lowercase();
    let b_normalized = b.trim().to_lowercase();

    if a_normalized.is_empty() || b_normalized.is_empty() {
        return false;
    }

    a_normalized == b_normalized
        || a_normalized.contains(&b_normalized)
        || b_normalized.contains(&a_normalized)
}

/// Render structured lyrics as plain text, one line per entry
pub fn render_plain(lyrics: &[LyricsLine]) -> String {
    lyrics
        .iter()
        .map(|line| line.value.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
