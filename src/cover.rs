//! Cover art lookup.
//!
//! Resolution order, first hit wins:
//! 1. previously cached artwork for the track,
//! 2. artwork embedded in the audio file, which is then cached,
//! 3. `cover.*` or `folder.*` next to the audio file.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context as _, Result};
use lofty::{
    file::TaggedFileExt as _,
    picture::{MimeType, Picture, PictureType},
};

use crate::cache::{cache_file, with_appended_extension};

/// Image extensions recognised in the cache and in track folders.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif"];

/// Basenames of folder artwork, in order of preference.
const FOLDER_ART_NAMES: &[&str] = &["cover", "folder"];

#[derive(Debug, Clone)]
pub struct CoverResolver {
    cache_dir: PathBuf,
}

impl CoverResolver {
    #[must_use]
    pub const fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Find the cover of a track, or [`None`] if there is none.
    pub fn resolve(&self, artist: &str, title: &str, file_path: &Path) -> Option<PathBuf> {
        let cache_path = cache_file(&self.cache_dir, artist, title);

        if let Some(cached) = find_with_extension(&cache_path) {
            tracing::debug!(?cached, "Using cached cover");
            return Some(cached);
        }

        if file_path.as_os_str().is_empty() {
            return None;
        }

        match extract_embedded(file_path, &cache_path) {
            Ok(Some(extracted)) => {
                tracing::debug!(?extracted, "Extracted embedded cover");
                return Some(extracted);
            }
            Ok(None) => {}
            Err(e) => tracing::debug!(?e, ?file_path, "Failed to extract embedded cover"),
        }

        let folder = file_path.parent()?;
        FOLDER_ART_NAMES
            .iter()
            .find_map(|name| find_with_extension(&folder.join(name)))
            .inspect(|local| tracing::debug!(?local, "Using folder cover"))
    }
}

/// Return the first existing file at `base` with any image extension.
fn find_with_extension(base: &Path) -> Option<PathBuf> {
    IMAGE_EXTENSIONS
        .iter()
        .map(|ext| with_appended_extension(base, ext))
        .find(|p| p.is_file())
}

/// Pick the front cover if tagged as such, otherwise the first picture.
fn pick_picture<'a>(pictures: impl Iterator<Item = &'a Picture> + Clone) -> Option<&'a Picture> {
    pictures
        .clone()
        .find(|p| p.pic_type() == PictureType::CoverFront)
        .or_else(|| pictures.into_iter().next())
}

fn extension_of(mime: Option<&MimeType>) -> &'static str {
    match mime {
        Some(MimeType::Png) => "png",
        Some(MimeType::Bmp) => "bmp",
        Some(MimeType::Gif) => "gif",
        _ => "jpg",
    }
}

/// Write the embedded artwork of `audio_path` next to `cache_path`.
fn extract_embedded(audio_path: &Path, cache_path: &Path) -> Result<Option<PathBuf>> {
    let tagged = lofty::read_from_path(audio_path)
        .with_context(|| format!("Failed to read tags of {}", audio_path.display()))?;
    let Some(picture) = pick_picture(tagged.tags().iter().flat_map(|t| t.pictures().iter()))
    else {
        return Ok(None);
    };

    let target = with_appended_extension(cache_path, extension_of(picture.mime_type()));
    if let Some(dir) = target.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create cache directory {}", dir.display()))?;
    }
    fs::write(&target, picture.data())
        .with_context(|| format!("Failed to write cover to {}", target.display()))?;
    Ok(Some(target))
}
