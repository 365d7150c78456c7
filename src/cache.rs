//! Naming of cached artifacts.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

/// Characters that can't appear in a file name on common filesystems.
const RESERVED: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Shared basename for tracks lacking an artist or a title.
const FALLBACK_NAME: &str = "temp";

/// Build the extension-less cache path of a track: `<cache_dir>/<artist> - <title>`.
///
/// Reserved characters are replaced by `_`. If either `artist` or `title` is
/// empty every such track shares the same `temp` basename.
#[must_use]
pub fn cache_file(cache_dir: &Path, artist: &str, title: &str) -> PathBuf {
    if artist.is_empty() || title.is_empty() {
        return cache_dir.join(FALLBACK_NAME);
    }
    let name = format!("{artist} - {title}").replace(RESERVED, "_");
    cache_dir.join(name)
}

/// Append an extension without touching dots already present in the name.
///
/// [`Path::with_extension`] would turn `T.N.T` into `T.N.jpg`.
#[must_use]
pub fn with_appended_extension(path: &Path, extension: &str) -> PathBuf {
    let mut name = OsString::from(path);
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basename(path: &Path) -> &str {
        path.file_name().and_then(|n| n.to_str()).unwrap()
    }

    #[test]
    fn replaces_reserved_characters() {
        let path = cache_file(Path::new("/cache"), "AC/DC", "T.N.T");
        assert_eq!(path.parent(), Some(Path::new("/cache")));
        assert_eq!(basename(&path), "AC_DC - T.N.T");

        let path = cache_file(Path::new("/cache"), r#"a\b:c*d"#, r#"e?f"g<h>i|j"#);
        assert_eq!(basename(&path), "a_b_c_d - e_f_g_h_i_j");
    }

    #[test]
    fn empty_identity_falls_back() {
        assert_eq!(basename(&cache_file(Path::new("/cache"), "", "Title")), "temp");
        assert_eq!(basename(&cache_file(Path::new("/cache"), "Artist", "")), "temp");
        assert_eq!(basename(&cache_file(Path::new("/cache"), "", "")), "temp");
    }

    #[test]
    fn extension_is_appended() {
        let path = cache_file(Path::new("/cache"), "AC/DC", "T.N.T");
        assert_eq!(
            with_appended_extension(&path, "jpg"),
            Path::new("/cache/AC_DC - T.N.T.jpg")
        );
    }
}
