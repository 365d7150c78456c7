use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use zbus::zvariant::Value;

#[must_use]
/// Flatten a [`Value`] into text. Arrays of strings, such as artist lists, are joined with `, `.
pub fn value_to_string(v: &Value<'_>) -> Option<String> {
    match v {
        Value::Str(s) => Some(s.to_string()),
        Value::ObjectPath(o) => Some(o.to_string()),
        Value::Value(v) => value_to_string(v),
        Value::Array(a) => {
            let items = a.iter().filter_map(value_to_string).collect::<Vec<_>>();
            (!items.is_empty()).then(|| items.join(", "))
        }
        _ => None,
    }
}

#[must_use]
/// Converts any integer [`Value`] into `i64`.
pub fn value_to_i64(v: &Value<'_>) -> Option<i64> {
    match v {
        Value::U8(v) => Some(i64::from(*v)),
        Value::I16(v) => Some(i64::from(*v)),
        Value::U16(v) => Some(i64::from(*v)),
        Value::I32(v) => Some(i64::from(*v)),
        Value::U32(v) => Some(i64::from(*v)),
        Value::I64(v) => Some(*v),
        Value::U64(v) => i64::try_from(*v).ok(),
        Value::Value(v) => value_to_i64(v),
        _ => None,
    }
}

#[must_use]
pub fn value_to_f64(v: &Value<'_>) -> Option<f64> {
    match v {
        Value::F64(v) => Some(*v),
        Value::Value(v) => value_to_f64(v),
        // Precision loss is irrelevant at rating scale
        v => value_to_i64(v).map(|i| i as f64),
    }
}

/// Decode a `file://` URL into a local path.
///
/// # Errors
///
/// Returns an error if the URL isn't valid percent-encoded UTF-8 or isn't a local file.
pub fn audio_url_to_path(url: &str) -> Result<PathBuf> {
    let url = match urlencoding::decode(url) {
        Ok(i) => i,
        Err(e) => bail!("Failed to decode URL {url}: {e:?}"),
    };
    url.strip_prefix("file://")
        .ok_or_else(|| anyhow!("URL is not file"))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn strings() {
        assert_eq!(value_to_string(&Value::from("Title")).as_deref(), Some("Title"));
        let artists = Value::from(vec!["A", "B"]);
        assert_eq!(value_to_string(&artists).as_deref(), Some("A, B"));
        assert_eq!(value_to_string(&Value::from(3_u32)), None);
    }

    #[test]
    fn numbers() {
        assert_eq!(value_to_i64(&Value::from(240_000_000_u64)), Some(240_000_000));
        assert_eq!(value_to_i64(&Value::from(-1_i32)), Some(-1));
        assert_eq!(value_to_f64(&Value::from(0.8_f64)), Some(0.8));
        assert_eq!(value_to_f64(&Value::from(1_i64)), Some(1.0));
        assert_eq!(value_to_i64(&Value::from("1")), None);
    }

    #[test]
    fn file_urls() {
        assert_eq!(
            audio_url_to_path("file:///music/AC%2FDC%20Live/T.N.T.flac").unwrap(),
            Path::new("/music/AC/DC Live/T.N.T.flac")
        );
        assert!(audio_url_to_path("https://example.com/track.mp3").is_err());
    }
}
