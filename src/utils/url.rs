// src/utils/url.rs

//! URL manipulation utilities.

use std::sync::LazyLock;

use regex::Regex;

static KEYED_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/(?:chintai|rent|room|b)[_/\-]?([^/?.]+)").expect("valid keyed-segment regex")
});

static LONG_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{6,})").expect("valid digit-run regex"));

/// Extract a stable property identifier from a detail URL.
///
/// Tries, in order: the segment after `/chintai`, `/rent`, `/room` or `/b`;
/// a run of six or more digits anywhere in the path; the whole path with
/// non-alphanumerics replaced by `_`. Falls back to `"unknown"`.
///
/// # Examples
/// ```
/// use rent_monitor::utils::url::extract_property_id;
///
/// assert_eq!(
///     extract_property_id("https://suumo.jp/chintai/jnc_000012345678/"),
///     "jnc_000012345678"
/// );
/// ```
pub fn extract_property_id(url: &str) -> String {
    let path = ::url::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string());

    if let Some(id) = KEYED_SEGMENT.captures(&path).and_then(|c| c.get(1)) {
        return id.as_str().to_string();
    }
    if let Some(id) = LONG_DIGITS.captures(&path).and_then(|c| c.get(1)) {
        return id.as_str().to_string();
    }

    let sanitized: String = path
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let trimmed = sanitized.trim_matches('_');
    if trimmed.is_empty() {
        "unknown".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyed_segment_suumo() {
        assert_eq!(
            extract_property_id("https://suumo.jp/chintai/jnc_000098765432/?bc=1"),
            "jnc_000098765432"
        );
    }

    #[test]
    fn test_keyed_segment_homes() {
        assert_eq!(
            extract_property_id("https://www.homes.co.jp/chintai/b-1234567/"),
            "b-1234567"
        );
        assert_eq!(
            extract_property_id("https://www.homes.co.jp/b-35001234/"),
            "35001234"
        );
    }

    #[test]
    fn test_digit_run_fallback() {
        assert_eq!(
            extract_property_id("https://example.com/detail/1234567.html"),
            "1234567"
        );
    }

    #[test]
    fn test_sanitized_path_fallback() {
        assert_eq!(
            extract_property_id("https://example.com/detail/abc.html"),
            "detail_abc_html"
        );
        assert_eq!(extract_property_id("https://example.com/"), "unknown");
    }
}
