use regex::Regex;
use std::sync::LazyLock;

// 2-256 URL characters, a dot, a 2-4 letter lowercase suffix, then an optional path.
// The boundary after the suffix is ASCII-only, so non-ASCII letters end the token.
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"[-a-zA-Z0-9@:%_+.~#?&/=]{2,256}\.[a-z]{2,4}(?-u:\b)(/[-a-zA-Z0-9@:%_+.~#?&/=]*)?",
    )
        .expect("URL pattern is valid")
});

/// Returns the first URL-like token in `text`, if any.
///
/// The returned slice borrows from `text` so it matches the source byte-for-byte.
pub fn extract_url(text: Option<&str>) -> Option<&str> {
    let text = text?;
    if text.is_empty() {
        return None;
    }
    URL_RE.find(text).map(|m| m.as_str())
}

/// Every URL-like token in `text`, in order of appearance.
pub fn extract_urls(text: &str) -> impl Iterator<Item = &str> {
    URL_RE.find_iter(text).map(|m| m.as_str())
}
