//! Location canonicalization for "are we already there" checks.

use std::fmt;

/// Canonicalize a URL for equality comparison.
///
/// Everything from the first `?` is dropped, then any trailing `/` is
/// stripped. An empty input yields an empty string.
///
/// # Examples
///
/// ```
/// use kream_trades::location::normalize;
///
/// assert_eq!(normalize("https://kream.co.kr/products/1/?tab=sales"), "https://kream.co.kr/products/1");
/// assert_eq!(normalize(""), "");
/// ```
pub fn normalize(url: &str) -> String {
    let without_query = match url.split_once('?') {
        Some((head, _)) => head,
        None => url,
    };
    without_query.trim_end_matches('/').to_string()
}

/// Same as [`normalize`], treating an absent URL as empty.
pub fn normalize_opt(url: Option<&str>) -> String {
    url.map(normalize).unwrap_or_default()
}

/// A navigation target paired with its normalized form.
///
/// Two targets are equal iff their normalized forms match.
#[derive(Debug, Clone)]
pub struct NavigationTarget {
    raw: String,
    normalized: String,
}

impl NavigationTarget {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let normalized = normalize(&raw);
        Self { raw, normalized }
    }

    /// The URL exactly as supplied; this is what gets loaded.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// A target with nothing to load, such as an empty URL.
    pub fn is_blank(&self) -> bool {
        self.normalized.trim().is_empty()
    }

    /// Whether `location` refers to this target once both are normalized.
    pub fn matches(&self, location: &str) -> bool {
        normalize(location) == self.normalized
    }
}

impl PartialEq for NavigationTarget {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for NavigationTarget {}

impl fmt::Display for NavigationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for NavigationTarget {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for NavigationTarget {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}
