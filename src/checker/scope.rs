// src/checker/scope.rs
// =============================================================================
// Decides which URLs belong to the site being crawled.
//
// A URL is "internal" when it starts with the (normalized) base URL of the
// site. Only internal HTML pages are ever downloaded and scanned for more
// links. With `internal_only` set, external URLs are not even checked.
// URLs matching one of the site's ignored patterns are never checked.
// =============================================================================

use regex::Regex;
use url::Url;

#[derive(Debug, Clone)]
pub struct Scope {
    prefix: String,
    internal_only: bool,
    ignored: Vec<Regex>,
}

impl Scope {
    pub fn new(base: &Url, internal_only: bool) -> Self {
        Self {
            prefix: base.as_str().to_string(),
            internal_only,
            ignored: Vec::new(),
        }
    }

    /// Skips every discovered URL that matches one of `patterns`.
    pub fn ignoring(mut self, patterns: Vec<Regex>) -> Self {
        self.ignored = patterns;
        self
    }

    /// True when `url` lives under the base URL.
    pub fn contains(&self, url: &str) -> bool {
        url.starts_with(&self.prefix)
    }

    /// True when a discovered `url` should be handed to the frontier.
    pub fn admits(&self, url: &str) -> bool {
        if self.ignored.iter().any(|pattern| pattern.is_match(url)) {
            return false;
        }
        !self.internal_only || self.contains(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_is_normalized() {
        let scope = Scope::new(&Url::parse("http://example.com").unwrap(), true);
        assert!(scope.contains("http://example.com/"));
        assert!(scope.contains("http://example.com/docs/page"));
        assert!(!scope.contains("http://other.com/"));
        assert!(!scope.contains("https://example.com/"));
    }

    #[test]
    fn test_subpath_scope() {
        let scope = Scope::new(&Url::parse("http://example.com/docs/").unwrap(), true);
        assert!(scope.contains("http://example.com/docs/intro"));
        assert!(!scope.contains("http://example.com/blog/"));
    }

    #[test]
    fn test_admits_depends_on_internal_only() {
        let base = Url::parse("http://example.com/").unwrap();
        assert!(!Scope::new(&base, true).admits("http://other.com/"));
        assert!(Scope::new(&base, false).admits("http://other.com/"));
    }

    #[test]
    fn test_ignored_patterns_are_never_admitted() {
        let base = Url::parse("http://example.com/").unwrap();
        let scope = Scope::new(&base, false).ignoring(vec![
            Regex::new(r"/private/").unwrap(),
            Regex::new(r"^https?://ads\.").unwrap(),
        ]);

        assert!(!scope.admits("http://example.com/private/page"));
        assert!(!scope.admits("https://ads.tracker.com/pixel.gif"));
        assert!(scope.admits("http://example.com/public/page"));
        assert!(scope.admits("http://other.com/"));
        // Scope membership itself is unaffected
        assert!(scope.contains("http://example.com/private/page"));
    }
}
