// src/model.rs
// =============================================================================
// Data types shared by the crawler, the report and the notifier.
//
// - Link: one discovered URL plus the page it was found on
// - SiteResult: everything we learned about one configured site
//
// All of these serialize to JSON with stable field names, because the
// results are printed and forwarded to notification providers as-is.
// =============================================================================

use serde::{Deserialize, Serialize};

/// A URL found while crawling.
///
/// `page` is empty for the seed link of a site. `status` stays `None` while
/// the link is healthy and holds a description of the failure once the link
/// has been classified as broken.
///
/// `==` compares all three fields. Two links are the same crawl target when
/// their `url`s match, whatever page they were found on; the frontier
/// dedups on `url` alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    pub page: String,
    pub status: Option<String>,
}

impl Link {
    /// The first link of a crawl: the site itself, found on no page.
    pub fn seed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            page: String::new(),
            status: None,
        }
    }

    /// A link discovered on `page`.
    pub fn found_on(url: impl Into<String>, page: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            page: page.into(),
            status: None,
        }
    }

    /// Consumes the link and returns it marked as broken.
    ///
    /// Marking produces a new value instead of mutating a shared one, so a
    /// worker never races another worker over the same `Link`.
    pub fn into_broken(self, status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..self
        }
    }

    pub fn is_broken(&self) -> bool {
        self.status.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteResultSummary {
    pub urls_checked: usize,
    pub urls_broken: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteResultDetails {
    /// Broken links in the order the workers classified them.
    pub broken: Vec<Link>,
}

/// Outcome of crawling one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteResult {
    pub site: String,
    pub summary: SiteResultSummary,
    pub details: SiteResultDetails,
}

impl SiteResult {
    pub fn new(site: impl Into<String>, urls_checked: usize, broken: Vec<Link>) -> Self {
        Self {
            site: site.into(),
            summary: SiteResultSummary {
                urls_checked,
                urls_broken: broken.len(),
            },
            details: SiteResultDetails { broken },
        }
    }

    pub fn has_broken_links(&self) -> bool {
        self.summary.urls_broken > 0
    }
}
