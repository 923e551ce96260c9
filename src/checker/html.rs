// src/checker/html.rs
// =============================================================================
// This module extracts candidate links from HTML pages.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever, which recovers from broken markup the same way
//   a browser does (unclosed tags, stray bytes, unknown elements...)
//
// We also use the `url` crate to:
// - Resolve relative URLs against the page they were found on
// - Strip the fragment (#...) so one page is only checked once
//
// Every element/attribute pair that can reference another resource is
// scanned, not only anchors: a missing image or stylesheet is just as broken
// as a missing page.
// =============================================================================

use scraper::{Html, Selector};
use url::Url;

// Elements we look at, and which of their attributes hold URLs
const LINK_ATTRIBUTES: &[(&str, &[&str])] = &[
    ("a", &["href"]),
    ("img", &["src", "srcset"]),
    ("link", &["href"]),
    ("script", &["src"]),
    ("source", &["srcset"]),
];

// Values starting with one of these are not fetchable documents
const IGNORED_SCHEMES: &[&str] = &["data:", "ftp:", "javascript:", "mailto:", "tel:"];

// <link rel="..."> values that are browser hints rather than resources
const IGNORED_LINK_RELS: &[&str] = &["dns-prefetch", "pingback", "preconnect", "profile"];

const LINK_SELECTOR: &str = "a, img, link, script, source";

// Extracts all candidate links from an HTML page
//
// Parameters:
//   page: the absolute URL of the page (for resolving relative links)
//   html: the HTML content of that page
//
// Returns: a single-pass iterator over absolute, fragment-free URLs, in
// document order. Duplicates are NOT removed here; that's the frontier's job.
//
// Example:
//   page = "http://example.com/subfolder/index.html"
//   html = "<a href='test'>Test</a>"
//   yields "http://example.com/subfolder/test"
pub fn extract_html_links(page: &Url, html: &str) -> impl Iterator<Item = Url> {
    // Parse the whole document up front. The DOM is dropped before we return,
    // so the iterator can travel across .await points in the workers.
    let document = Html::parse_document(html);
    let selector = Selector::parse(LINK_SELECTOR).expect("link selector is valid");

    let mut values = Vec::new();
    for element in document.select(&selector) {
        let element = element.value();

        let Some((_, attributes)) = LINK_ATTRIBUTES
            .iter()
            .find(|(tag, _)| *tag == element.name())
        else {
            continue;
        };

        if element.name() == "link" && is_ignored_rel(element.attr("rel")) {
            tracing::debug!(page = %page, "skipping <link> hint");
            continue;
        }

        for attribute in attributes.iter() {
            let Some(value) = element.attr(attribute) else {
                continue;
            };
            if *attribute == "srcset" {
                values.extend(srcset_candidates(value));
            } else {
                values.push(value.to_string());
            }
        }
    }

    let page = page.clone();
    values
        .into_iter()
        .filter_map(move |value| resolve_link(&page, &value))
}

// Resolves one attribute value to an absolute URL
//
// Returns None for values we never want to check:
//   ""                   -> nothing to check
//   "#top"               -> the page we are already on
//   "mailto:me@host"     -> ignored scheme
//   "http://[::1]:port"  -> can't be parsed at all
fn resolve_link(page: &Url, value: &str) -> Option<Url> {
    let value = value.trim();
    if value.is_empty() || value.starts_with('#') || has_ignored_scheme(value) {
        return None;
    }

    match page.join(value) {
        Ok(mut url) => {
            url.set_fragment(None);
            Some(url)
        }
        Err(e) => {
            tracing::debug!(page = %page, value, error = %e, "dropping unresolvable link");
            None
        }
    }
}

fn has_ignored_scheme(value: &str) -> bool {
    IGNORED_SCHEMES.iter().any(|scheme| {
        value
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

// A srcset looks like "/img/a.jpg 1x, /img/a@2x.jpg 2x"
// Each comma-separated candidate starts with its URL.
fn srcset_candidates(srcset: &str) -> impl Iterator<Item = String> + '_ {
    srcset
        .split(',')
        .filter_map(|candidate| candidate.split_whitespace().next())
        .map(str::to_string)
}

fn is_ignored_rel(rel: Option<&str>) -> bool {
    let Some(rel) = rel else {
        return false;
    };
    let mut tokens = rel.split_whitespace().peekable();
    tokens.peek().is_some()
        && tokens.all(|token| {
            IGNORED_LINK_RELS
                .iter()
                .any(|ignored| ignored.eq_ignore_ascii_case(token))
        })
}
