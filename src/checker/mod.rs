// src/checker/mod.rs
// =============================================================================
// This module contains all link checking logic.
//
// Submodules:
// - html: Extracts candidate links from HTML pages
// - http: Makes HTTP requests to check if links are alive
// - scope: Decides which URLs belong to the crawled site
// =============================================================================

mod html;
mod http;
mod scope;

// Re-export public items from submodules so callers can write
// `checker::LinkChecker` instead of `checker::http::LinkChecker`
pub use http::{LinkChecker, REQUEST_TIMEOUT, USER_AGENT};
pub use scope::Scope;
