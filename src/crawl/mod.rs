// src/crawl/mod.rs
// =============================================================================
// This module handles website crawling.
//
// Features:
// - A fixed pool of concurrent workers per site
// - Every distinct URL is checked exactly once
// - Only internal HTML pages are scanned for further links
// - Optional deadline for the whole crawl
//
// Submodules:
// - frontier: the shared work queue + visited set
// - site: spawns the workers and builds the per-site result
// =============================================================================

mod frontier;
mod site;

// Re-export the main crawling function
pub use site::{check_site, CrawlOptions, DEFAULT_WORKERS};
