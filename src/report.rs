// src/report.rs
// =============================================================================
// Turns the per-site results into output.
//
// - broken_sites: keeps only the sites that need someone's attention
// - to_pretty_json: the JSON rendering used for stdout and notifications
// =============================================================================

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::model::SiteResult;

/// Sites with at least one broken link, in their original order.
pub fn broken_sites(results: &[SiteResult]) -> Vec<&SiteResult> {
    results.iter().filter(|r| r.has_broken_links()).collect()
}

/// Pretty JSON with four-space indentation.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    // serde_json only ever writes valid UTF-8
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
