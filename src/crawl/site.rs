// src/crawl/site.rs
// =============================================================================
// Crawls one site with a fixed pool of workers.
//
// How it works:
// 1. Spawn `workers` tasks, all pulling from one shared Frontier
// 2. Offer the site's own URL as the seed link
// 3. Each worker checks a link, offers the links found on it, records it
//    if broken, and goes back for more
// 4. Once the frontier is drained (or the deadline passes) close it, join
//    every worker, and build the SiteResult
//
// Nothing spawned here outlives the call.
// =============================================================================

use futures::future::join_all;
use regex::Regex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinHandle;
use url::Url;

use super::frontier::Frontier;
use crate::checker::{LinkChecker, Scope};
use crate::model::{Link, SiteResult};

pub const DEFAULT_WORKERS: usize = 8;

/// Problems with the crawl setup itself. Broken links are never errors.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("invalid site URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("site URL '{0}' must use http or https")]
    UnsupportedScheme(String),
    #[error("invalid ignored link pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlOptions {
    /// Number of concurrent workers (values below 1 are treated as 1)
    pub workers: usize,
    /// Only check URLs that start with the site URL
    pub internal_only: bool,
    /// Give up on the crawl after this long and report what was checked
    pub deadline: Option<Duration>,
    /// Regular expressions; matching URLs are skipped entirely
    pub ignored_links: Vec<String>,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            internal_only: false,
            deadline: None,
            ignored_links: Vec::new(),
        }
    }
}

/// Crawls `site` and reports every broken link reachable from it.
///
/// Returns an error only when the crawl can't start (bad URL, HTTP client
/// setup). The seed itself being unreachable is a broken link, not an error.
pub async fn check_site(site: &str, options: &CrawlOptions) -> Result<SiteResult, CrawlError> {
    let base = Url::parse(site).map_err(|source| CrawlError::InvalidUrl {
        url: site.to_string(),
        source,
    })?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(CrawlError::UnsupportedScheme(site.to_string()));
    }

    let ignored = options
        .ignored_links
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| CrawlError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let scope = Scope::new(&base, options.internal_only).ignoring(ignored);
    let checker = LinkChecker::new(scope)?;
    let frontier = Arc::new(Frontier::new());
    let workers = options.workers.max(1);
    let started = Instant::now();

    tracing::info!(
        site = %base,
        workers,
        internal_only = options.internal_only,
        "crawling site"
    );

    let handles: Vec<JoinHandle<()>> = (0..workers)
        .map(|id| tokio::spawn(run_worker(id, Arc::clone(&frontier), checker.clone())))
        .collect();

    frontier.offer(Link::seed(base.as_str()));

    let completed = match options.deadline {
        Some(deadline) => tokio::time::timeout(deadline, frontier.wait_drained())
            .await
            .is_ok(),
        None => {
            frontier.wait_drained().await;
            true
        }
    };

    frontier.close();
    if completed {
        debug_assert_eq!(frontier.visited_len(), frontier.dispatched());
    } else {
        tracing::warn!(
            site = %base,
            checked = frontier.dispatched(),
            "crawl deadline reached, stopping workers"
        );
        for handle in &handles {
            handle.abort();
        }
    }

    for joined in join_all(handles).await {
        match joined {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => {}
            Err(e) => tracing::error!(site = %base, error = %e, "worker crashed"),
        }
    }

    let result = SiteResult::new(site, frontier.dispatched(), frontier.take_broken());
    tracing::info!(
        site = %base,
        urls_checked = result.summary.urls_checked,
        urls_broken = result.summary.urls_broken,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "site checked"
    );

    Ok(result)
}

// Releases the link a worker is holding, even if checking it panicked.
// Without this a crashed worker would keep the frontier from ever draining.
struct InFlight<'a>(&'a Frontier);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.mark_done();
    }
}

async fn run_worker(id: usize, frontier: Arc<Frontier>, checker: LinkChecker) {
    while let Some(link) = frontier.take().await {
        let _in_flight = InFlight(&frontier);

        let checked = checker.check(link).await;
        // Offer before releasing the link, or the frontier could look
        // drained while new work is on its way
        for found in checked.discovered {
            frontier.offer(found);
        }
        if checked.link.is_broken() {
            frontier.record_broken(checked.link);
        }
    }
    tracing::debug!(worker = id, "worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::{GET, HEAD};
    use httpmock::{Mock, MockServer};
    use rstest::rstest;

    async fn html_page<'a>(server: &'a MockServer, path: &str, body: &str) -> Vec<Mock<'a>> {
        let head = server
            .mock_async(|when, then| {
                when.method(HEAD).path(path);
                then.status(200).header("content-type", "text/html; charset=utf-8");
            })
            .await;
        let get = server
            .mock_async(|when, then| {
                when.method(GET).path(path);
                then.status(200)
                    .header("content-type", "text/html; charset=utf-8")
                    .body(body);
            })
            .await;
        vec![head, get]
    }

    async fn resource<'a>(
        server: &'a MockServer,
        path: &str,
        status: u16,
        content_type: &str,
    ) -> Mock<'a> {
        server
            .mock_async(|when, then| {
                when.method(HEAD).path(path);
                then.status(status).header("content-type", content_type);
            })
            .await
    }

    // Two pages, three assets, one missing page and one external teapot:
    //   /        -> /about, /missing, /style.css, <external>/teapot
    //   /about   -> /, /logo.png, /app.js, <external>/teapot, /about#team
    async fn two_page_site<'a>(site: &'a MockServer, external: &'a MockServer) -> Vec<Mock<'a>> {
        let teapot = external.url("/teapot");
        let mut mocks = html_page(
            site,
            "/",
            &format!(
                r#"<html><head><link rel="stylesheet" href="/style.css"></head>
                   <body><a href="/about">About</a> <a href="/missing">Gone</a>
                   <a href="{teapot}">Tea</a></body></html>"#
            ),
        )
        .await;
        mocks.extend(
            html_page(
                site,
                "/about",
                &format!(
                    r##"<html><body><a href="/">Home</a> <img src="logo.png">
                       <script src="/app.js"></script> <a href="{teapot}">Tea</a>
                       <a href="#team">Team</a> <a href="/about#team">Team</a></body></html>"##
                ),
            )
            .await,
        );
        mocks.push(resource(site, "/style.css", 200, "text/css").await);
        mocks.push(resource(site, "/logo.png", 200, "image/png").await);
        mocks.push(resource(site, "/app.js", 200, "application/javascript").await);
        mocks.push(resource(site, "/missing", 404, "text/html").await);
        mocks.push(resource(external, "/teapot", 418, "text/plain").await);
        mocks
    }

    fn options(workers: usize, internal_only: bool) -> CrawlOptions {
        CrawlOptions {
            workers,
            internal_only,
            ..CrawlOptions::default()
        }
    }

    // Answers both HEAD and GET on `path` with a redirect to `location`
    async fn redirect<'a>(
        server: &'a MockServer,
        path: &str,
        status: u16,
        location: &str,
    ) -> Mock<'a> {
        server
            .mock_async(|when, then| {
                when.path(path);
                then.status(status).header("location", location);
            })
            .await
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(8)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reports_broken_links(#[case] workers: usize) {
        let site = MockServer::start_async().await;
        let external = MockServer::start_async().await;
        let _mocks = two_page_site(&site, &external).await;

        let result = check_site(&site.base_url(), &options(workers, false))
            .await
            .unwrap();

        assert_eq!(result.site, site.base_url());
        assert_eq!(result.summary.urls_checked, 7);
        assert_eq!(result.summary.urls_broken, 2);

        let mut broken: Vec<_> = result
            .details
            .broken
            .iter()
            .map(|l| (l.url.clone(), l.status.clone().unwrap_or_default()))
            .collect();
        broken.sort();
        let mut expected = vec![
            (site.url("/missing"), "404 - Not Found".to_string()),
            (external.url("/teapot"), "418 - I'm a teapot".to_string()),
        ];
        expected.sort();
        assert_eq!(broken, expected);

        let missing = result
            .details
            .broken
            .iter()
            .find(|l| l.url == site.url("/missing"))
            .unwrap();
        assert_eq!(missing.page, site.url("/"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_each_url_is_checked_once() {
        let site = MockServer::start_async().await;
        let external = MockServer::start_async().await;
        let mocks = two_page_site(&site, &external).await;

        check_site(&site.base_url(), &options(8, false)).await.unwrap();

        for mock in &mocks {
            mock.assert_hits_async(1).await;
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_internal_only_skips_external_urls() {
        let site = MockServer::start_async().await;
        let external = MockServer::start_async().await;
        let _mocks = two_page_site(&site, &external).await;

        let result = check_site(&site.base_url(), &options(4, true))
            .await
            .unwrap();

        assert_eq!(result.summary.urls_checked, 6);
        assert_eq!(result.summary.urls_broken, 1);
        assert_eq!(result.details.broken[0].url, site.url("/missing"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cycles_terminate() {
        let site = MockServer::start_async().await;
        let _root = html_page(&site, "/", r#"<a href="/a">A</a>"#).await;
        let _a = html_page(&site, "/a", r#"<a href="/b">B</a><a href="/">Home</a>"#).await;
        let _b = html_page(&site, "/b", r#"<a href="/a">A</a><a href="/">Home</a>"#).await;

        let result = tokio::time::timeout(
            Duration::from_secs(10),
            check_site(&site.base_url(), &options(3, true)),
        )
        .await
        .expect("crawl should terminate")
        .unwrap();

        assert_eq!(result.summary.urls_checked, 3);
        assert_eq!(result.summary.urls_broken, 0);
    }

    #[tokio::test]
    async fn test_unreachable_site_is_a_broken_seed() {
        let result = check_site("http://127.0.0.1:1/", &options(2, true))
            .await
            .unwrap();

        assert_eq!(result.summary.urls_checked, 1);
        assert_eq!(result.summary.urls_broken, 1);
        assert_eq!(result.details.broken[0].page, "");
        assert!(result.details.broken[0].status.is_some());
    }

    #[tokio::test]
    async fn test_deadline_stops_the_crawl() {
        let site = MockServer::start_async().await;
        site.mock_async(|when, then| {
            when.method(HEAD).path("/");
            then.status(200).delay(Duration::from_secs(5));
        })
        .await;

        let base = site.base_url();
        let options = CrawlOptions {
            workers: 2,
            internal_only: true,
            deadline: Some(Duration::from_millis(200)),
            ..CrawlOptions::default()
        };
        let crawl = check_site(&base, &options);
        let result = tokio::time::timeout(Duration::from_secs(3), crawl)
            .await
            .expect("deadline should end the crawl early")
            .unwrap();

        assert_eq!(result.summary.urls_checked, 1);
        assert_eq!(result.summary.urls_broken, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_redirected_page_resolves_links_against_final_url() {
        let site = MockServer::start_async().await;
        let _docs = redirect(&site, "/docs", 301, &site.url("/docs/")).await;
        let _index = html_page(&site, "/docs/", r#"<a href="intro">Intro</a>"#).await;
        let intro = resource(&site, "/docs/intro", 200, "text/plain").await;
        let wrong = resource(&site, "/intro", 404, "text/html").await;

        let result = check_site(&site.url("/docs"), &options(2, true))
            .await
            .unwrap();

        assert_eq!(result.summary.urls_checked, 2);
        assert_eq!(result.summary.urls_broken, 0);
        intro.assert_hits_async(1).await;
        wrong.assert_hits_async(0).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_redirect_to_external_page_is_not_scanned() {
        let site = MockServer::start_async().await;
        let external = MockServer::start_async().await;
        let _root = html_page(&site, "/", r#"<a href="/go">Go</a>"#).await;
        let _go = redirect(&site, "/go", 302, &external.url("/landing")).await;
        let landing =
            html_page(&external, "/landing", r#"<a href="/a">A</a><a href="b">B</a>"#).await;

        let result = check_site(&site.base_url(), &options(2, false))
            .await
            .unwrap();

        assert_eq!(result.summary.urls_checked, 2);
        assert_eq!(result.summary.urls_broken, 0);
        // HEAD reached the external page, its body was never fetched
        landing[0].assert_hits_async(1).await;
        landing[1].assert_hits_async(0).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_ignored_links_are_not_checked() {
        let site = MockServer::start_async().await;
        let _root = html_page(
            &site,
            "/",
            r#"<a href="/private/admin">Admin</a><a href="/public">Public</a>"#,
        )
        .await;
        let private = resource(&site, "/private/admin", 404, "text/html").await;
        let _public = resource(&site, "/public", 200, "text/plain").await;

        let base = site.base_url();
        let options = CrawlOptions {
            workers: 2,
            ignored_links: vec!["/private/".to_string()],
            ..CrawlOptions::default()
        };
        let result = check_site(&base, &options).await.unwrap();

        assert_eq!(result.summary.urls_checked, 2);
        assert_eq!(result.summary.urls_broken, 0);
        private.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn test_invalid_ignored_pattern_is_an_error() {
        let options = CrawlOptions {
            ignored_links: vec!["(unclosed".to_string()],
            ..CrawlOptions::default()
        };
        let err = check_site("http://127.0.0.1:1/", &options).await.unwrap_err();
        assert!(matches!(err, CrawlError::InvalidPattern { .. }));
    }

    #[rstest]
    #[case("not a url")]
    #[case("ftp://example.com/")]
    #[tokio::test]
    async fn test_invalid_site_url_is_an_error(#[case] site: &str) {
        assert!(check_site(site, &CrawlOptions::default()).await.is_err());
    }
}
