// src/checker/http.rs
// =============================================================================
// This module checks if URLs are alive by making HTTP requests.
//
// Key functionality:
// - Makes HTTP HEAD requests (lightweight, no body download)
// - Falls back to GET when the server answers 405 Method Not Allowed
// - Marks anything >= 400, and any transport failure, as broken
// - Downloads internal HTML pages and returns the links found on them
//
// HEAD first matters: most URLs on a site are images, scripts and
// stylesheets, and we never need their bodies.
// =============================================================================

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, Response, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::html::extract_html_links;
use super::scope::Scope;
use crate::model::Link;

pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:77.0) Gecko/20100101 Firefox/77.0";

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a URL could not be confirmed as healthy.
///
/// The `Display` text is what ends up in the `status` field of a broken link.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered with a status code >= 400
    #[error("{code} - {reason}")]
    Status { code: u16, reason: String },
    #[error("Request timed out")]
    Timeout,
    #[error("Too many redirects")]
    TooManyRedirects,
    #[error("Connection failed: {0}")]
    Connect(#[source] reqwest::Error),
    #[error("{0}")]
    Request(#[source] reqwest::Error),
}

// reqwest errors can happen for many reasons; sort them into the cases
// a reader of the report can act on
impl From<reqwest::Error> for FetchError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            FetchError::Timeout
        } else if error.is_redirect() {
            FetchError::TooManyRedirects
        } else if error.is_connect() {
            FetchError::Connect(error)
        } else {
            FetchError::Request(error)
        }
    }
}

/// The result of checking one link.
#[derive(Debug, Clone)]
pub struct Checked {
    /// The link, marked broken if the check failed
    pub link: Link,
    /// Links found on the page, already filtered by scope
    pub discovered: Vec<Link>,
}

/// Checks links for one site. Cheap to clone: the reqwest client is
/// reference counted internally, so all workers share one connection pool.
#[derive(Debug, Clone)]
pub struct LinkChecker {
    client: Client,
    scope: Scope,
}

impl LinkChecker {
    pub fn new(scope: Scope) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, scope })
    }

    // Checks a single link
    //
    // Never fails: every problem is recorded on the returned link instead,
    // so one bad URL can't take a worker down.
    pub async fn check(&self, link: Link) -> Checked {
        tracing::debug!(url = %link.url, page = %link.page, "checking");

        match self.fetch(&link.url).await {
            Ok(None) => Checked {
                link,
                discovered: Vec::new(),
            },
            Ok(Some((page_url, body))) => {
                let discovered = self.discover(&page_url, &link.url, &body);
                tracing::debug!(url = %link.url, found = discovered.len(), "page scanned");
                Checked { link, discovered }
            }
            Err(e) => {
                tracing::warn!(url = %link.url, page = %link.page, error = %e, "broken link");
                Checked {
                    link: link.into_broken(e.to_string()),
                    discovered: Vec::new(),
                }
            }
        }
    }

    // Returns the final URL and body when the URL is an internal HTML page
    // we should scan, None when it is healthy but not worth scanning
    async fn fetch(&self, url: &str) -> Result<Option<(Url, String)>, FetchError> {
        let mut response = self.send(Method::HEAD, url).await?;
        let mut is_get = false;

        // Some servers reject HEAD outright
        if response.status() == StatusCode::METHOD_NOT_ALLOWED {
            tracing::debug!(url, "HEAD not allowed, retrying with GET");
            response = self.send(Method::GET, url).await?;
            is_get = true;
        }

        // reqwest has already followed any redirects: scope is decided by
        // where the request ended up, not by the URL we were given
        let response = ensure_success(response).await?;
        if !is_html(&response) || !self.scope.contains(response.url().as_str()) {
            return Ok(None);
        }

        // Reuse the body if the fallback already downloaded it
        let response = if is_get {
            response
        } else {
            ensure_success(self.send(Method::GET, url).await?).await?
        };

        let page_url = response.url().clone();
        if !self.scope.contains(page_url.as_str()) {
            return Ok(None);
        }
        if page_url.as_str() != url {
            tracing::debug!(url, final_url = %page_url, "followed redirect");
        }

        Ok(Some((page_url, response.text().await?)))
    }

    async fn send(&self, method: Method, url: &str) -> Result<Response, FetchError> {
        Ok(self.client.request(method, url).send().await?)
    }

    // Relative links resolve against `page_url`, the address the body was
    // actually served from; reports still name the URL that was linked
    fn discover(&self, page_url: &Url, page: &str, body: &str) -> Vec<Link> {
        extract_html_links(page_url, body)
            .filter(|url| {
                let admitted = self.scope.admits(url.as_str());
                if !admitted {
                    tracing::debug!(%url, page, "ignoring link");
                }
                admitted
            })
            .map(|url| Link::found_on(url, page))
            .collect()
    }
}

// HTTP status codes:
// - 200-299: Success
// - 300-399: Redirect (reqwest already followed the real ones)
// - 400-499: Client error (404 not found, etc.)
// - 500-599: Server error
async fn ensure_success(response: Response) -> Result<Response, FetchError> {
    let status = response.status();
    if status.as_u16() < 400 {
        return Ok(response);
    }

    // Unknown codes have no reason phrase; use whatever the server sent
    let reason = match status.canonical_reason() {
        Some(reason) => reason.to_string(),
        None => {
            let body = response.text().await.unwrap_or_default();
            match body.trim() {
                "" => "Unknown Status".to_string(),
                text => text.to_string(),
            }
        }
    };

    Err(FetchError::Status {
        code: status.as_u16(),
        reason,
    })
}

fn is_html(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim_start().to_ascii_lowercase().starts_with("text/html"))
}
