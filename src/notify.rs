// src/notify.rs
// =============================================================================
// Tells someone when broken links were found.
//
// Providers:
// - webhook: POSTs {"message": "..."} as JSON to `data.url`
// - log: writes the message to the log (handy for cron mail / CI output)
//
// Also pings the optional health check URL after a clean run, so a
// monitoring service notices when the checker itself stops running.
// =============================================================================

use reqwest::{Client, StatusCode};
use serde::Serialize;
use thiserror::Error;

use crate::checker::{REQUEST_TIMEOUT, USER_AGENT};
use crate::config::NotifyConfig;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("unknown notification provider '{0}'")]
    UnknownProvider(String),
    #[error("provider '{provider}' needs '{key}' in its data")]
    MissingData {
        provider: String,
        key: &'static str,
    },
    #[error("failed to send notification: {0}")]
    Http(#[from] reqwest::Error),
    #[error("notification endpoint answered {0}")]
    Rejected(StatusCode),
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    message: &'a str,
}

#[derive(Debug, Clone)]
pub enum Notifier {
    Webhook { client: Client, url: String },
    Log,
}

impl Notifier {
    pub fn from_config(config: &NotifyConfig) -> Result<Self, NotifyError> {
        match config.provider.to_ascii_lowercase().as_str() {
            "webhook" => {
                let url = config
                    .data
                    .get("url")
                    .ok_or_else(|| NotifyError::MissingData {
                        provider: config.provider.clone(),
                        key: "url",
                    })?
                    .clone();
                Ok(Notifier::Webhook {
                    client: http_client()?,
                    url,
                })
            }
            "log" => Ok(Notifier::Log),
            _ => Err(NotifyError::UnknownProvider(config.provider.clone())),
        }
    }

    pub fn provider(&self) -> &'static str {
        match self {
            Notifier::Webhook { .. } => "webhook",
            Notifier::Log => "log",
        }
    }

    /// Delivers a pre-rendered message.
    pub async fn send(&self, message: &str) -> Result<(), NotifyError> {
        tracing::info!(provider = self.provider(), "sending notification");
        match self {
            Notifier::Webhook { client, url } => {
                let response = client
                    .post(url)
                    .json(&WebhookPayload { message })
                    .send()
                    .await?;
                if !response.status().is_success() {
                    return Err(NotifyError::Rejected(response.status()));
                }
            }
            Notifier::Log => {
                tracing::warn!("broken links found:\n{message}");
            }
        }
        tracing::info!(provider = self.provider(), "notification sent");
        Ok(())
    }
}

/// Calls the health check URL. Failures are logged, never returned: a broken
/// monitoring endpoint must not fail the link check.
pub async fn ping_health_check(url: &str) {
    let client = match http_client() {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "failed to build HTTP client for health check");
            return;
        }
    };

    match client.get(url).send().await {
        Ok(response) if response.status().is_success() => {
            tracing::debug!(url, "health check pinged");
        }
        Ok(response) => {
            tracing::error!(url, status = %response.status(), "health check URL rejected ping");
        }
        Err(e) => {
            tracing::error!(url, error = %e, "failed to ping health check URL");
        }
    }
}

fn http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
}
