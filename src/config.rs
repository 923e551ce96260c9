// src/config.rs
// =============================================================================
// Loads the YAML configuration file.
//
// Example config.yml:
//
//   sites:
//     - https://example.com
//     - url: https://blog.example.com
//       ignored_links:
//         - ^https://blog\.example\.com/drafts/
//   cron: "0 3 * * *"
//   workers_per_site: 8
//   internal_links_only: false
//   crawl_timeout_secs: 600
//   notify:
//     provider: webhook
//     data:
//       url: https://hooks.example.com/deadlink
//   health_check_url: https://hc.example.com/ping/abc
//
// A site is either a plain URL or a map with its own ignored link patterns.
// Without `cron` the sites are checked once and the program exits.
// Everything except `sites` has a default. The file is validated once here,
// so the crawler can trust what it receives.
// =============================================================================

use cron::Schedule;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::crawl::{CrawlOptions, DEFAULT_WORKERS};
use crate::schedule;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found at '{}'", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read config file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("no sites defined")]
    NoSites,
    #[error("invalid site URL '{url}': {reason}")]
    InvalidSite { url: String, reason: String },
    #[error("invalid ignored link '{pattern}' for site '{site}': {reason}")]
    InvalidIgnoredLink {
        site: String,
        pattern: String,
        reason: String,
    },
    #[error("invalid cron spec '{spec}': {reason}")]
    InvalidCron { spec: String, reason: String },
    #[error("workers_per_site must be at least 1")]
    NoWorkers,
    #[error("invalid health check URL '{0}'")]
    InvalidHealthCheck(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sites: Vec<SiteConfig>,
    #[serde(default)]
    pub cron: Option<String>,
    #[serde(default = "default_workers")]
    pub workers_per_site: usize,
    #[serde(default)]
    pub internal_links_only: bool,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub crawl_timeout_secs: Option<u64>,
    #[serde(default)]
    pub notify: Option<NotifyConfig>,
    #[serde(default)]
    pub health_check_url: Option<String>,
}

/// One entry of `sites`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SiteConfig {
    Url(String),
    Detailed {
        url: String,
        #[serde(default)]
        ignored_links: Vec<String>,
    },
}

impl SiteConfig {
    pub fn url(&self) -> &str {
        match self {
            SiteConfig::Url(url) | SiteConfig::Detailed { url, .. } => url,
        }
    }

    pub fn ignored_links(&self) -> &[String] {
        match self {
            SiteConfig::Url(_) => &[],
            SiteConfig::Detailed { ignored_links, .. } => ignored_links,
        }
    }
}

/// Which notification provider to use, and the provider-specific settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NotifyConfig {
    pub provider: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

impl Config {
    /// Reads, parses and validates the config file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sites.is_empty() {
            return Err(ConfigError::NoSites);
        }
        for site in &self.sites {
            let url = Url::parse(site.url()).map_err(|e| ConfigError::InvalidSite {
                url: site.url().to_string(),
                reason: e.to_string(),
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidSite {
                    url: site.url().to_string(),
                    reason: "scheme must be http or https".to_string(),
                });
            }
            for pattern in site.ignored_links() {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidIgnoredLink {
                    site: site.url().to_string(),
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
            }
        }
        // Surfaces a bad cron spec at startup rather than at the first run
        self.schedule(false)?;
        if self.workers_per_site == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if let Some(health_check) = &self.health_check_url {
            Url::parse(health_check)
                .map_err(|_| ConfigError::InvalidHealthCheck(health_check.clone()))?;
        }
        Ok(())
    }

    /// Crawl settings for one of the configured sites.
    pub fn crawl_options(&self, site: &SiteConfig) -> CrawlOptions {
        CrawlOptions {
            workers: self.workers_per_site,
            internal_only: self.internal_links_only,
            deadline: self.crawl_timeout_secs.map(Duration::from_secs),
            ignored_links: site.ignored_links().to_vec(),
        }
    }

    /// The schedule to run on, or None for a single run. `run_now`
    /// overrides the configured cron spec.
    pub fn schedule(&self, run_now: bool) -> Result<Option<Schedule>, ConfigError> {
        match &self.cron {
            Some(spec) if !run_now => schedule::parse(spec).map(Some).map_err(|e| {
                ConfigError::InvalidCron {
                    spec: spec.clone(),
                    reason: e.to_string(),
                }
            }),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(yaml: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_applies_defaults() {
        let file = write_config("sites:\n  - http://example.com\n");
        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.sites, vec![SiteConfig::Url("http://example.com".to_string())]);
        assert_eq!(config.workers_per_site, 8);
        assert!(!config.internal_links_only);
        assert!(!config.verbose);
        assert_eq!(config.cron, None);
        assert_eq!(config.notify, None);
        assert_eq!(config.crawl_options(&config.sites[0]), CrawlOptions::default());
    }

    #[test]
    fn test_load_full_config() {
        let file = write_config(
            r#"
sites:
  - https://example.com
  - url: https://blog.example.com/
    ignored_links:
      - /drafts/
      - \.pdf$
cron: "*/30 * * * *"
workers_per_site: 3
internal_links_only: true
verbose: true
crawl_timeout_secs: 60
notify:
  provider: webhook
  data:
    url: https://hooks.example.com/x
health_check_url: https://hc.example.com/ping
"#,
        );
        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.sites.len(), 2);
        assert_eq!(config.sites[1].url(), "https://blog.example.com/");
        assert_eq!(config.cron.as_deref(), Some("*/30 * * * *"));
        assert!(config.verbose);
        let notify = config.notify.as_ref().unwrap();
        assert_eq!(notify.provider, "webhook");
        assert_eq!(notify.data["url"], "https://hooks.example.com/x");
        assert_eq!(
            config.crawl_options(&config.sites[1]),
            CrawlOptions {
                workers: 3,
                internal_only: true,
                deadline: Some(Duration::from_secs(60)),
                ignored_links: vec!["/drafts/".to_string(), r"\.pdf$".to_string()],
            }
        );
        assert!(config.crawl_options(&config.sites[0]).ignored_links.is_empty());
    }

    #[test]
    fn test_invalid_ignored_link() {
        let err = Config::from_yaml(
            "sites:\n  - url: http://example.com\n    ignored_links: ['(oops']\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidIgnoredLink { .. }));
    }

    #[test]
    fn test_invalid_cron() {
        let err = Config::from_yaml("sites: ['http://example.com']\ncron: 'every day'\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCron { .. }));
    }

    #[test]
    fn test_schedule_runs_once_without_cron_or_with_run_now() {
        let once = Config::from_yaml("sites: ['http://example.com']\n").unwrap();
        assert!(once.schedule(false).unwrap().is_none());
        assert!(once.schedule(true).unwrap().is_none());

        let cron = Config::from_yaml("sites: ['http://example.com']\ncron: '0 3 * * *'\n").unwrap();
        assert!(cron.schedule(false).unwrap().is_some());
        assert!(cron.schedule(true).unwrap().is_none());
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Path::new("/definitely/not/here.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_no_sites() {
        let err = Config::from_yaml("workers_per_site: 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::NoSites));
    }

    #[test]
    fn test_zero_workers() {
        let err = Config::from_yaml("sites: ['http://example.com']\nworkers_per_site: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::NoWorkers));
    }

    #[test]
    fn test_invalid_site() {
        let err = Config::from_yaml("sites: [example.com]\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSite { .. }));

        let err = Config::from_yaml("sites: ['ftp://example.com']\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSite { .. }));
    }

    #[test]
    fn test_malformed_yaml() {
        let err = Config::from_yaml("sites: ['http://example.com'\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
