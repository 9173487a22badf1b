// src/config.rs
// =============================================================================
// Run configuration: the seed pages to crawl and the knobs the checking
// engine honours (timeouts, redirect hop limit, concurrency, deadline).
//
// Seeds come from a small JSON file:
//
//   {
//     "skip_domains": ["wordpress.org", "fonts.googleapis.com"],
//     "seeds": [
//       { "label": "Eyehike webcams", "url": "https://www.eyehike.com/2016/webcams/" }
//     ]
//   }
//
// Everything else has a default and can be overridden from the command line.
// =============================================================================

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read seeds file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("seeds file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("seed '{label}' has an invalid URL '{url}': {reason}")]
    InvalidSeedUrl {
        label: String,
        url: String,
        reason: String,
    },

    #[error("seeds file {0} lists no seeds")]
    NoSeeds(PathBuf),

    #[error("invalid setting: {0}")]
    InvalidSetting(String),
}

/// A site entry point to crawl for outbound links.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeedPage {
    /// Human-readable site name shown in the report
    pub label: String,
    /// Absolute http(s) URL of the page to scan
    pub url: String,
    /// Extra hosts whose links count as internal for this seed
    #[serde(default)]
    pub skip_domains: Vec<String>,
}

impl SeedPage {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
            skip_domains: Vec::new(),
        }
    }

    pub fn with_skip_domains(mut self, domains: Vec<String>) -> Self {
        self.skip_domains = domains;
        self
    }

    /// Checks that the URL is absolute http(s)
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidSeedUrl {
            label: self.label.clone(),
            url: self.url.clone(),
            reason,
        };

        let parsed = Url::parse(&self.url).map_err(|e| invalid(e.to_string()))?;
        match parsed.scheme() {
            "http" | "https" => {}
            other => return Err(invalid(format!("unsupported scheme '{}'", other))),
        }
        if parsed.host_str().is_none() {
            return Err(invalid("missing host".to_string()));
        }
        Ok(())
    }
}

/// The on-disk seed list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedsFile {
    pub seeds: Vec<SeedPage>,
    /// Hosts skipped on every seed (theme vendors, font CDNs, ...)
    #[serde(default)]
    pub skip_domains: Vec<String>,
}

impl SeedsFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file = Self::parse(&raw).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        if file.seeds.is_empty() {
            return Err(ConfigError::NoSeeds(path.to_path_buf()));
        }
        for seed in &file.seeds {
            seed.validate()?;
        }
        Ok(file)
    }

    fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Explicit retry budget for a single probe.
///
/// `max_attempts` counts the first try, so the default of 1 means no retries.
/// Only transport failures and timeouts are retried, never HTTP statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Wait before retry `n` is `backoff * n`
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    /// Delay to wait after a failed attempt (1-based), or None when the
    /// budget is spent.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            None
        } else {
            Some(self.backoff * attempt)
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Knobs for one checking run.
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Per-probe request timeout (default 10s)
    pub probe_timeout: Duration,
    /// Seed page fetch timeout (default 15s)
    pub page_timeout: Duration,
    /// Redirect hops followed before giving up (default 5)
    pub max_redirects: usize,
    /// Probe worker pool size (default 10)
    pub concurrency: usize,
    /// Seed pages fetched at once (default 5)
    pub page_concurrency: usize,
    /// Global run deadline, counted from the start of the run and covering
    /// both seed page fetches and link probes (default: none)
    pub deadline: Option<Duration>,
    pub user_agent: String,
    /// Hosts skipped on every seed
    pub skip_domains: Vec<String>,
    pub retry: RetryPolicy,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(10),
            page_timeout: Duration::from_secs(15),
            max_redirects: 5,
            concurrency: 10,
            page_concurrency: 5,
            deadline: None,
            user_agent: format!("link-sentinel/{}", env!("CARGO_PKG_VERSION")),
            skip_domains: Vec::new(),
            retry: RetryPolicy::none(),
        }
    }
}

impl CheckerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidSetting(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.page_concurrency == 0 {
            return Err(ConfigError::InvalidSetting(
                "page concurrency must be at least 1".to_string(),
            ));
        }
        if self.probe_timeout.is_zero() || self.page_timeout.is_zero() {
            return Err(ConfigError::InvalidSetting(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidSetting(
                "retry attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = CheckerConfig::default();
        assert_eq!(config.probe_timeout, Duration::from_secs(10));
        assert_eq!(config.max_redirects, 5);
        assert_eq!(config.concurrency, 10);
        assert!(config.deadline.is_none());
        assert_eq!(config.retry.max_attempts, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = CheckerConfig {
            concurrency: 0,
            ..CheckerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSetting(_))
        ));
    }

    #[test]
    fn test_parse_seeds_file() {
        let raw = r#"{
            "skip_domains": ["wordpress.org"],
            "seeds": [
                { "label": "Eyehike", "url": "https://www.eyehike.com/2016/webcams/" },
                { "label": "Other", "url": "https://other.example/", "skip_domains": ["cdn.other.example"] }
            ]
        }"#;
        let file = SeedsFile::parse(raw).unwrap();
        assert_eq!(file.seeds.len(), 2);
        assert_eq!(file.skip_domains, vec!["wordpress.org"]);
        assert!(file.seeds[0].skip_domains.is_empty());
        assert_eq!(file.seeds[1].skip_domains, vec!["cdn.other.example"]);
    }

    #[test]
    fn test_seed_validation() {
        assert!(SeedPage::new("ok", "https://example.com/").validate().is_ok());
        assert!(SeedPage::new("rel", "/about").validate().is_err());
        assert!(SeedPage::new("ftp", "ftp://example.com/").validate().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = SeedsFile::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_retry_delays() {
        let policy = RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_millis(100),
        };
        assert_eq!(policy.delay_after(1), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_after(2), Some(Duration::from_millis(200)));
        assert_eq!(policy.delay_after(3), None);
        assert_eq!(RetryPolicy::none().delay_after(1), None);
    }
}
