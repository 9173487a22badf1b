// src/checker/probe.rs
// =============================================================================
// Probe Client: checks one URL over HTTP and records what happened.
//
// Key functionality:
// - HEAD first (no body download), GET when the server refuses HEAD
// - Per-request timeout and a capped number of redirect hops
// - Every failure mode is captured in the ProbeOutcome; probe() never fails
//
// A failed probe is routine data for the report, so there is no Result here.
// =============================================================================

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use std::error::Error as StdError;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::{CheckerConfig, RetryPolicy};

/// Statuses some servers answer to HEAD when they only implement GET
const HEAD_REJECTED: [StatusCode; 3] = [
    StatusCode::FORBIDDEN,
    StatusCode::METHOD_NOT_ALLOWED,
    StatusCode::NOT_IMPLEMENTED,
];

/// Transport-level failure recorded on a probe outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    None,
    Timeout,
    Dns,
    Tls,
    OtherTransport,
}

impl FailureKind {
    pub fn is_failure(self) -> bool {
        self != FailureKind::None
    }
}

/// The raw result of checking one target URL
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeOutcome {
    pub target_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    /// Present only when the request ended somewhere else
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    pub failure_kind: FailureKind,
    pub elapsed: Duration,
    /// Transport error text, for the report
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ProbeOutcome {
    pub fn response(target_url: impl Into<String>, status: u16, final_url: Option<String>, elapsed: Duration) -> Self {
        Self {
            target_url: target_url.into(),
            http_status: Some(status),
            final_url,
            failure_kind: FailureKind::None,
            elapsed,
            detail: None,
        }
    }

    pub fn failure(target_url: impl Into<String>, kind: FailureKind, detail: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            target_url: target_url.into(),
            http_status: None,
            final_url: None,
            failure_kind: kind,
            elapsed,
            detail: Some(detail.into()),
        }
    }
}

/// Anything that can check a URL. The orchestrator is generic over this so a
/// run can be driven without a network.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// reqwest-backed prober
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
    retry: RetryPolicy,
}

impl HttpProber {
    pub fn new(config: &CheckerConfig) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(config.probe_timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            retry: config.retry,
        })
    }

    async fn probe_once(&self, url: &str) -> ProbeOutcome {
        let started = Instant::now();

        let result = match self.client.head(url).send().await {
            Ok(response) if HEAD_REJECTED.contains(&response.status()) => {
                debug!(url, status = response.status().as_u16(), "HEAD rejected, retrying with GET");
                // The body is never read; dropping the response closes it
                self.client.get(url).send().await
            }
            other => other,
        };

        match result {
            Ok(response) => analyze_response(url, &response, started.elapsed()),
            Err(e) => categorize_error(url, &e, started.elapsed()),
        }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let mut attempt = 1;
        loop {
            let outcome = self.probe_once(url).await;
            if !outcome.failure_kind.is_failure() {
                return outcome;
            }
            match self.retry.delay_after(attempt) {
                Some(delay) => {
                    debug!(url, attempt, kind = ?outcome.failure_kind, "probe failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => return outcome,
            }
        }
    }
}

// Records the status and, when redirects moved us, the final URL
fn analyze_response(url: &str, response: &Response, elapsed: Duration) -> ProbeOutcome {
    let final_url = response.url().as_str();
    let final_url = if same_location(url, final_url) {
        None
    } else {
        Some(final_url.to_string())
    };

    ProbeOutcome::response(url, response.status().as_u16(), final_url, elapsed)
}

/// Two URLs name the same location when they differ at most by a trailing slash
pub fn same_location(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

// Maps a reqwest error to a failure kind
fn categorize_error(url: &str, error: &reqwest::Error, elapsed: Duration) -> ProbeOutcome {
    let chain = error_chain_text(error);

    let kind = if error.is_timeout() {
        FailureKind::Timeout
    } else if error.is_redirect() {
        // Hop limit hit or a redirect loop
        FailureKind::OtherTransport
    } else {
        categorize_text(&chain)
    };

    ProbeOutcome::failure(url, kind, chain, elapsed)
}

/// Classifies a lower-cased error description into DNS, TLS or other.
///
/// reqwest wraps hyper, which wraps the resolver and rustls, so the only
/// portable signal is the text of the source chain.
pub fn categorize_text(chain: &str) -> FailureKind {
    const DNS_MARKERS: [&str; 5] = [
        "dns error",
        "failed to lookup address",
        "name or service not known",
        "no such host",
        "nodename nor servname",
    ];
    const TLS_MARKERS: [&str; 5] = ["certificate", "tls", "ssl", "handshake", "invalid peer"];

    if DNS_MARKERS.iter().any(|m| chain.contains(m)) {
        FailureKind::Dns
    } else if TLS_MARKERS.iter().any(|m| chain.contains(m)) {
        FailureKind::Tls
    } else {
        FailureKind::OtherTransport
    }
}

/// Lower-cased description of what went wrong, without the request URL.
///
/// reqwest and hyper already print their inner causes inline, so a cause
/// whose text is already present is not repeated.
fn error_chain_text(error: &reqwest::Error) -> String {
    let mut text = String::new();
    let mut source = error.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !text.contains(&cause_text) {
            if !text.is_empty() {
                text.push_str(": ");
            }
            text.push_str(&cause_text);
        }
        source = cause.source();
    }

    if text.is_empty() {
        // No inner cause: fall back to reqwest's own message, minus the URL
        text = error.to_string();
        if let Some(url) = error.url() {
            text = text.replace(&format!(" for url ({})", url), "");
        }
    }
    text.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn prober(timeout: Duration) -> HttpProber {
        let config = CheckerConfig {
            probe_timeout: timeout,
            ..CheckerConfig::default()
        };
        HttpProber::new(&config).unwrap()
    }

    async fn mount(server: &MockServer, at: &str, template: ResponseTemplate) {
        Mock::given(path(at)).respond_with(template).mount(server).await;
    }

    #[tokio::test]
    async fn test_ok_status_recorded() {
        let server = MockServer::start().await;
        mount(&server, "/good", ResponseTemplate::new(200)).await;

        let url = format!("{}/good", server.uri());
        let outcome = prober(Duration::from_secs(5)).probe(&url).await;
        assert_eq!(outcome.http_status, Some(200));
        assert_eq!(outcome.final_url, None);
        assert_eq!(outcome.failure_kind, FailureKind::None);
    }

    #[tokio::test]
    async fn test_not_found_recorded() {
        let server = MockServer::start().await;
        mount(&server, "/404", ResponseTemplate::new(404)).await;

        let outcome = prober(Duration::from_secs(5))
            .probe(&format!("{}/404", server.uri()))
            .await;
        assert_eq!(outcome.http_status, Some(404));
        assert_eq!(outcome.failure_kind, FailureKind::None);
    }

    #[tokio::test]
    async fn test_head_rejected_falls_back_to_get() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/get-only"))
            .respond_with(ResponseTemplate::new(405))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/get-only"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = prober(Duration::from_secs(5))
            .probe(&format!("{}/get-only", server.uri()))
            .await;
        assert_eq!(outcome.http_status, Some(200));
    }

    #[tokio::test]
    async fn test_redirect_records_final_url() {
        let server = MockServer::start().await;
        let target = format!("{}/new", server.uri());
        mount(
            &server,
            "/old",
            ResponseTemplate::new(301).insert_header("location", target.as_str()),
        )
        .await;
        mount(&server, "/new", ResponseTemplate::new(200)).await;

        let outcome = prober(Duration::from_secs(5))
            .probe(&format!("{}/old", server.uri()))
            .await;
        assert_eq!(outcome.http_status, Some(200));
        assert_eq!(outcome.final_url.as_deref(), Some(target.as_str()));
    }

    #[tokio::test]
    async fn test_redirect_to_missing_page_keeps_final_status() {
        let server = MockServer::start().await;
        mount(
            &server,
            "/moved",
            ResponseTemplate::new(301).insert_header("location", "/gone"),
        )
        .await;
        mount(&server, "/gone", ResponseTemplate::new(404)).await;

        let outcome = prober(Duration::from_secs(5))
            .probe(&format!("{}/moved", server.uri()))
            .await;
        assert_eq!(outcome.http_status, Some(404));
    }

    #[tokio::test]
    async fn test_redirect_loop_is_transport_failure() {
        let server = MockServer::start().await;
        mount(
            &server,
            "/loop",
            ResponseTemplate::new(302).insert_header("location", "/loop"),
        )
        .await;

        let outcome = prober(Duration::from_secs(5))
            .probe(&format!("{}/loop", server.uri()))
            .await;
        assert_eq!(outcome.failure_kind, FailureKind::OtherTransport);
        assert_eq!(outcome.http_status, None);
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let server = MockServer::start().await;
        mount(
            &server,
            "/slow",
            ResponseTemplate::new(200).set_delay(Duration::from_secs(3)),
        )
        .await;

        let outcome = prober(Duration::from_millis(200))
            .probe(&format!("{}/slow", server.uri()))
            .await;
        assert_eq!(outcome.failure_kind, FailureKind::Timeout);
    }

    #[tokio::test]
    async fn test_connection_refused_is_other_transport() {
        // Grab a free port, then close it so nothing listens there
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let outcome = prober(Duration::from_secs(5))
            .probe(&format!("http://127.0.0.1:{}/", port))
            .await;
        assert_eq!(outcome.failure_kind, FailureKind::OtherTransport);
        assert!(outcome.detail.is_some());
    }

    #[tokio::test]
    async fn test_url_text_does_not_decide_failure_kind() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let outcome = prober(Duration::from_secs(5))
            .probe(&format!("http://127.0.0.1:{}/tls-ssl-certificate-handshake-dns-error", port))
            .await;
        assert_eq!(outcome.failure_kind, FailureKind::OtherTransport);

        let detail = outcome.detail.unwrap();
        assert!(!detail.contains("handshake"), "detail leaked the URL: {}", detail);
        assert_eq!(
            detail.matches("connection refused").count(),
            1,
            "cause repeated in detail: {}",
            detail
        );
    }

    #[tokio::test]
    async fn test_retry_policy_retries_transport_failures() {
        let server = MockServer::start().await;
        Mock::given(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .expect(2)
            .mount(&server)
            .await;

        let config = CheckerConfig {
            probe_timeout: Duration::from_millis(100),
            retry: RetryPolicy {
                max_attempts: 2,
                backoff: Duration::from_millis(10),
            },
            ..CheckerConfig::default()
        };
        let outcome = HttpProber::new(&config)
            .unwrap()
            .probe(&format!("{}/slow", server.uri()))
            .await;
        assert_eq!(outcome.failure_kind, FailureKind::Timeout);
    }

    #[test]
    fn test_categorize_text() {
        assert_eq!(
            categorize_text("error sending request: dns error: failed to lookup address information"),
            FailureKind::Dns
        );
        assert_eq!(
            categorize_text("error trying to connect: invalid peer certificate: unknownissuer"),
            FailureKind::Tls
        );
        assert_eq!(
            categorize_text("error trying to connect: tcp connect error: connection refused"),
            FailureKind::OtherTransport
        );
    }

    #[test]
    fn test_same_location_ignores_trailing_slash() {
        assert!(same_location("https://a.example/x", "https://a.example/x/"));
        assert!(!same_location("http://a.example/", "https://a.example/"));
    }
}
