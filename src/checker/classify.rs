// src/checker/classify.rs
// =============================================================================
// Classifier: turns a raw ProbeOutcome into one of five stable categories.
//
// Pure and total. A redirect is only reported when it ends somewhere healthy;
// a redirect chain that lands on a 404 is Broken, judged by the final status.
// =============================================================================

use serde::Serialize;
use std::fmt;

use super::probe::{same_location, FailureKind, ProbeOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Ok,
    Redirect,
    Broken,
    Timeout,
    Error,
}

impl Classification {
    pub const ALL: [Classification; 5] = [
        Classification::Ok,
        Classification::Redirect,
        Classification::Broken,
        Classification::Timeout,
        Classification::Error,
    ];

    /// Ok and Redirect are healthy, everything else needs attention
    pub fn is_problem(self) -> bool {
        !matches!(self, Classification::Ok | Classification::Redirect)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Ok => "OK",
            Classification::Redirect => "REDIRECT",
            Classification::Broken => "BROKEN",
            Classification::Timeout => "TIMEOUT",
            Classification::Error => "ERROR",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn classify(outcome: &ProbeOutcome) -> Classification {
    match outcome.failure_kind {
        FailureKind::Timeout => return Classification::Timeout,
        FailureKind::Dns | FailureKind::Tls | FailureKind::OtherTransport => {
            return Classification::Error
        }
        FailureKind::None => {}
    }

    let redirected = outcome
        .final_url
        .as_deref()
        .is_some_and(|final_url| !same_location(&outcome.target_url, final_url));

    match outcome.http_status {
        Some(400..) => Classification::Broken,
        Some(200..=399) if redirected => Classification::Redirect,
        Some(200..=299) => Classification::Ok,
        // 3xx that was never followed (hop limit, redirects disabled)
        Some(300..=399) => Classification::Redirect,
        // 1xx as a final answer, or no status and no failure
        Some(_) | None => Classification::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const URL: &str = "https://good.example/";

    fn status(code: u16, final_url: Option<&str>) -> ProbeOutcome {
        ProbeOutcome::response(URL, code, final_url.map(str::to_string), Duration::from_millis(5))
    }

    fn failed(kind: FailureKind) -> ProbeOutcome {
        ProbeOutcome::failure(URL, kind, "boom", Duration::from_millis(5))
    }

    #[test]
    fn test_ok() {
        assert_eq!(classify(&status(200, None)), Classification::Ok);
        assert_eq!(classify(&status(204, None)), Classification::Ok);
    }

    #[test]
    fn test_broken() {
        assert_eq!(classify(&status(404, None)), Classification::Broken);
        assert_eq!(classify(&status(500, None)), Classification::Broken);
    }

    #[test]
    fn test_redirect_to_healthy_page() {
        let outcome = status(200, Some("https://good.example/new"));
        assert_eq!(classify(&outcome), Classification::Redirect);
    }

    #[test]
    fn test_redirect_to_error_is_broken() {
        let outcome = status(404, Some("https://good.example/gone"));
        assert_eq!(classify(&outcome), Classification::Broken);
    }

    #[test]
    fn test_trailing_slash_only_is_not_a_redirect() {
        let outcome = status(200, Some("https://good.example"));
        assert_eq!(classify(&outcome), Classification::Ok);
    }

    #[test]
    fn test_unfollowed_3xx_is_redirect() {
        assert_eq!(classify(&status(301, None)), Classification::Redirect);
    }

    #[test]
    fn test_failures() {
        assert_eq!(classify(&failed(FailureKind::Timeout)), Classification::Timeout);
        assert_eq!(classify(&failed(FailureKind::Dns)), Classification::Error);
        assert_eq!(classify(&failed(FailureKind::Tls)), Classification::Error);
        assert_eq!(classify(&failed(FailureKind::OtherTransport)), Classification::Error);
    }

    #[test]
    fn test_total_over_odd_outcomes() {
        assert_eq!(classify(&status(101, None)), Classification::Error);
        let mut empty = status(200, None);
        empty.http_status = None;
        assert_eq!(classify(&empty), Classification::Error);
    }

    #[test]
    fn test_every_status_classifies_and_is_stable() {
        for code in 100..=599u16 {
            for final_url in [None, Some("https://elsewhere.example/")] {
                let outcome = status(code, final_url);
                let first = classify(&outcome);
                assert!(Classification::ALL.contains(&first));
                assert_eq!(classify(&outcome), first);
            }
        }
    }
}
