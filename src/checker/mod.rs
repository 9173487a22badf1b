// src/checker/mod.rs
// =============================================================================
// The link-checking engine.
//
// Submodules:
// - extract: fetches a seed page and pulls out its outbound links
// - probe: checks one URL over HTTP and records the raw outcome
// - classify: maps a raw outcome to OK / Redirect / Broken / Timeout / Error
// - orchestrator: runs the whole thing with a bounded worker pool
//
// This file re-exports the public API so callers can write
// `checker::Checker` instead of `checker::orchestrator::Checker`.
// =============================================================================

mod classify;
mod extract;
mod orchestrator;
mod probe;

pub use classify::{classify, Classification};
pub use extract::{extract, extract_links, normalize_url, FetchError, HostFilter, LinkReference, PageLinks};
pub use orchestrator::{Checker, CheckerError, PhaseCallback, RunPhase};
pub use probe::{FailureKind, HttpProber, ProbeOutcome, Prober};
