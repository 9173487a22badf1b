// src/lib.rs
// =============================================================================
// link-sentinel: crawls a fixed set of seed pages, probes every outbound link
// and builds a deterministic report of what is alive, moved or broken.
//
// Modules:
// - config: seed list and engine knobs
// - checker: extraction, probing, classification and the run orchestrator
// - report: the report model and its renderers
// =============================================================================

pub mod checker;
pub mod config;
pub mod report;
