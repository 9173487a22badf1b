// src/report/mod.rs
// =============================================================================
// The report model handed to renderers.
//
// Shape:
//   ReportModel
//     seeds: [SeedReport]          (input order)
//       entries: [ReportEntry]     (sorted by target URL)
//     summary: Summary             (counts per classification)
//
// Submodules:
// - render: terminal table, JSON and standalone HTML output
// =============================================================================

mod render;

pub use render::{print_table, render_html, to_json};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::checker::{classify, Classification, FailureKind, LinkReference, PageLinks, ProbeOutcome};
use crate::config::SeedPage;

/// One (seed page, target URL) pair with its probe result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub target_url: String,
    pub source_label: String,
    pub source_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_text: Option<String>,
    pub classification: Classification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub elapsed_ms: u64,
}

impl ReportEntry {
    pub fn new(link: LinkReference, outcome: &ProbeOutcome) -> Self {
        Self {
            target_url: link.target_url,
            source_label: link.source_label,
            source_url: link.source_url,
            anchor_text: link.anchor_text,
            classification: classify(outcome),
            http_status: outcome.http_status,
            final_url: outcome.final_url.clone(),
            failure_kind: outcome
                .failure_kind
                .is_failure()
                .then_some(outcome.failure_kind),
            detail: outcome.detail.clone(),
            elapsed_ms: outcome.elapsed.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SeedStatus {
    Reachable,
    Unreachable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeedReport {
    pub label: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_title: Option<String>,
    pub status: SeedStatus,
    pub entries: Vec<ReportEntry>,
}

impl SeedReport {
    pub fn is_reachable(&self) -> bool {
        self.status == SeedStatus::Reachable
    }

    pub fn count(&self, classification: Classification) -> usize {
        self.entries
            .iter()
            .filter(|e| e.classification == classification)
            .count()
    }

    pub fn problem_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.classification.is_problem())
            .count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub ok: usize,
    pub redirect: usize,
    pub broken: usize,
    pub timeout: usize,
    pub error: usize,
    /// Distinct URLs actually probed
    pub unique_urls: usize,
    pub unreachable_seeds: usize,
}

impl Summary {
    fn tally(seeds: &[SeedReport], unique_urls: usize) -> Self {
        let mut summary = Summary {
            unique_urls,
            ..Summary::default()
        };

        for seed in seeds {
            if !seed.is_reachable() {
                summary.unreachable_seeds += 1;
            }
            for entry in &seed.entries {
                summary.total += 1;
                match entry.classification {
                    Classification::Ok => summary.ok += 1,
                    Classification::Redirect => summary.redirect += 1,
                    Classification::Broken => summary.broken += 1,
                    Classification::Timeout => summary.timeout += 1,
                    Classification::Error => summary.error += 1,
                }
            }
        }

        summary
    }

    pub fn problems(&self) -> usize {
        self.broken + self.timeout + self.error
    }
}

/// What the extractor produced for one seed, successful or not.
#[derive(Debug)]
pub struct SeedExtraction {
    pub seed: SeedPage,
    pub outcome: Result<PageLinks, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportModel {
    pub generated_at: DateTime<Utc>,
    pub seeds: Vec<SeedReport>,
    pub summary: Summary,
}

impl ReportModel {
    /// Joins every link back to its probe outcome and groups by seed.
    ///
    /// Every link is expected to have an outcome; a missing one is reported
    /// as an Error entry so nothing unclassified reaches the report.
    pub fn assemble(extractions: Vec<SeedExtraction>, outcomes: &HashMap<String, ProbeOutcome>) -> Self {
        let seeds: Vec<SeedReport> = extractions
            .into_iter()
            .map(|extraction| {
                let SeedExtraction { seed, outcome } = extraction;
                match outcome {
                    Ok(PageLinks { title: page_title, links }) => {
                        let mut entries: Vec<ReportEntry> = links
                            .into_iter()
                            .map(|link| match outcomes.get(&link.target_url) {
                                Some(outcome) => ReportEntry::new(link, outcome),
                                None => {
                                    let missing = ProbeOutcome::failure(
                                        link.target_url.clone(),
                                        FailureKind::OtherTransport,
                                        "no probe outcome recorded",
                                        std::time::Duration::ZERO,
                                    );
                                    ReportEntry::new(link, &missing)
                                }
                            })
                            .collect();
                        entries.sort_by(|a, b| a.target_url.cmp(&b.target_url));

                        SeedReport {
                            label: seed.label,
                            url: seed.url,
                            page_title,
                            status: SeedStatus::Reachable,
                            entries,
                        }
                    }
                    Err(reason) => SeedReport {
                        label: seed.label,
                        url: seed.url,
                        page_title: None,
                        status: SeedStatus::Unreachable { reason },
                        entries: Vec::new(),
                    },
                }
            })
            .collect();

        let summary = Summary::tally(&seeds, outcomes.len());
        Self {
            generated_at: Utc::now(),
            seeds,
            summary,
        }
    }

    /// Broken/timed-out/erroring links or unreachable seeds
    pub fn has_problems(&self) -> bool {
        self.summary.problems() > 0 || self.summary.unreachable_seeds > 0
    }

    /// Some seeds failed but not all of them
    pub fn is_partial(&self) -> bool {
        self.summary.unreachable_seeds > 0 && self.summary.unreachable_seeds < self.seeds.len()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ReportEntry> {
        self.seeds.iter().flat_map(|seed| seed.entries.iter())
    }
}
