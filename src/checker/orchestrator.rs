// src/checker/orchestrator.rs
// =============================================================================
// Checker Orchestrator: drives one run from seed pages to a ReportModel.
//
// Run phases:
//   Idle -> Extracting -> Probing -> Aggregating -> Done
//
// 1. Extracting: fetch every seed page (a few at a time); a seed that cannot
//    be fetched before the run deadline is recorded as unreachable and the
//    run carries on
// 2. Probing: collapse all links to the set of unique target URLs, queue
//    them, and let a fixed pool of worker tasks probe them; results come
//    back over a channel into a map owned by this run
// 3. Aggregating: join links back to outcomes, classify, group and sort
//
// run() has no error path: whatever happens, a report comes out.
// =============================================================================

use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use super::classify::classify;
use super::extract::{extract, page_client};
use super::probe::{FailureKind, HttpProber, ProbeOutcome, Prober};
use crate::config::{CheckerConfig, ConfigError, SeedPage};
use crate::report::{ReportModel, SeedExtraction};

/// Phase of a run, reported through the phase callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Idle,
    Extracting,
    Probing,
    Aggregating,
    Done,
}

pub type PhaseCallback = Arc<dyn Fn(RunPhase) + Send + Sync>;

/// Setting up a checker can fail; running one cannot.
#[derive(Error, Debug)]
pub enum CheckerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("could not build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

pub struct Checker<P = HttpProber> {
    config: CheckerConfig,
    prober: Arc<P>,
    page_client: Client,
    phase_callback: Option<PhaseCallback>,
}

impl Checker<HttpProber> {
    /// Checker that probes over HTTP with the configured limits
    pub fn new(config: CheckerConfig) -> Result<Self, CheckerError> {
        let prober = HttpProber::new(&config)?;
        Self::with_prober(config, prober)
    }
}

impl<P: Prober + 'static> Checker<P> {
    pub fn with_prober(config: CheckerConfig, prober: P) -> Result<Self, CheckerError> {
        config.validate()?;
        let page_client = page_client(config.page_timeout, &config.user_agent)?;

        Ok(Self {
            config,
            prober: Arc::new(prober),
            page_client,
            phase_callback: None,
        })
    }

    pub fn with_phase_callback(mut self, callback: PhaseCallback) -> Self {
        self.phase_callback = Some(callback);
        self
    }

    fn enter(&self, phase: RunPhase) {
        debug!(?phase, "run phase");
        if let Some(callback) = &self.phase_callback {
            callback(phase);
        }
    }

    /// Checks every outbound link on the given seed pages.
    pub async fn run(&self, seeds: &[SeedPage]) -> ReportModel {
        let started = Instant::now();
        // A limit too large to represent is no limit at all
        let deadline = self.config.deadline.and_then(|limit| started.checked_add(limit));

        self.enter(RunPhase::Extracting);
        let extractions = self.extract_all(seeds, deadline).await;

        // Dedup before dispatch: each unique URL is probed exactly once
        let unique: BTreeSet<String> = extractions
            .iter()
            .filter_map(|extraction| extraction.outcome.as_ref().ok())
            .flat_map(|page| page.links.iter().map(|link| link.target_url.clone()))
            .collect();

        self.enter(RunPhase::Probing);
        info!(
            unique_urls = unique.len(),
            workers = self.config.concurrency,
            "probing links"
        );
        let outcomes = self.probe_all(unique.into_iter().collect(), started, deadline).await;

        self.enter(RunPhase::Aggregating);
        let report = ReportModel::assemble(extractions, &outcomes);

        self.enter(RunPhase::Done);
        info!(
            total = report.summary.total,
            problems = report.summary.problems(),
            unreachable_seeds = report.summary.unreachable_seeds,
            "run complete"
        );
        report
    }

    async fn extract_all(&self, seeds: &[SeedPage], deadline: Option<Instant>) -> Vec<SeedExtraction> {
        let client = &self.page_client;
        let global_skips = &self.config.skip_domains;

        // buffered() keeps seed order
        stream::iter(seeds.iter().cloned())
            .map(|seed| async move {
                let fetched = match deadline {
                    Some(at) => timeout_at(at, extract(client, &seed, global_skips))
                        .await
                        .map_err(|_| "run deadline exceeded before the seed page was fetched".to_string()),
                    None => Ok(extract(client, &seed, global_skips).await),
                };
                let outcome = match fetched {
                    Ok(Ok(page)) => Ok(page),
                    Ok(Err(e)) => {
                        warn!(seed = %seed.label, error = %e, "seed page unreachable, skipping");
                        Err(e.to_string())
                    }
                    Err(reason) => {
                        warn!(seed = %seed.label, "run deadline reached while fetching seed page, skipping");
                        Err(reason)
                    }
                };
                SeedExtraction { seed, outcome }
            })
            .buffered(self.config.page_concurrency)
            .collect()
            .await
    }

    /// Probes each URL once over a bounded worker pool.
    ///
    /// Always returns exactly one outcome per input URL: if the run deadline
    /// passes first, the workers are aborted and every URL still pending is
    /// recorded as a timeout.
    async fn probe_all(
        &self,
        urls: Vec<String>,
        started: Instant,
        deadline: Option<Instant>,
    ) -> HashMap<String, ProbeOutcome> {
        let mut outcomes = HashMap::with_capacity(urls.len());
        if urls.is_empty() {
            return outcomes;
        }

        if deadline.is_some_and(|at| at <= Instant::now()) {
            warn!(pending = urls.len(), "run deadline reached before probing started");
            Self::fill_timeouts(&mut outcomes, urls, started);
            return outcomes;
        }

        // Task queue in: filled up front, then closed
        let (task_tx, task_rx) = mpsc::unbounded_channel::<String>();
        for url in &urls {
            // The receiver is alive until the workers finish
            let _ = task_tx.send(url.clone());
        }
        drop(task_tx);
        let task_rx = Arc::new(Mutex::new(task_rx));

        // Results out
        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<(String, ProbeOutcome)>();

        let mut workers = JoinSet::new();
        for worker_id in 0..self.config.concurrency.min(urls.len()) {
            let tasks = task_rx.clone();
            let results = result_tx.clone();
            let prober = self.prober.clone();

            workers.spawn(async move {
                loop {
                    let next = tasks.lock().await.recv().await;
                    let Some(url) = next else { break };

                    let outcome = prober.probe(&url).await;
                    debug!(
                        worker_id,
                        url = %url,
                        classification = %classify(&outcome),
                        elapsed_ms = outcome.elapsed.as_millis() as u64,
                        "probed"
                    );
                    if results.send((url, outcome)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        loop {
            let received = match deadline {
                Some(at) => match timeout_at(at, result_rx.recv()).await {
                    Ok(received) => received,
                    Err(_) => {
                        warn!(
                            pending = urls.len() - outcomes.len(),
                            "run deadline reached, abandoning in-flight probes"
                        );
                        break;
                    }
                },
                None => result_rx.recv().await,
            };

            match received {
                Some((url, outcome)) => {
                    outcomes.insert(url, outcome);
                }
                // Every worker has finished
                None => break,
            }
        }

        workers.abort_all();
        Self::fill_timeouts(&mut outcomes, urls, started);
        outcomes
    }

    // Every URL without an outcome gets a Timeout covering the run so far
    fn fill_timeouts(outcomes: &mut HashMap<String, ProbeOutcome>, urls: Vec<String>, started: Instant) {
        let waited = started.elapsed();
        for url in urls {
            outcomes.entry(url).or_insert_with_key(|url| {
                ProbeOutcome::failure(
                    url.clone(),
                    FailureKind::Timeout,
                    "run deadline exceeded before the probe finished",
                    waited,
                )
            });
        }
    }
}
