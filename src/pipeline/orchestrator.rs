// src/pipeline/orchestrator.rs
use std::fmt;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use crate::config::PipelineConfig;
use crate::download::DocumentFetcher;
use crate::pipeline::validator::{ValidationOutcome, Validator};
use crate::roster::{Roster, TickerRecord};
use crate::search::{transcript_query, SearchProvider, SearchResponse, SearchResult};
use crate::storage::StorageManager;
use crate::utils::error::DownloadError;

/// Result of one (ticker, year) pair.
#[derive(Debug, Clone, PartialEq)]
pub enum PairOutcome {
    /// First file validated and renamed within the timeout.
    Validated(PathBuf),
    /// The search returned no organic results.
    NoResults,
    /// Every PDF link was tried and none validated.
    Exhausted,
    /// Nothing validated before the deadline; the worker was left running.
    TimedOut,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunSummary {
    pub validated: usize,
    pub no_results: usize,
    pub exhausted: usize,
    pub timed_out: usize,
    /// Workers that panicked or were cancelled.
    pub failed_workers: usize,
    pub abandoned_workers: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &PairOutcome) {
        match outcome {
            PairOutcome::Validated(_) => self.validated += 1,
            PairOutcome::NoResults => self.no_results += 1,
            PairOutcome::Exhausted => self.exhausted += 1,
            PairOutcome::TimedOut => self.timed_out += 1,
        }
    }

    pub fn pairs(&self) -> usize {
        self.validated + self.no_results + self.exhausted + self.timed_out
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pairs: {}, validated: {}, no results: {}, exhausted: {}, timed out: {}, failed workers: {}, abandoned workers: {}",
            self.pairs(), self.validated, self.no_results, self.exhausted, self.timed_out,
            self.failed_workers, self.abandoned_workers
        )
    }
}

/// Downloads and validates the PDF results of one pair, in rank order.
struct Worker {
    fetcher: Arc<dyn DocumentFetcher>,
    validator: Arc<Validator>,
    storage: Arc<StorageManager>,
    stop_on_first_match: bool,
}

impl Worker {
    /// `done` is sent at most once, on the first successful rename.
    async fn process_results(
        self: Arc<Self>,
        record: TickerRecord,
        year: u16,
        results: Vec<(usize, SearchResult)>,
        done: oneshot::Sender<PathBuf>,
    ) {
        let mut done = Some(done);

        for (rank, result) in results {
            let temp_path = self.storage.temp_path(&record, year, rank);
            tracing::info!("Downloading result #{} for {} {}: {}", rank, record.company_name, year, result.link);

            match self.fetcher.fetch(&result.link, &temp_path).await {
                Ok(_) => {}
                Err(DownloadError::Tls(e)) => {
                    tracing::warn!("SSL error occurred while downloading {}: {}", result.link, e);
                    continue;
                }
                Err(e) => {
                    tracing::error!("Error occurred while downloading {}: {}", result.link, e);
                    continue;
                }
            }

            let outcome = self.validator
                .validate_and_rename(&temp_path, &record, Some(&result.link))
                .await;

            if let ValidationOutcome::Renamed(path) = outcome {
                if let Some(signal) = done.take() {
                    // The receiver is gone if the pair already timed out.
                    let _ = signal.send(path);
                }
                if self.stop_on_first_match {
                    tracing::debug!("Stopping after first match for {} {}", record.company_name, year);
                    break;
                }
            }
        }
    }
}

/// Walks every (ticker, year) pair: search, then a bounded wait on a worker.
pub struct Orchestrator {
    search: Arc<dyn SearchProvider>,
    worker: Arc<Worker>,
    pair_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn DocumentFetcher>,
        validator: Arc<Validator>,
        storage: Arc<StorageManager>,
        config: &PipelineConfig,
    ) -> Self {
        let worker = Arc::new(Worker {
            fetcher,
            validator,
            storage,
            stop_on_first_match: config.stop_on_first_match,
        });
        Self {
            search,
            worker,
            pair_timeout: config.pair_timeout,
        }
    }

    pub async fn run(&self, roster: &Roster, years: RangeInclusive<u16>) -> RunSummary {
        let mut summary = RunSummary::default();
        let mut running: Vec<JoinHandle<()>> = Vec::new();

        for record in roster.records() {
            for year in years.clone() {
                let outcome = self.process_pair(record, year, &mut running).await;
                tracing::info!("{} ({}) {}: {:?}", record.company_name, record.ticker, year, outcome);
                summary.record(&outcome);
                summary.failed_workers += reap_finished(&mut running).await;
            }
        }

        let (failed, abandoned) = self.drain(running).await;
        summary.failed_workers += failed;
        summary.abandoned_workers = abandoned;
        summary
    }

    /// Gives workers that outlived their pair one more timeout period to finish.
    /// Returns `(failed, abandoned)`.
    async fn drain(&self, running: Vec<JoinHandle<()>>) -> (usize, usize) {
        if running.is_empty() {
            return (0, 0);
        }
        tracing::info!("Waiting up to {:?} for {} workers still running", self.pair_timeout, running.len());

        let deadline = tokio::time::Instant::now() + self.pair_timeout;
        let mut failed = 0;
        let mut abandoned = 0;
        for handle in running {
            match tokio::time::timeout_at(deadline, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::error!("Worker task failed: {}", e);
                    failed += 1;
                }
                Err(_) => abandoned += 1,
            }
        }
        if abandoned > 0 {
            tracing::warn!("Abandoned {} workers that were still running", abandoned);
        }
        (failed, abandoned)
    }

    pub async fn process_pair(&self, record: &TickerRecord, year: u16, running: &mut Vec<JoinHandle<()>>) -> PairOutcome {
        let query = transcript_query(&record.company_name, year);
        let response = match self.search.search(&query).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Error during search for {} in {}: {}", record.company_name, year, e);
                SearchResponse::default()
            }
        };

        if response.organic.is_empty() {
            tracing::info!("No results found for {} ({}) in {}", record.company_name, record.ticker, year);
            return PairOutcome::NoResults;
        }

        let results: Vec<(usize, SearchResult)> = response
            .pdf_results()
            .into_iter()
            .map(|(rank, result)| (rank, result.clone()))
            .collect();
        if results.is_empty() {
            tracing::info!("No PDF links among {} results for {} in {}", response.organic.len(), record.company_name, year);
            return PairOutcome::Exhausted;
        }

        let (done_tx, done_rx) = oneshot::channel();
        let worker = Arc::clone(&self.worker);
        running.push(tokio::spawn(worker.process_results(record.clone(), year, results, done_tx)));

        match tokio::time::timeout(self.pair_timeout, done_rx).await {
            Ok(Ok(path)) => PairOutcome::Validated(path),
            // Worker finished without ever signalling
            Ok(Err(_)) => {
                tracing::info!("No valid transcript for {} ({}) in {}", record.company_name, record.ticker, year);
                PairOutcome::Exhausted
            }
            Err(_) => {
                tracing::warn!(
                    "No downloads for {} {} ({}) in {:?}. Moving on.",
                    year, record.company_name, record.ticker, self.pair_timeout
                );
                PairOutcome::TimedOut
            }
        }
    }
}

/// Collects workers that have already finished, logging any that panicked.
/// Returns how many failed.
async fn reap_finished(running: &mut Vec<JoinHandle<()>>) -> usize {
    let (finished, still_running): (Vec<_>, Vec<_>) =
        std::mem::take(running).into_iter().partition(|handle| handle.is_finished());
    *running = still_running;

    let mut failed = 0;
    for handle in finished {
        if let Err(e) = handle.await {
            tracing::error!("Worker task failed: {}", e);
            failed += 1;
        }
    }
    failed
}
