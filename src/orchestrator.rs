use crate::controller::{CrawlController, CrawlReport, TerminalState};
use crate::export::ExportBuffer;
use crate::extractor::PageExtractor;
use crate::transport::Transport;
use crate::types::CrawlUnit;
use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// Aggregate outcome of one run over the whole catalog
#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<CrawlReport>,
    /// Units whose task died or was aborted without producing a report
    pub abandoned: usize,
    /// The run was interrupted before every unit finished
    pub cancelled: bool,
}

impl RunSummary {
    pub fn count(&self, terminal: TerminalState) -> usize {
        self.reports.iter().filter(|r| r.terminal == terminal).count()
    }

    pub fn accepted(&self) -> usize {
        self.reports.iter().map(|r| r.accepted).sum()
    }

    pub fn log(&self) {
        let parse_failures: usize = self.reports.iter().map(|r| r.parse_failures).sum();
        let fetch_failures = self.reports.iter().filter(|r| r.fetch_error.is_some()).count();
        info!(
            "Crawl finished: {} units ({} exhausted, {} no results, {} extended category), {} ads accepted, {} listings unparseable",
            self.reports.len(),
            self.count(TerminalState::Exhausted),
            self.count(TerminalState::NoResults),
            self.count(TerminalState::ExtendedCategoryStop),
            self.accepted(),
            parse_failures
        );
        if fetch_failures > 0 {
            warn!("{} units stopped early on a fetch error", fetch_failures);
        }
        if self.abandoned > 0 {
            warn!("{} units were abandoned", self.abandoned);
        }
        if self.cancelled {
            warn!("Run was cancelled before all units finished");
        }
    }
}

/// Runs one [`CrawlController`] per catalog unit with bounded concurrency.
pub struct Orchestrator {
    units: Vec<CrawlUnit>,
    concurrency: usize,
    transport: Arc<dyn Transport>,
    extractor: Arc<PageExtractor>,
}

impl Orchestrator {
    pub fn new(
        units: Vec<CrawlUnit>,
        concurrency: usize,
        transport: Arc<dyn Transport>,
        extractor: Arc<PageExtractor>,
    ) -> Self {
        Self {
            units,
            concurrency: concurrency.max(1),
            transport,
            extractor,
        }
    }

    /// Crawls every unit, appending accepted ads to `buffer`.
    ///
    /// When `shutdown` resolves first, unfinished units are aborted and counted as
    /// abandoned. Reports of units that already finished are kept, and whatever the
    /// aborted units buffered stays in `buffer`.
    pub async fn run<F>(&self, buffer: ExportBuffer, shutdown: F) -> RunSummary
    where
        F: Future<Output = ()>,
    {
        info!(
            "Starting {} crawl units with concurrency {}",
            self.units.len(),
            self.concurrency
        );
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        let mut pending: FuturesUnordered<_> = self
            .units
            .iter()
            .cloned()
            .map(|unit| {
                let controller = CrawlController::new(
                    unit,
                    self.transport.clone(),
                    self.extractor.clone(),
                    buffer.clone(),
                );
                let semaphore = semaphore.clone();
                tokio::spawn(async move {
                    // The semaphore is never closed, so acquiring only waits
                    let _permit = semaphore.acquire_owned().await.ok();
                    controller.run().await
                })
            })
            .collect();
        let mut summary = RunSummary::default();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                finished = pending.next() => match finished {
                    Some(Ok(report)) => summary.reports.push(report),
                    Some(Err(e)) => {
                        error!("Crawl unit failed: {}", e);
                        summary.abandoned += 1;
                    }
                    None => break,
                },
                _ = &mut shutdown => {
                    warn!(
                        "Shutdown requested, aborting {} unfinished crawl units",
                        pending.len()
                    );
                    for handle in pending.iter() {
                        handle.abort();
                    }
                    summary.abandoned += pending.len();
                    summary.cancelled = true;
                    break;
                }
            }
        }
        summary
    }
}
