use crate::export::ExportBuffer;
use crate::extractor::PageExtractor;
use crate::metrics::CrawlMetrics;
use crate::page::Page;
use crate::transport::Transport;
use crate::types::{CaptureTime, CrawlUnit, Query};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

static FIRST_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Pagination state of one crawl unit
#[derive(Debug)]
enum CrawlState {
    Start,
    Fetching(String),
    Emitting(Page),
    Done(TerminalState),
}

/// How a crawl unit ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    /// The first page reported zero results
    NoResults,
    /// A page contained an ad from a broadened search
    ExtendedCategoryStop,
    /// The result list ran out of pages, or a page could not be fetched
    Exhausted,
}

impl TerminalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminalState::NoResults => "no_results",
            TerminalState::ExtendedCategoryStop => "extended_category",
            TerminalState::Exhausted => "exhausted",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub query: Query,
    pub terminal: TerminalState,
    pub pages_fetched: usize,
    pub accepted: usize,
    pub dropped: usize,
    pub parse_failures: usize,
    /// Set when the unit ended early because a page fetch failed
    pub fetch_error: Option<String>,
}

/// True only when the result-count text holds a number and that number is zero.
pub fn reports_no_results(count_text: Option<&str>) -> bool {
    count_text
        .and_then(|text| FIRST_NUMBER.find(text))
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .map_or(false, |count| count == 0)
}

/// Drives the pagination of one (category, query) unit.
pub struct CrawlController {
    unit: CrawlUnit,
    transport: Arc<dyn Transport>,
    extractor: Arc<PageExtractor>,
    buffer: ExportBuffer,
}

impl CrawlController {
    pub fn new(
        unit: CrawlUnit,
        transport: Arc<dyn Transport>,
        extractor: Arc<PageExtractor>,
        buffer: ExportBuffer,
    ) -> Self {
        Self {
            unit,
            transport,
            extractor,
            buffer,
        }
    }

    /// Crawls pages in order until a terminal state is reached.
    #[instrument(skip(self), fields(label = %self.unit.query.label, category = %self.unit.query.category))]
    pub async fn run(self) -> CrawlReport {
        let mut report = CrawlReport {
            query: self.unit.query.clone(),
            terminal: TerminalState::Exhausted,
            pages_fetched: 0,
            accepted: 0,
            dropped: 0,
            parse_failures: 0,
            fetch_error: None,
        };
        let mut visited = HashSet::new();
        let mut state = CrawlState::Start;

        loop {
            state = match state {
                CrawlState::Start => CrawlState::Fetching(self.unit.start_url.clone()),
                CrawlState::Fetching(url) => {
                    visited.insert(url.clone());
                    match self.transport.fetch(&url).await {
                        Ok(page) => {
                            report.pages_fetched += 1;
                            if reports_no_results(page.result_count.as_deref()) {
                                info!("There are no ads for this query in the category");
                                CrawlState::Done(TerminalState::NoResults)
                            } else {
                                CrawlState::Emitting(page)
                            }
                        }
                        Err(e) => {
                            warn!("Abandoning remaining pages: {}", e);
                            report.fetch_error = Some(e.to_string());
                            CrawlState::Done(TerminalState::Exhausted)
                        }
                    }
                }
                CrawlState::Emitting(page) => self.emit(page, &mut report, &visited).await,
                CrawlState::Done(terminal) => {
                    report.terminal = terminal;
                    CrawlMetrics::record_unit_finished(terminal.as_str());
                    info!(
                        "Finished after {} pages: {} accepted, {} dropped, {} unparseable ({})",
                        report.pages_fetched,
                        report.accepted,
                        report.dropped,
                        report.parse_failures,
                        terminal.as_str()
                    );
                    return report;
                }
            };
        }
    }

    async fn emit(
        &self,
        page: Page,
        report: &mut CrawlReport,
        visited: &HashSet<String>,
    ) -> CrawlState {
        let extraction =
            self.extractor
                .extract(&page.listings, &self.unit.query, CaptureTime::now());
        debug!(
            "Page {} yielded {} of {} listings",
            page.url,
            extraction.accepted.len(),
            page.listings.len()
        );
        CrawlMetrics::record_page(
            extraction.accepted.len(),
            extraction.dropped,
            extraction.parse_failures,
        );
        report.accepted += extraction.accepted.len();
        report.dropped += extraction.dropped;
        report.parse_failures += extraction.parse_failures;
        self.buffer.extend(extraction.accepted).await;

        if extraction.extended_category_reached {
            return CrawlState::Done(TerminalState::ExtendedCategoryStop);
        }

        // Pagination controls may list several candidates; the last one is "next"
        let Some(href) = page.next_links.last() else {
            return CrawlState::Done(TerminalState::Exhausted);
        };
        match page.join(href) {
            Ok(next) if visited.contains(&next) => {
                warn!("Next page {} was already crawled, stopping", next);
                CrawlState::Done(TerminalState::Exhausted)
            }
            Ok(next) => CrawlState::Fetching(next),
            Err(e) => {
                warn!("Unusable next page link {:?}: {}", href, e);
                CrawlState::Done(TerminalState::Exhausted)
            }
        }
    }
}
