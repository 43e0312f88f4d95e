#![allow(dead_code)]

use async_trait::async_trait;
use olx_scraper::error::{Result, ScraperError};
use olx_scraper::export::{ExportRow, RowError, Sink, TableSchema};
use olx_scraper::page::Page;
use olx_scraper::transport::Transport;
use olx_scraper::types::RawListing;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

pub fn listing(title: &str, href: &str) -> RawListing {
    RawListing {
        location_date: vec![
            "Wrocław, Krzyki".to_string(),
            "-".to_string(),
            "Wczoraj o 18:00".to_string(),
        ],
        title: Some(title.to_string()),
        price: Some("120 zł".to_string()),
        status: Some("Nowe".to_string()),
        href: Some(href.to_string()),
    }
}

pub fn page(url: &str, count: Option<&str>, listings: Vec<RawListing>, next: &[&str]) -> Page {
    Page {
        url: Url::parse(url).unwrap(),
        result_count: count.map(str::to_string),
        listings,
        next_links: next.iter().map(|s| s.to_string()).collect(),
    }
}

/// Serves canned pages by URL and records every request
#[derive(Default)]
pub struct FakeTransport {
    pages: HashMap<String, Page>,
    pub requests: Mutex<Vec<String>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeTransport {
    pub fn new(pages: Vec<Page>) -> Self {
        Self {
            pages: pages.into_iter().map(|p| (p.url.to_string(), p)).collect(),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn fetch(&self, url: &str) -> Result<Page> {
        self.requests.lock().unwrap().push(url.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.pages.get(url).cloned().ok_or_else(|| ScraperError::Fetch {
            url: url.to_string(),
            message: "status 503 Service Unavailable".to_string(),
        })
    }
}

/// Sink that keeps every call in memory
#[derive(Default)]
pub struct RecordingSink {
    pub ensure_calls: AtomicUsize,
    pub batches: Mutex<Vec<Vec<ExportRow>>>,
    pub reject_index: Option<usize>,
    pub fail_insert: bool,
}

impl RecordingSink {
    pub fn batches(&self) -> Vec<Vec<ExportRow>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sink for RecordingSink {
    async fn ensure_table(&self, _schema: &TableSchema) -> Result<()> {
        self.ensure_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn insert_batch(&self, rows: &[ExportRow]) -> Result<Vec<RowError>> {
        self.batches.lock().unwrap().push(rows.to_vec());
        if self.fail_insert {
            return Err(ScraperError::Sink {
                message: "insertAll returned 500".to_string(),
            });
        }
        Ok(self
            .reject_index
            .map(|index| RowError {
                index,
                message: "invalid: no such field".to_string(),
            })
            .into_iter()
            .collect())
    }
}
