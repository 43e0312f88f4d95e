//! Buffered, single-flush export of accepted ads.

pub mod bigquery;
pub mod ndjson;

pub use bigquery::BigQuerySink;
pub use ndjson::NdjsonSink;

use crate::error::Result;
use crate::metrics::ExportMetrics;
use crate::types::NormalizedAd;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    String,
    Date,
    Timestamp,
    Float,
    Int64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaField {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub table_id: String,
    pub fields: Vec<SchemaField>,
}

/// Destination table layout for [`ExportRow`].
pub fn ads_schema(table_id: &str) -> TableSchema {
    let field = |name, field_type, nullable| SchemaField {
        name,
        field_type,
        nullable,
    };
    TableSchema {
        table_id: table_id.to_string(),
        fields: vec![
            field("ad_id", FieldType::String, false),
            field("scraped_date", FieldType::Date, false),
            field("scraped_timestamp", FieldType::Timestamp, false),
            field("published", FieldType::Timestamp, true),
            field("category", FieldType::String, false),
            field("label", FieldType::String, false),
            field("title", FieldType::String, false),
            field("price", FieldType::Float, false),
            field("status", FieldType::Int64, false),
            field("city", FieldType::String, false),
            field("district", FieldType::String, true),
            field("url", FieldType::String, false),
        ],
    }
}

/// One row of the destination table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub ad_id: String,
    pub scraped_date: NaiveDate,
    pub scraped_timestamp: DateTime<Utc>,
    pub published: Option<DateTime<Utc>>,
    pub category: String,
    pub label: String,
    pub title: String,
    pub price: f64,
    pub status: u8,
    pub city: String,
    pub district: Option<String>,
    pub url: String,
}

impl From<&NormalizedAd> for ExportRow {
    fn from(ad: &NormalizedAd) -> Self {
        Self {
            ad_id: ad.ad_id.clone(),
            scraped_date: ad.scraped_date,
            scraped_timestamp: ad.scraped_timestamp,
            published: ad.published,
            category: ad.category.clone(),
            label: ad.label.clone(),
            title: ad.title.clone(),
            price: ad.price,
            status: ad.status.code(),
            city: ad.city.clone(),
            district: ad.district.clone(),
            url: ad.url.clone(),
        }
    }
}

/// A row the sink refused, by position in the submitted batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub index: usize,
    pub message: String,
}

/// Analytical destination for exported rows
#[async_trait]
pub trait Sink: Send + Sync {
    /// Creates the table when absent; must be a no-op for an existing table.
    async fn ensure_table(&self, schema: &TableSchema) -> Result<()>;

    /// Inserts all rows in one request and returns the rows that were rejected.
    async fn insert_batch(&self, rows: &[ExportRow]) -> Result<Vec<RowError>>;
}

/// Run-wide, append-only buffer shared by all crawl units
#[derive(Debug, Clone, Default)]
pub struct ExportBuffer {
    ads: Arc<Mutex<Vec<NormalizedAd>>>,
}

impl ExportBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn extend(&self, ads: Vec<NormalizedAd>) {
        if ads.is_empty() {
            return;
        }
        self.ads.lock().await.extend(ads);
    }

    pub async fn len(&self) -> usize {
        self.ads.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.ads.lock().await.is_empty()
    }

    async fn take(&self) -> Vec<NormalizedAd> {
        std::mem::take(&mut *self.ads.lock().await)
    }
}

/// What happened to the buffered rows at the end of the run
#[derive(Debug, Default)]
pub struct ExportReport {
    /// Nothing was buffered, so no insert was attempted
    pub skipped: bool,
    pub submitted: usize,
    pub row_errors: Vec<RowError>,
    /// The whole insert request failed
    pub failure: Option<String>,
}

impl ExportReport {
    pub fn log(&self) {
        if self.skipped {
            info!("Export skipped: nothing was buffered");
            return;
        }
        info!(
            "Export: {} rows submitted, {} row errors{}",
            self.submitted,
            self.row_errors.len(),
            if self.failure.is_some() { ", batch failed" } else { "" }
        );
    }
}

pub struct ExportPipeline {
    sink: Arc<dyn Sink>,
    buffer: ExportBuffer,
}

impl ExportPipeline {
    /// Ensures the destination table exists before any crawling starts.
    pub async fn open(sink: Arc<dyn Sink>, schema: &TableSchema) -> Result<Self> {
        sink.ensure_table(schema).await?;
        info!("Destination table {} is ready", schema.table_id);
        Ok(Self {
            sink,
            buffer: ExportBuffer::new(),
        })
    }

    pub fn buffer(&self) -> ExportBuffer {
        self.buffer.clone()
    }

    /// Submits everything buffered as one batch. Failures are reported, never returned.
    #[instrument(skip(self))]
    pub async fn flush(self) -> ExportReport {
        let ads = self.buffer.take().await;
        if ads.is_empty() {
            warn!("No ads to export");
            return ExportReport {
                skipped: true,
                ..ExportReport::default()
            };
        }

        let rows: Vec<ExportRow> = ads.iter().map(ExportRow::from).collect();
        info!("Exporting {} rows", rows.len());

        let mut report = ExportReport {
            submitted: rows.len(),
            ..ExportReport::default()
        };
        match self.sink.insert_batch(&rows).await {
            Ok(row_errors) => {
                for row_error in &row_errors {
                    error!(
                        index = row_error.index,
                        ad_id = rows.get(row_error.index).map(|r| r.ad_id.as_str()).unwrap_or(""),
                        "Row rejected: {}",
                        row_error.message
                    );
                }
                ExportMetrics::record_flush(rows.len(), row_errors.len());
                report.row_errors = row_errors;
            }
            Err(e) => {
                error!("Batch insert failed: {}", e);
                ExportMetrics::record_flush_failure();
                report.failure = Some(e.to_string());
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::finalize;
    use crate::types::{AdDraft, AdStatus, CaptureTime};
    use chrono::TimeZone;

    #[test]
    fn row_timestamps_serialize_as_utc() {
        let ad = finalize(AdDraft {
            title: "Kemet".to_string(),
            price: 150.0,
            status: AdStatus::New,
            city: "Łódź".to_string(),
            district: None,
            published: Some(Utc.with_ymd_and_hms(2024, 7, 1, 22, 20, 0).unwrap()),
            url: "https://www.olx.pl/d/oferta/kemet-ID11.html".to_string(),
            label: "kemet".to_string(),
            category: "board_games".to_string(),
            captured: CaptureTime::at(Utc.with_ymd_and_hms(2024, 7, 1, 22, 30, 0).unwrap()),
        });

        let row = serde_json::to_value(ExportRow::from(&ad)).unwrap();
        assert_eq!(row["published"], "2024-07-01T22:20:00Z");
        assert_eq!(row["scraped_timestamp"], "2024-07-01T22:30:00Z");
        assert_eq!(row["scraped_date"], "2024-07-02");
    }

    #[test]
    fn schema_lists_every_row_column() {
        let schema = ads_schema("olx_ads");
        let names: Vec<_> = schema.fields.iter().map(|f| f.name).collect();
        assert_eq!(
            names,
            vec![
                "ad_id",
                "scraped_date",
                "scraped_timestamp",
                "published",
                "category",
                "label",
                "title",
                "price",
                "status",
                "city",
                "district",
                "url"
            ]
        );
        let nullable: Vec<_> = schema
            .fields
            .iter()
            .filter(|f| f.nullable)
            .map(|f| f.name)
            .collect();
        assert_eq!(nullable, vec!["published", "district"]);
    }
}
