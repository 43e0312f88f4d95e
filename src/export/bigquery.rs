use super::{ExportRow, RowError, Sink, TableSchema};
use crate::error::{Result, ScraperError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

const BIGQUERY_API: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// BigQuery REST sink authenticated with a pre-issued OAuth access token
pub struct BigQuerySink {
    client: reqwest::Client,
    project_id: String,
    dataset_id: String,
    table_id: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<InsertError>,
}

#[derive(Debug, Deserialize)]
struct InsertError {
    index: usize,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
}

impl BigQuerySink {
    pub fn new(
        project_id: impl Into<String>,
        dataset_id: impl Into<String>,
        table_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            project_id: project_id.into(),
            dataset_id: dataset_id.into(),
            table_id: table_id.into(),
            access_token: access_token.into(),
        }
    }

    /// Reads the access token from the environment variable `token_env`.
    pub fn from_env(project_id: &str, dataset_id: &str, table_id: &str, token_env: &str) -> Result<Self> {
        let token = std::env::var(token_env).map_err(|e| {
            ScraperError::Config(format!("BigQuery token variable {} is not usable: {}", token_env, e))
        })?;
        Ok(Self::new(project_id, dataset_id, table_id, token))
    }

    fn tables_url(&self) -> String {
        format!(
            "{}/projects/{}/datasets/{}/tables",
            BIGQUERY_API, self.project_id, self.dataset_id
        )
    }

    fn sink_error(context: &str, status: StatusCode, body: &str) -> ScraperError {
        ScraperError::Sink {
            message: format!("{} returned {}: {}", context, status, body),
        }
    }
}

#[async_trait]
impl Sink for BigQuerySink {
    async fn ensure_table(&self, schema: &TableSchema) -> Result<()> {
        let table_url = format!("{}/{}", self.tables_url(), self.table_id);
        let resp = self
            .client
            .get(&table_url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        match resp.status() {
            s if s.is_success() => {
                info!(
                    "Table {} exists in dataset {}",
                    self.table_id, self.dataset_id
                );
                return Ok(());
            }
            StatusCode::NOT_FOUND => {}
            s => {
                let body = resp.text().await.unwrap_or_default();
                return Err(Self::sink_error("tables.get", s, &body));
            }
        }

        info!(
            "Table {} not found in dataset {}, creating",
            self.table_id, self.dataset_id
        );
        let fields: Vec<_> = schema
            .fields
            .iter()
            .map(|f| {
                json!({
                    "name": f.name,
                    "type": f.field_type,
                    "mode": if f.nullable { "NULLABLE" } else { "REQUIRED" },
                })
            })
            .collect();
        let body = json!({
            "tableReference": {
                "projectId": self.project_id,
                "datasetId": self.dataset_id,
                "tableId": self.table_id,
            },
            "schema": { "fields": fields },
        });

        let resp = self
            .client
            .post(self.tables_url())
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        match resp.status() {
            s if s.is_success() => {
                info!("Table {} created", self.table_id);
                Ok(())
            }
            // Another run created it in between
            StatusCode::CONFLICT => {
                debug!("Table {} already created concurrently", self.table_id);
                Ok(())
            }
            s => {
                let body = resp.text().await.unwrap_or_default();
                Err(Self::sink_error("tables.insert", s, &body))
            }
        }
    }

    async fn insert_batch(&self, rows: &[ExportRow]) -> Result<Vec<RowError>> {
        let url = format!("{}/{}/insertAll", self.tables_url(), self.table_id);
        let body = json!({
            "rows": rows.iter().map(|row| json!({ "json": row })).collect::<Vec<_>>(),
        });

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(Self::sink_error("tabledata.insertAll", status, &text));
        }

        let parsed: InsertAllResponse = serde_json::from_str(&text)?;
        Ok(parsed
            .insert_errors
            .into_iter()
            .map(|e| RowError {
                index: e.index,
                message: e
                    .errors
                    .iter()
                    .map(|p| format!("{}: {}", p.reason, p.message))
                    .collect::<Vec<_>>()
                    .join("; "),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_insert_errors() {
        let parsed: InsertAllResponse = serde_json::from_str(
            r#"{"kind":"bigquery#tableDataInsertAllResponse","insertErrors":[
                {"index":2,"errors":[{"reason":"invalid","location":"price","message":"no such field"}]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(parsed.insert_errors.len(), 1);
        assert_eq!(parsed.insert_errors[0].index, 2);
        assert_eq!(parsed.insert_errors[0].errors[0].reason, "invalid");
    }

    #[test]
    fn clean_insert_has_no_errors() {
        let parsed: InsertAllResponse =
            serde_json::from_str(r#"{"kind":"bigquery#tableDataInsertAllResponse"}"#).unwrap();
        assert!(parsed.insert_errors.is_empty());
    }

    #[test]
    fn missing_token_variable_is_config_error() {
        let result = BigQuerySink::from_env("p", "d", "t", "OLX_SCRAPER_TEST_UNSET_TOKEN");
        assert!(matches!(result, Err(ScraperError::Config(_))));
    }
}
