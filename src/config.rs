use crate::constants::{
    BOARD_GAMES_CATEGORY, BOARD_GAMES_URL, DEFAULT_CONCURRENCY, DEFAULT_QUERIES, DEFAULT_TABLE_ID,
    OLX_BASE_ORIGIN,
};
use crate::error::{Result, ScraperError};
use crate::types::{CrawlUnit, Query};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Crawl units allowed to run at the same time
    pub concurrency: usize,
    pub base_origin: String,
    /// Address for the Prometheus exporter; metrics stay in-process when unset
    pub metrics_addr: Option<String>,
    pub catalog: CatalogConfig,
    pub http: HttpConfig,
    pub selectors: SelectorConfig,
    pub sink: SinkConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            base_origin: OLX_BASE_ORIGIN.to_string(),
            metrics_addr: None,
            catalog: CatalogConfig::default(),
            http: HttpConfig::default(),
            selectors: SelectorConfig::default(),
            sink: SinkConfig::default(),
        }
    }
}

/// Categories to search (name -> search URL prefix) and the search terms to run in each
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub categories: BTreeMap<String, String>,
    pub queries: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            categories: BTreeMap::from([(
                BOARD_GAMES_CATEGORY.to_string(),
                BOARD_GAMES_URL.to_string(),
            )]),
            queries: DEFAULT_QUERIES.iter().map(|q| q.to_string()).collect(),
        }
    }
}

impl CatalogConfig {
    /// Every (category, query) pair, category-major.
    pub fn units(&self) -> Vec<CrawlUnit> {
        self.categories
            .iter()
            .flat_map(|(category, url)| {
                self.queries.iter().map(move |label| {
                    let query = Query::new(category.clone(), label.clone());
                    let start_url = query.listing_url(url);
                    CrawlUnit { query, start_url }
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:126.0) Gecko/20100101 Firefox/126.0"
                .to_string(),
            timeout_seconds: 30,
            max_retries: 2,
            retry_backoff_ms: 1000,
        }
    }
}

/// CSS selectors for the results page markup
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub total_count: String,
    pub listing: String,
    pub location_date: String,
    pub title: String,
    pub price: String,
    pub status: String,
    pub link: String,
    pub next_page: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            total_count: r#"span[data-testid="total-count"]"#.to_string(),
            listing: r#"div[data-cy="l-card"]"#.to_string(),
            location_date: r#"p[data-testid="location-date"]"#.to_string(),
            title: "h6".to_string(),
            price: r#"p[data-testid="ad-price"]"#.to_string(),
            status: "span span".to_string(),
            link: "a".to_string(),
            next_page: r#"a[data-testid="pagination-forward"]"#.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkConfig {
    Bigquery {
        project_id: String,
        dataset_id: String,
        #[serde(default = "default_table_id")]
        table_id: String,
        /// Environment variable holding an OAuth access token
        #[serde(default = "default_token_env")]
        token_env: String,
    },
    Ndjson {
        #[serde(default = "default_output_dir")]
        output_dir: String,
        #[serde(default = "default_table_id")]
        table_id: String,
    },
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig::Ndjson {
            output_dir: default_output_dir(),
            table_id: default_table_id(),
        }
    }
}

impl SinkConfig {
    pub fn table_id(&self) -> &str {
        match self {
            SinkConfig::Bigquery { table_id, .. } | SinkConfig::Ndjson { table_id, .. } => table_id,
        }
    }
}

fn default_table_id() -> String {
    DEFAULT_TABLE_ID.to_string()
}

fn default_token_env() -> String {
    "BIGQUERY_ACCESS_TOKEN".to_string()
}

fn default_output_dir() -> String {
    "output".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ScraperError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(ScraperError::Config("concurrency must be at least 1".into()));
        }
        if self.catalog.categories.is_empty() || self.catalog.queries.is_empty() {
            return Err(ScraperError::Config(
                "catalog needs at least one category and one query".into(),
            ));
        }
        url::Url::parse(&self.base_origin)?;
        crate::page::ListingSelectors::compile(&self.selectors)?;
        Ok(())
    }
}
