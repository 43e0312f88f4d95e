use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, SubsecRound, TimeZone, Utc};
use chrono_tz::Europe::Warsaw;

/// One search term crawled within one marketplace category
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    pub label: String,
    pub category: String,
}

impl Query {
    pub fn new(category: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            category: category.into(),
        }
    }

    /// First results page for this query under the given category search URL.
    pub fn listing_url(&self, category_url: &str) -> String {
        format!(
            "{}{}",
            category_url,
            self.label.replace(' ', "-").to_lowercase()
        )
    }
}

/// A (category, query) pair together with the URL its crawl starts from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlUnit {
    pub query: Query,
    pub start_url: String,
}

/// Condition of the advertised item; stored in the export table as its integer code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AdStatus {
    New = 1,
    Used = 2,
    Other = 3,
    ExchangeOffer = 4,
}

impl AdStatus {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Raw text channels scraped from one listing card.
///
/// `location_date` keeps the individual text nodes of the "city, district - date"
/// paragraph, so the date separator shows up as its own `-` token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawListing {
    pub location_date: Vec<String>,
    pub title: Option<String>,
    pub price: Option<String>,
    pub status: Option<String>,
    pub href: Option<String>,
}

/// Instant a page was captured, shared by every ad extracted from it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTime {
    pub at: DateTime<Utc>,
}

impl CaptureTime {
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(at: DateTime<Utc>) -> Self {
        Self {
            at: at.trunc_subsecs(0),
        }
    }

    /// Calendar day of the capture on the marketplace's wall clock.
    pub fn date(&self) -> NaiveDate {
        self.at.with_timezone(&Warsaw).date_naive()
    }

    /// Marketplace wall-clock time, the reference for relative publication dates.
    pub fn local(&self) -> NaiveDateTime {
        self.at.with_timezone(&Warsaw).naive_local()
    }
}

/// Resolves a marketplace wall-clock time to an instant.
///
/// Times repeated by the autumn DST change take the earlier instant; times skipped by
/// the spring change are moved forward by the hour that was skipped.
pub fn marketplace_to_utc(local: NaiveDateTime) -> Option<DateTime<Utc>> {
    let resolved = match Warsaw.from_local_datetime(&local) {
        LocalResult::None => Warsaw
            .from_local_datetime(&local.checked_add_signed(Duration::hours(1))?)
            .earliest(),
        other => other.earliest(),
    }?;
    Some(resolved.with_timezone(&Utc))
}

/// Normalized fields of one listing before the derived-field pass
#[derive(Debug, Clone, PartialEq)]
pub struct AdDraft {
    pub title: String,
    pub price: f64,
    pub status: AdStatus,
    pub city: String,
    pub district: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub url: String,
    pub label: String,
    pub category: String,
    pub captured: CaptureTime,
}

/// Canonical ad record, built once by [`crate::identity::finalize`]
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedAd {
    pub ad_id: String,
    pub title: String,
    pub price: f64,
    pub status: AdStatus,
    pub city: String,
    pub district: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub label: String,
    pub category: String,
    pub url: String,
    pub scraped_timestamp: DateTime<Utc>,
    pub scraped_date: NaiveDate,
    pub title_contains_label_token: bool,
}
