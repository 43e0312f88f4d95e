use crate::constants::{EXTENDED_SEARCH_PARAM, EXTENDED_SEARCH_REASONS};
use crate::error::{Result, ScraperError};
use crate::identity::finalize;
use crate::normalize::{parse_date, parse_location, parse_money, parse_status, resolve_url};
use crate::types::{marketplace_to_utc, AdDraft, CaptureTime, NormalizedAd, Query, RawListing};
use tracing::{debug, info, warn};
use url::Url;

/// Outcome of running the extractor over one results page
#[derive(Debug, Default)]
pub struct PageExtraction {
    /// Ads whose title matched the query, in page order
    pub accepted: Vec<NormalizedAd>,
    /// Listings dropped because the title did not mention the query
    pub dropped: usize,
    /// Listings skipped because a field could not be parsed
    pub parse_failures: usize,
    /// An accepted ad came from a broadened search; the rest of the page was skipped
    pub extended_category_reached: bool,
}

pub struct PageExtractor {
    base_origin: Url,
}

impl PageExtractor {
    pub fn new(base_origin: &str) -> Result<Self> {
        Ok(Self {
            base_origin: Url::parse(base_origin)?,
        })
    }

    /// Normalizes every listing of a page for `query`.
    ///
    /// Stops at the first accepted ad carrying the extended-category marker; that ad is
    /// not part of the output.
    pub fn extract(
        &self,
        listings: &[RawListing],
        query: &Query,
        captured: CaptureTime,
    ) -> PageExtraction {
        let mut out = PageExtraction::default();

        for (index, listing) in listings.iter().enumerate() {
            let ad = match self.draft(listing, query, captured) {
                Ok(draft) => finalize(draft),
                Err(e) => {
                    warn!(label = %query.label, index, "Skipping listing: {}", e);
                    out.parse_failures += 1;
                    continue;
                }
            };

            if !ad.title_contains_label_token {
                debug!(label = %query.label, title = %ad.title, "Title does not match query");
                out.dropped += 1;
                continue;
            }

            if is_extended_category(&ad.url) {
                info!(
                    label = %query.label,
                    category = %query.category,
                    "No more ads for this query in the category"
                );
                out.extended_category_reached = true;
                break;
            }

            out.accepted.push(ad);
        }

        out
    }

    fn draft(&self, listing: &RawListing, query: &Query, captured: CaptureTime) -> Result<AdDraft> {
        let title = listing
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ScraperError::MissingField("title".into()))?;
        let href = listing
            .href
            .as_deref()
            .ok_or_else(|| ScraperError::MissingField("url".into()))?;
        let price_text = listing
            .price
            .as_deref()
            .ok_or_else(|| ScraperError::MissingField("price".into()))?;

        let price = parse_money(price_text)?;
        let status = parse_status(listing.status.as_deref().unwrap_or_default());
        let (city, district) = parse_location(&listing.location_date);
        let published = listing
            .location_date
            .last()
            .and_then(|text| parse_date(text, captured.local()))
            .and_then(marketplace_to_utc);
        let url = resolve_url(href, &self.base_origin)?;

        Ok(AdDraft {
            title: title.to_string(),
            price,
            status,
            city,
            district,
            published,
            url,
            label: query.label.clone(),
            category: query.category.clone(),
            captured,
        })
    }
}

/// Whether a listing URL was returned from a broadened search scope.
pub fn is_extended_category(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    parsed
        .query_pairs()
        .any(|(key, value)| key == EXTENDED_SEARCH_PARAM && EXTENDED_SEARCH_REASONS.contains(&value.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AdStatus;
    use chrono::{TimeZone, Utc};

    fn captured() -> CaptureTime {
        CaptureTime::at(Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap())
    }

    fn listing(title: &str, price: &str, href: &str) -> RawListing {
        RawListing {
            location_date: vec![
                "Warszawa, Mokotów".to_string(),
                "-".to_string(),
                "Dzisiaj o 10:15".to_string(),
            ],
            title: Some(title.to_string()),
            price: Some(price.to_string()),
            status: Some("Używane".to_string()),
            href: Some(href.to_string()),
        }
    }

    fn extractor() -> PageExtractor {
        PageExtractor::new("https://www.olx.pl").unwrap()
    }

    #[test]
    fn extracts_matching_listing() {
        let query = Query::new("board_games", "kemet");
        let out = extractor().extract(
            &[listing("Kemet gra planszowa", "150 zł", "/d/oferta/kemet-ID1.html")],
            &query,
            captured(),
        );

        assert_eq!(out.accepted.len(), 1);
        let ad = &out.accepted[0];
        assert_eq!(ad.url, "https://www.olx.pl/d/oferta/kemet-ID1.html");
        assert_eq!(ad.price, 150.0);
        assert_eq!(ad.status, AdStatus::Used);
        assert_eq!(ad.city, "Warszawa");
        assert_eq!(ad.district.as_deref(), Some("Mokotów"));
        // 12:00 UTC is 14:00 in Warsaw; the card says 10:15 today, which is 08:15 UTC
        assert_eq!(
            ad.published,
            Some(Utc.with_ymd_and_hms(2024, 5, 15, 8, 15, 0).unwrap())
        );
        assert_eq!(ad.label, "kemet");
        assert_eq!(ad.category, "board_games");
        assert!(!out.extended_category_reached);
    }

    #[test]
    fn dates_agree_across_the_utc_day_boundary() {
        // Just past midnight in Warsaw, still the previous day in UTC
        let captured = CaptureTime::at(Utc.with_ymd_and_hms(2024, 7, 1, 22, 30, 0).unwrap());
        let mut raw = listing("Kemet", "150 zł", "/d/oferta/kemet-ID11.html");
        raw.location_date = vec![
            "Łódź".to_string(),
            "-".to_string(),
            "Dzisiaj o 00:20".to_string(),
        ];

        let out = extractor().extract(&[raw], &Query::new("board_games", "kemet"), captured);

        let ad = &out.accepted[0];
        assert_eq!(
            ad.published,
            Some(Utc.with_ymd_and_hms(2024, 7, 1, 22, 20, 0).unwrap())
        );
        assert!(ad.published.unwrap() <= ad.scraped_timestamp);
        assert_eq!(ad.scraped_date.to_string(), "2024-07-02");
    }

    #[test]
    fn drops_non_matching_titles_and_bad_prices() {
        let query = Query::new("board_games", "kemet");
        let out = extractor().extract(
            &[
                listing("Cyklady", "100 zł", "/d/oferta/cyklady-ID2.html"),
                listing("Kemet", "Za darmo", "/d/oferta/kemet-ID3.html"),
                listing("Kemet", "Zamienię", "/d/oferta/kemet-ID4.html"),
            ],
            &query,
            captured(),
        );

        assert_eq!(out.dropped, 1);
        assert_eq!(out.parse_failures, 1);
        assert_eq!(out.accepted.len(), 1);
        assert_eq!(out.accepted[0].status, AdStatus::ExchangeOffer);
        assert_eq!(out.accepted[0].price, 9999.0);
    }

    #[test]
    fn missing_title_is_a_parse_failure() {
        let query = Query::new("board_games", "kemet");
        let mut raw = listing("Kemet", "10 zł", "/d/oferta/kemet-ID5.html");
        raw.title = None;
        let out = extractor().extract(&[raw], &query, captured());
        assert_eq!(out.parse_failures, 1);
        assert!(out.accepted.is_empty());
    }

    #[test]
    fn extended_category_marker_stops_the_page() {
        let query = Query::new("board_games", "kemet");
        let out = extractor().extract(
            &[
                listing("Kemet", "100 zł", "/d/oferta/kemet-ID6.html"),
                listing(
                    "Kemet dodatek",
                    "50 zł",
                    "/d/oferta/kemet-ID7.html?reason=extended_search_extended_category",
                ),
                listing("Kemet", "80 zł", "/d/oferta/kemet-ID8.html"),
            ],
            &query,
            captured(),
        );

        assert!(out.extended_category_reached);
        assert_eq!(out.accepted.len(), 1);
        assert!(out.accepted[0].url.ends_with("kemet-ID6.html"));
    }

    #[test]
    fn marker_on_dropped_listing_does_not_stop() {
        let query = Query::new("board_games", "kemet");
        let out = extractor().extract(
            &[
                listing(
                    "Cyklady",
                    "50 zł",
                    "/d/oferta/cyklady-ID9.html?reason=extended_search_extended_s2v",
                ),
                listing("Kemet", "80 zł", "/d/oferta/kemet-ID10.html"),
            ],
            &query,
            captured(),
        );
        assert!(!out.extended_category_reached);
        assert_eq!(out.accepted.len(), 1);
    }

    #[test]
    fn extended_category_detection() {
        assert!(is_extended_category(
            "https://www.olx.pl/d/oferta/x.html?reason=extended_search_extended_category"
        ));
        assert!(is_extended_category(
            "https://www.olx.pl/d/oferta/x.html?reason=extended_search_extended_s2v"
        ));
        assert!(!is_extended_category("https://www.olx.pl/d/oferta/x.html"));
        assert!(!is_extended_category(
            "https://www.olx.pl/d/oferta/x.html?reason=observed_ad"
        ));
    }
}
