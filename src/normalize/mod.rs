//! Pure field transforms turning raw listing text into typed values.
//!
//! Nothing in here logs; callers decide how loud a rejected field should be.

pub mod date;

pub use date::parse_date;

use crate::constants::{BARTER_PRICE, BARTER_TOKEN, STATUS_NEW_TOKEN, STATUS_USED_TOKEN};
use crate::error::{Result, ScraperError};
use crate::types::AdStatus;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+(?:\.\d+)?$").unwrap());
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());

/// Parses a listing price such as `"1 234,50 zł"`.
///
/// The barter label maps to [`BARTER_PRICE`]. Anything that is not a plain decimal once
/// the currency and grouping spaces are gone is a parse error.
pub fn parse_money(text: &str) -> Result<f64> {
    let trimmed = text.trim();
    if trimmed == BARTER_TOKEN {
        return Ok(BARTER_PRICE);
    }

    let cleaned: String = trimmed
        .replace("zł", "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if !DECIMAL.is_match(&cleaned) {
        return Err(ScraperError::parse("price", text));
    }
    cleaned
        .parse::<f64>()
        .map_err(|_| ScraperError::parse("price", text))
}

pub fn parse_status(text: &str) -> AdStatus {
    match text.trim() {
        STATUS_NEW_TOKEN => AdStatus::New,
        STATUS_USED_TOKEN => AdStatus::Used,
        _ => AdStatus::Other,
    }
}

/// Splits the "city, district - date" tokens into city and optional district.
///
/// Tokens after the first standalone `-` belong to the date and are ignored.
pub fn parse_location<S: AsRef<str>>(tokens: &[S]) -> (String, Option<String>) {
    let location = tokens
        .iter()
        .map(|t| t.as_ref().trim())
        .take_while(|t| *t != "-")
        .collect::<Vec<_>>()
        .join(" ");

    match location.split_once(',') {
        Some((city, rest)) => {
            let district = rest.split(',').next().unwrap_or_default().trim();
            let district = (!district.is_empty()).then(|| district.to_string());
            (city.trim().to_string(), district)
        }
        None => (location.trim().to_string(), None),
    }
}

/// Joins a listing link against the marketplace origin. Absolute links pass through.
pub fn resolve_url(path: &str, base_origin: &Url) -> Result<String> {
    Ok(base_origin.join(path.trim())?.to_string())
}

/// Lowercases and drops everything that is neither a word character nor whitespace.
pub fn normalize_token(text: &str) -> String {
    NON_WORD.replace_all(&text.to_lowercase(), "").into_owned()
}

pub fn contains_token(haystack: &str, needle: &str) -> bool {
    normalize_token(haystack).contains(&normalize_token(needle))
}
