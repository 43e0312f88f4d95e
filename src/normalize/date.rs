//! Publication dates as the marketplace renders them in Polish.
//!
//! Cards show either a relative phrase ("Dzisiaj o 14:05", "3 dni temu") or an
//! absolute date ("12 maja 2024", optionally prefixed with "Odświeżono dnia").

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;

static TIME_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<rest>.*?)\s*(?:o\s+)?(?P<h>\d{1,2}):(?P<m>\d{2})$").unwrap());
static RELATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?P<n>\d+)\s+)?(?P<unit>minut[aęy]?|godzin[aęy]?|dni|dzień|tydzień|tygodni[e]?)\s+temu$")
        .unwrap()
});
static WORD_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<d>\d{1,2})\s+(?P<month>\p{L}+)\s+(?P<y>\d{4})$").unwrap());
static DOTTED_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<d>\d{1,2})\.(?P<mo>\d{1,2})\.(?P<y>\d{4})$").unwrap());
static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<y>\d{4})-(?P<mo>\d{2})-(?P<d>\d{2})$").unwrap());

const REFRESHED_PREFIXES: &[&str] = &["odświeżono dnia", "odświeżono", "dnia"];

/// Parses a Polish publication date relative to `now` (marketplace local time).
///
/// Returns `None` for anything outside the supported phrasings. Results are
/// truncated to the minute.
pub fn parse_date(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let mut phrase = text.trim().to_lowercase();
    for prefix in REFRESHED_PREFIXES {
        if let Some(stripped) = phrase.strip_prefix(prefix) {
            phrase = stripped.trim_start().to_string();
            break;
        }
    }

    let (phrase, time) = split_time(&phrase);
    let parsed = match phrase.as_str() {
        "dzisiaj" | "dziś" => Some(at_time(now.date(), time, now)),
        "wczoraj" => Some(at_time(now.date() - Duration::days(1), time, now)),
        "przedwczoraj" => Some(at_time(now.date() - Duration::days(2), time, now)),
        _ => relative(&phrase, now).or_else(|| {
            let date = absolute(&phrase)?;
            match time {
                Some(time) => Some(date.and_time(time)),
                None => date.and_hms_opt(0, 0, 0),
            }
        }),
    }?;
    truncate_to_minute(parsed)
}

fn split_time(phrase: &str) -> (String, Option<NaiveTime>) {
    let Some(caps) = TIME_SUFFIX.captures(phrase) else {
        return (phrase.to_string(), None);
    };
    let time = caps["h"]
        .parse()
        .ok()
        .zip(caps["m"].parse().ok())
        .and_then(|(h, m)| NaiveTime::from_hms_opt(h, m, 0));
    match time {
        Some(time) => (caps["rest"].trim().to_string(), Some(time)),
        None => (phrase.to_string(), None),
    }
}

fn at_time(date: NaiveDate, time: Option<NaiveTime>, now: NaiveDateTime) -> NaiveDateTime {
    date.and_time(time.unwrap_or(now.time()))
}

fn relative(phrase: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let caps = RELATIVE.captures(phrase)?;
    let n: i64 = match caps.name("n") {
        Some(n) => n.as_str().parse().ok()?,
        None => 1,
    };
    let unit = &caps["unit"];
    // Counts come straight from page text and may be arbitrarily large
    let delta = if unit.starts_with("minut") {
        Duration::try_minutes(n)
    } else if unit.starts_with("godzin") {
        Duration::try_hours(n)
    } else if unit == "dni" || unit == "dzień" {
        Duration::try_days(n)
    } else {
        Duration::try_weeks(n)
    }?;
    now.checked_sub_signed(delta)
}

fn absolute(phrase: &str) -> Option<NaiveDate> {
    if let Some(caps) = WORD_DATE.captures(phrase) {
        let month = month_number(&caps["month"])?;
        return NaiveDate::from_ymd_opt(caps["y"].parse().ok()?, month, caps["d"].parse().ok()?);
    }
    if let Some(caps) = DOTTED_DATE.captures(phrase).or_else(|| ISO_DATE.captures(phrase)) {
        return NaiveDate::from_ymd_opt(
            caps["y"].parse().ok()?,
            caps["mo"].parse().ok()?,
            caps["d"].parse().ok()?,
        );
    }
    None
}

/// Genitive ("12 maja") and nominative ("maj") month names.
fn month_number(name: &str) -> Option<u32> {
    let month = match name {
        "stycznia" | "styczeń" => 1,
        "lutego" | "luty" => 2,
        "marca" | "marzec" => 3,
        "kwietnia" | "kwiecień" => 4,
        "maja" | "maj" => 5,
        "czerwca" | "czerwiec" => 6,
        "lipca" | "lipiec" => 7,
        "sierpnia" | "sierpień" => 8,
        "września" | "wrzesień" => 9,
        "października" | "październik" => 10,
        "listopada" | "listopad" => 11,
        "grudnia" | "grudzień" => 12,
        _ => return None,
    };
    Some(month)
}

fn truncate_to_minute(dt: NaiveDateTime) -> Option<NaiveDateTime> {
    dt.with_second(0)?.with_nanosecond(0)
}
