use crate::config::SelectorConfig;
use crate::error::{Result, ScraperError};
use crate::types::RawListing;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Compiled form of [`SelectorConfig`]
#[derive(Debug, Clone)]
pub struct ListingSelectors {
    total_count: Selector,
    listing: Selector,
    location_date: Selector,
    title: Selector,
    price: Selector,
    status: Selector,
    link: Selector,
    next_page: Selector,
}

impl ListingSelectors {
    pub fn compile(config: &SelectorConfig) -> Result<Self> {
        Ok(Self {
            total_count: compile("total_count", &config.total_count)?,
            listing: compile("listing", &config.listing)?,
            location_date: compile("location_date", &config.location_date)?,
            title: compile("title", &config.title)?,
            price: compile("price", &config.price)?,
            status: compile("status", &config.status)?,
            link: compile("link", &config.link)?,
            next_page: compile("next_page", &config.next_page)?,
        })
    }
}

fn compile(name: &str, css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| ScraperError::Config(format!("Invalid selector '{}' ({}): {:?}", css, name, e)))
}

/// One fetched results page, reduced to the text the crawler needs.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: Url,
    /// Text of the result-count indicator, when the page has one
    pub result_count: Option<String>,
    pub listings: Vec<RawListing>,
    /// Every "next page" link candidate, in document order
    pub next_links: Vec<String>,
}

impl Page {
    pub fn from_html(url: &str, html: &str, selectors: &ListingSelectors) -> Result<Self> {
        let url = Url::parse(url)?;
        let document = Html::parse_document(html);

        let result_count = document
            .select(&selectors.total_count)
            .next()
            .map(|el| el.text().collect::<String>());

        let listings = document
            .select(&selectors.listing)
            .map(|card| RawListing {
                location_date: card
                    .select(&selectors.location_date)
                    .next()
                    .map(location_tokens)
                    .unwrap_or_default(),
                title: first_text(card, &selectors.title),
                price: first_text(card, &selectors.price),
                status: first_text(card, &selectors.status),
                href: card
                    .select(&selectors.link)
                    .find_map(|a| a.value().attr("href"))
                    .map(str::to_string),
            })
            .collect();

        let next_links = document
            .select(&selectors.next_page)
            .filter_map(|a| a.value().attr("href"))
            .map(str::to_string)
            .collect();

        Ok(Self {
            url,
            result_count,
            listings,
            next_links,
        })
    }

    /// Resolves a link found on this page against the page's own address.
    pub fn join(&self, href: &str) -> Result<String> {
        Ok(self.url.join(href)?.to_string())
    }
}

fn first_text(root: ElementRef<'_>, selector: &Selector) -> Option<String> {
    root.select(selector)
        .flat_map(|el| el.text())
        .map(str::trim)
        .find(|t| !t.is_empty())
        .map(str::to_string)
}

/// Text nodes of the location/date paragraph, with " - " split out as its own token.
fn location_tokens(el: ElementRef<'_>) -> Vec<String> {
    let mut tokens = Vec::new();
    for text in el.text() {
        let mut parts = text.split(" - ").peekable();
        while let Some(part) = parts.next() {
            let part = part.trim();
            if !part.is_empty() {
                tokens.push(part.to_string());
            }
            if parts.peek().is_some() {
                tokens.push("-".to_string());
            }
        }
    }
    tokens
}
