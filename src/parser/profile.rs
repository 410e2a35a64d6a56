use chrono::Duration;
use once_cell::sync::Lazy;
use regex::Regex;

use super::extract::Context;
use super::tokenizer::Token;
use crate::models::Site;

pub(crate) static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid digit pattern"));
static CLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{2}:\d{2}").expect("valid clock pattern"));

/// Listing timestamps are rendered in UTC; local time is two hours ahead.
const DEFAULT_CLOCK_OFFSET_HOURS: i64 = 2;

/// A tag name with an optional `attr="value"` requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub tag: &'static str,
    pub attr: Option<(&'static str, &'static str)>,
}

impl Selector {
    pub const fn tag(tag: &'static str) -> Self {
        Self { tag, attr: None }
    }

    pub const fn with_attr(tag: &'static str, key: &'static str, value: &'static str) -> Self {
        Self {
            tag,
            attr: Some((key, value)),
        }
    }

    pub fn matches(&self, token: &Token) -> bool {
        token.is_start(self.tag)
            && self
                .attr
                .map_or(true, |(key, value)| token.has_attr(key, value))
    }
}

/// How listing cards are delimited on a results page.
#[derive(Debug, Clone)]
pub struct CardLayout {
    pub container: &'static str,
    pub marker: (&'static str, &'static str),
    /// Any card whose markup contains this text is promoted and skipped.
    pub featured: &'static str,
}

/// A data attribute whose presence on any tag switches the extractor context.
#[derive(Debug, Clone)]
pub struct Hint {
    pub key: &'static str,
    pub value: &'static str,
    pub context: Context,
}

/// Per-site selectors, patterns and locale constants.
#[derive(Debug, Clone)]
pub struct ExtractionProfile {
    pub site: Site,
    pub cards: CardLayout,
    pub title: Selector,
    pub price: Selector,
    pub location_date: Selector,
    pub link_tag: &'static str,
    pub link_attr: &'static str,
    pub hints: Vec<Hint>,
    pub price_pattern: Regex,
    pub time_pattern: Regex,
    pub today: &'static str,
    pub base_url: &'static str,
    pub clock_offset: Duration,
}

impl ExtractionProfile {
    pub fn olx() -> Self {
        Self {
            site: Site::Olx,
            cards: CardLayout {
                container: "div",
                marker: ("data-cy", "l-card"),
                featured: "adCard-featured",
            },
            title: Selector::tag("h4"),
            price: Selector::with_attr("p", "data-testid", "ad-price"),
            location_date: Selector::with_attr("p", "data-testid", "location-date"),
            link_tag: "a",
            link_attr: "href",
            hints: Vec::new(),
            price_pattern: DIGITS.clone(),
            time_pattern: CLOCK.clone(),
            today: "Dzisiaj",
            base_url: Site::Olx.base_url(),
            clock_offset: Duration::hours(DEFAULT_CLOCK_OFFSET_HOURS),
        }
    }

    pub fn otodom() -> Self {
        Self {
            site: Site::Otodom,
            cards: CardLayout {
                container: "article",
                marker: ("data-cy", "listing-item"),
                featured: "listing-item-promoted",
            },
            title: Selector::with_attr("p", "data-cy", "listing-item-title"),
            price: Selector::with_attr("span", "data-cy", "listing-item-price"),
            location_date: Selector::with_attr("p", "data-testid", "advert-card-address"),
            link_tag: "a",
            link_attr: "href",
            hints: vec![
                Hint {
                    key: "data-testid",
                    value: "listing-item-price",
                    context: Context::Price,
                },
                Hint {
                    key: "data-testid",
                    value: "listing-item-date",
                    context: Context::LocationDate,
                },
            ],
            price_pattern: DIGITS.clone(),
            time_pattern: CLOCK.clone(),
            today: "Dzisiaj",
            base_url: Site::Otodom.base_url(),
            clock_offset: Duration::hours(DEFAULT_CLOCK_OFFSET_HOURS),
        }
    }

    pub fn with_clock_offset(mut self, hours: i64) -> Self {
        self.clock_offset = Duration::hours(hours);
        self
    }

    /// Context adopted from a data attribute on `token`, if any.
    pub fn hint_for(&self, token: &Token) -> Option<Context> {
        self.hints
            .iter()
            .find(|hint| token.has_attr(hint.key, hint.value))
            .map(|hint| hint.context)
    }
}

/// Both site profiles, picked by the URL of the page being parsed.
#[derive(Debug, Clone)]
pub struct Profiles {
    olx: ExtractionProfile,
    otodom: ExtractionProfile,
}

impl Profiles {
    pub fn with_clock_offset(hours: i64) -> Self {
        Self {
            olx: ExtractionProfile::olx().with_clock_offset(hours),
            otodom: ExtractionProfile::otodom().with_clock_offset(hours),
        }
    }

    pub fn for_url(&self, url: &str) -> Option<&ExtractionProfile> {
        match Site::from_url(url)? {
            Site::Olx => Some(&self.olx),
            Site::Otodom => Some(&self.otodom),
        }
    }
}

impl Default for Profiles {
    fn default() -> Self {
        Self {
            olx: ExtractionProfile::olx(),
            otodom: ExtractionProfile::otodom(),
        }
    }
}
