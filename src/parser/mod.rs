pub mod extract;
pub mod profile;
pub mod segment;
pub mod tokenizer;

pub use profile::{ExtractionProfile, Profiles};

use crate::models::Offer;
use tracing::debug;

/// Extracts every non-featured offer from a search results page.
///
/// Cards that come out without a title or URL are dropped.
pub fn parse_listing(page: &str, profile: &ExtractionProfile) -> Vec<Offer> {
    let offers: Vec<Offer> = segment::segment(page, &profile.cards)
        .map(|fragment| extract::extract_offer(&fragment, profile))
        .filter(|offer| !offer.is_empty())
        .collect();
    debug!("Parsed {} offers from {} bytes of HTML", offers.len(), page.len());
    offers
}
