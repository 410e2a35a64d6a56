use crate::error::FetchError;
use crate::models::{Offer, Site};
use async_trait::async_trait;

/// Downloads pages. Implemented over HTTP in production and by canned pages in tests.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Common trait for the per-site detail page scanners
pub trait DetailScraper: Send + Sync {
    fn site(&self) -> Site;

    /// Fill in what the listing card lacks from the offer's own page.
    /// Fields the page does not carry are left untouched.
    fn apply(&self, html: &str, offer: &mut Offer);
}
