pub mod fetch;
pub mod olx;
pub mod otodom;
pub mod traits;
pub mod types;

pub use fetch::HttpFetcher;
pub use olx::OlxScraper;
pub use otodom::OtodomScraper;
pub use traits::{DetailScraper, Fetcher};

use crate::models::{Offer, Site};
use tracing::{debug, warn};

/// The detail page scanner responsible for `site`.
pub fn detail_scraper(site: Site) -> &'static dyn DetailScraper {
    match site {
        Site::Olx => &OlxScraper,
        Site::Otodom => &OtodomScraper,
    }
}

/// Follows the offer's URL and fills in the detail page fields.
///
/// Offers on unknown hosts and pages that fail to download come back unchanged:
/// the listing card already made them valid.
pub async fn enrich<F>(fetcher: &F, mut offer: Offer) -> Offer
where
    F: Fetcher + ?Sized,
{
    let Some(site) = Site::from_url(&offer.url) else {
        debug!("No detail scraper for {}", offer.url);
        return offer;
    };

    let html = match fetcher.fetch(&offer.url).await {
        Ok(html) => html,
        Err(e) => {
            warn!("Error fetching the {:?} page {}: {}", site, offer.url, e);
            return offer;
        }
    };

    let scraper = detail_scraper(site);
    debug!("Scanning {:?} detail page for {}", scraper.site(), offer.url);
    scraper.apply(&html, &mut offer);
    offer
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Fetcher;
    use crate::error::FetchError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned pages; unknown URLs answer 404.
    #[derive(Default)]
    pub struct StubFetcher {
        pages: HashMap<String, String>,
        requests: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        pub fn with_page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), html.to_string());
            self
        }

        pub fn request_count(&self, url: &str) -> usize {
            self.requests.lock().unwrap().iter().filter(|u| *u == url).count()
        }

        pub fn total_requests(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());
            self.pages.get(url).cloned().ok_or(FetchError::Status(404))
        }
    }
}
