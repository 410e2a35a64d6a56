use crate::models::Search;
use crate::notify::{render_offer, Notifier};
use crate::parser::{self, Profiles};
use crate::scrapers::{self, Fetcher};
use crate::store::{OfferStore, SearchStore};
use anyhow::{Context, Result};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Counters for one pass over all searches.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub searches: usize,
    pub stored: usize,
    pub notified: usize,
}

/// Sweeps every saved search, stores unseen offers and notifies subscribers
/// about those posted today.
pub struct Poller<F, S, N> {
    fetcher: F,
    store: S,
    notifier: N,
    profiles: Profiles,
    interval: Duration,
    notify_delay: Duration,
}

impl<F, S, N> Poller<F, S, N>
where
    F: Fetcher,
    S: OfferStore + SearchStore,
    N: Notifier,
{
    pub fn new(fetcher: F, store: S, notifier: N, profiles: Profiles) -> Self {
        Self {
            fetcher,
            store,
            notifier,
            profiles,
            interval: Duration::from_secs(60),
            notify_delay: Duration::from_secs(5),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Pause after every notification dispatch.
    pub fn with_notify_delay(mut self, delay: Duration) -> Self {
        self.notify_delay = delay;
        self
    }

    /// Polls until the process exits.
    pub async fn run(&self) {
        info!("Polling every {:?}", self.interval);
        loop {
            if let Err(e) = self.sweep().await {
                error!("Sweep failed: {:#}", e);
            }
            sleep(self.interval).await;
        }
    }

    pub async fn sweep(&self) -> Result<SweepStats> {
        let searches = self
            .store
            .list_searches()
            .context("Failed to list searches")?;

        let mut stats = SweepStats::default();
        for search in &searches {
            self.process_search(search, &mut stats).await;
            stats.searches += 1;
        }

        info!(
            "Swept {} searches: {} new offers, {} notifications",
            stats.searches, stats.stored, stats.notified
        );
        Ok(stats)
    }

    async fn process_search(&self, search: &Search, stats: &mut SweepStats) {
        let Some(profile) = self.profiles.for_url(&search.url) else {
            warn!("No extraction profile for search {} ({})", search.id, search.url);
            return;
        };

        let page = match self.fetcher.fetch(&search.url).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Error fetching search {} page {}: {}", search.id, search.url, e);
                return;
            }
        };

        let offers = parser::parse_listing(&page, profile);
        debug!(
            "Search {}: {} {:?} offers on the listing page",
            search.id,
            offers.len(),
            profile.site
        );

        for offer in offers {
            match self.store.search_exists(search.id) {
                Ok(true) => {}
                Ok(false) => {
                    debug!("Search {} was deleted, abandoning it for this sweep", search.id);
                    return;
                }
                Err(e) => {
                    warn!("Error checking search {}: {:#}", search.id, e);
                    return;
                }
            }

            match self
                .store
                .offer_exists(&offer.title, offer.price, search.user_id)
            {
                Ok(false) => {}
                Ok(true) => {
                    debug!("Already seen: {}", offer.url);
                    continue;
                }
                Err(e) => {
                    warn!("Error checking offer {}: {:#}", offer.url, e);
                    continue;
                }
            }

            let offer = scrapers::enrich(&self.fetcher, offer).await;

            if let Err(e) = self.store.add_offer(&offer, search.user_id) {
                error!("Error storing offer {}: {:#}", offer.url, e);
                continue;
            }
            stats.stored += 1;

            if offer.images.is_empty() || !offer.posted_today() {
                debug!("Stored without notifying: {}", offer.url);
                continue;
            }

            let text = render_offer(&offer);
            match self
                .notifier
                .notify(search.user_id, &text, &offer.images)
                .await
            {
                Ok(()) => stats.notified += 1,
                Err(e) => warn!("Error notifying user {} about {}: {:#}", search.user_id, offer.url, e),
            }
            sleep(self.notify_delay).await;
        }
    }
}
