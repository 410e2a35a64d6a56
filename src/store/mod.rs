pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::models::{Offer, Search};
use anyhow::Result;

/// Offers already seen per subscriber.
pub trait OfferStore: Send + Sync {
    /// Dedup key is (title, price, subscriber).
    fn offer_exists(&self, title: &str, price: i64, user_id: i64) -> Result<bool>;

    /// Stores the offer for `user_id`; storing a known offer again does nothing.
    fn add_offer(&self, offer: &Offer, user_id: i64) -> Result<()>;

    fn list_offers(&self) -> Result<Vec<(Offer, i64)>>;
}

/// Saved searches the poller sweeps.
pub trait SearchStore: Send + Sync {
    /// Returns the search id, reusing the existing row for a repeated (user, url) pair.
    fn add_search(&self, user_id: i64, url: &str) -> Result<i64>;

    /// `false` when there was no such search.
    fn delete_search(&self, id: i64) -> Result<bool>;

    fn search_exists(&self, id: i64) -> Result<bool>;

    /// All searches in insertion order.
    fn list_searches(&self) -> Result<Vec<Search>>;

    fn searches_for_user(&self, user_id: i64) -> Result<Vec<Search>>;
}
