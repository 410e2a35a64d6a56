use serde::{Deserialize, Serialize};

/// Source site of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    Olx,
    Otodom,
}

impl Site {
    pub const fn base_url(self) -> &'static str {
        match self {
            Site::Olx => "https://www.olx.pl",
            Site::Otodom => "https://www.otodom.pl",
        }
    }

    /// Resolve the site owning `url` by its host prefix.
    pub fn from_url(url: &str) -> Option<Self> {
        [Site::Olx, Site::Otodom]
            .into_iter()
            .find(|site| url.starts_with(site.base_url()))
    }
}

/// An apartment-for-rent offer.
///
/// Filled in two passes: the listing page gives title, price, location, time
/// and URL; the detail page adds everything else.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Offer {
    pub title: String,
    pub price: i64,
    pub location: String,
    /// `HH:MM` in local time, empty unless the offer was posted today.
    pub time: String,
    pub url: String,
    pub additional_payment: i64,
    pub description: String,
    pub rooms: String,
    pub area: String,
    pub floor: String,
    pub images: Vec<String>,
}

impl Offer {
    /// Offers missing a title or URL are scanner leftovers and get dropped.
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() || self.url.is_empty()
    }

    pub fn posted_today(&self) -> bool {
        !self.time.is_empty()
    }

    pub fn total_price(&self) -> i64 {
        self.price.saturating_add(self.additional_payment)
    }
}

/// A subscriber's saved listing-page query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Search {
    pub id: i64,
    pub user_id: i64,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_resolves_by_host_prefix() {
        assert_eq!(Site::from_url("https://www.olx.pl/d/oferta/x.html"), Some(Site::Olx));
        assert_eq!(Site::from_url("https://www.otodom.pl/pl/oferta/y"), Some(Site::Otodom));
        assert_eq!(Site::from_url("https://example.com/x.html"), None);
    }

    #[test]
    fn offer_without_url_is_empty() {
        let offer = Offer {
            title: "Kawalerka".into(),
            ..Offer::default()
        };
        assert!(offer.is_empty());
    }

    #[test]
    fn total_price_saturates() {
        let offer = Offer {
            price: 9_000_000_000_000_000_000,
            additional_payment: 500_000_000_000_000_000,
            ..Offer::default()
        };
        assert_eq!(offer.total_price(), i64::MAX);
    }
}
