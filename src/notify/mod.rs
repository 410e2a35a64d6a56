pub mod telegram;

pub use telegram::TelegramNotifier;

use crate::models::Offer;
use crate::parser::tokenizer::{escape_attr, escape_text};
use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

/// Delivers a rendered offer to a subscriber.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: i64, text: &str, images: &[String]) -> Result<()>;
}

#[async_trait]
impl<N: Notifier + ?Sized> Notifier for Box<N> {
    async fn notify(&self, user_id: i64, text: &str, images: &[String]) -> Result<()> {
        (**self).notify(user_id, text, images).await
    }
}

/// Logs messages instead of sending them; used when no bot token is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, user_id: i64, text: &str, images: &[String]) -> Result<()> {
        info!(
            "[dry run] offer for user {} with {} images:\n{}",
            user_id,
            images.len(),
            text
        );
        Ok(())
    }
}

/// HTML message body for an offer, title linked to the offer page.
pub fn render_offer(offer: &Offer) -> String {
    let mut text = format!(
        "<a href=\"{}\">{}</a>\n\n📍 {}\n💵 {} zł",
        escape_attr(&offer.url),
        escape_text(&offer.title),
        escape_text(&offer.location),
        offer.total_price()
    );
    if offer.additional_payment != 0 {
        text.push_str(&format!(" ({} + {})", offer.price, offer.additional_payment));
    }
    text.push('\n');

    for (icon, value) in [("📐", &offer.area), ("🛏", &offer.rooms), ("🏢", &offer.floor)] {
        if !value.is_empty() {
            text.push_str(&format!("{icon} {}\n", escape_text(value)));
        }
    }

    text.push_str(&format!("\n📅 Dzisiaj o {}\n", offer.time));
    text
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Notifier;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[derive(Debug, Clone, PartialEq)]
    pub struct Sent {
        pub user_id: i64,
        pub text: String,
        pub images: Vec<String>,
        pub at: Instant,
    }

    /// Records every notification; fails all of them when `failing` is set.
    #[derive(Default)]
    pub struct RecordingNotifier {
        sent: Mutex<Vec<Sent>>,
        failing: bool,
    }

    impl RecordingNotifier {
        pub fn failing() -> Self {
            Self {
                failing: true,
                ..Self::default()
            }
        }

        pub fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, user_id: i64, text: &str, images: &[String]) -> Result<()> {
            self.sent.lock().unwrap().push(Sent {
                user_id,
                text: text.to_string(),
                images: images.to_vec(),
                at: Instant::now(),
            });
            if self.failing {
                bail!("transport down");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_all_fields() {
        let offer = Offer {
            title: "Kawalerka <nowa> & tania".into(),
            price: 1700,
            additional_payment: 400,
            location: "Szczecin, Gumieńce".into(),
            time: "16:30".into(),
            url: "https://www.olx.pl/d/oferta/x.html".into(),
            area: "Powierzchnia: 28 m²".into(),
            rooms: "Liczba pokoi: 1 pokój".into(),
            floor: "Poziom: 2".into(),
            ..Offer::default()
        };
        assert_eq!(
            render_offer(&offer),
            "<a href=\"https://www.olx.pl/d/oferta/x.html\">Kawalerka &lt;nowa&gt; &amp; tania</a>\n\n\
             📍 Szczecin, Gumieńce\n\
             💵 2100 zł (1700 + 400)\n\
             📐 Powierzchnia: 28 m²\n\
             🛏 Liczba pokoi: 1 pokój\n\
             🏢 Poziom: 2\n\
             \n📅 Dzisiaj o 16:30\n"
        );
    }

    #[test]
    fn huge_prices_do_not_overflow() {
        let offer = Offer {
            title: "Apartament".into(),
            price: 9_000_000_000_000_000_000,
            additional_payment: 500_000_000_000_000_000,
            url: "https://www.olx.pl/d/oferta/z.html".into(),
            ..Offer::default()
        };
        assert!(render_offer(&offer).contains(&format!("💵 {} zł", i64::MAX)));
    }

    #[test]
    fn omits_missing_fields() {
        let offer = Offer {
            title: "Pokój".into(),
            price: 900,
            location: "Łódź".into(),
            time: "09:05".into(),
            url: "https://www.olx.pl/d/oferta/y.html".into(),
            ..Offer::default()
        };
        assert_eq!(
            render_offer(&offer),
            "<a href=\"https://www.olx.pl/d/oferta/y.html\">Pokój</a>\n\n📍 Łódź\n💵 900 zł\n\n📅 Dzisiaj o 09:05\n"
        );
    }
}
