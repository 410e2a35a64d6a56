//! Listing-card field extraction.
//!
//! Walks the tokens of one card, keeps track of which field the current text
//! belongs to and fills the offer. The first value seen for a field wins.

use chrono::NaiveTime;
use regex::Regex;

use super::profile::ExtractionProfile;
use super::tokenizer::{Token, Tokenizer};
use crate::models::Offer;

/// Field that text tokens are currently routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    None,
    Title,
    Price,
    LocationDate,
}

/// Next context after `token`. Only start tags switch context; a title tag
/// counts only inside a link.
pub fn transition(
    context: Context,
    token: &Token,
    in_link: bool,
    profile: &ExtractionProfile,
) -> Context {
    if !matches!(token, Token::StartTag { .. }) {
        return context;
    }
    if in_link && profile.title.matches(token) {
        Context::Title
    } else if profile.price.matches(token) {
        Context::Price
    } else if profile.location_date.matches(token) {
        Context::LocationDate
    } else {
        profile.hint_for(token).unwrap_or(context)
    }
}

/// Extracts one offer from a card fragment. A card without any link gives
/// back an empty offer, which callers drop.
pub fn extract_offer(fragment: &str, profile: &ExtractionProfile) -> Offer {
    let mut offer = Offer::default();
    let mut context = Context::None;
    let mut open_links = 0usize;

    for token in Tokenizer::new(fragment) {
        match &token {
            Token::StartTag { name, .. } => {
                context = transition(context, &token, open_links > 0, profile);
                if name == profile.link_tag {
                    open_links += 1;
                    if offer.url.is_empty() {
                        if let Some(href) = token.attr(profile.link_attr).filter(|h| !h.is_empty()) {
                            offer.url = normalize_url(href, profile.base_url);
                        }
                    }
                }
            }
            Token::EndTag { name } if name == profile.link_tag => {
                open_links = open_links.saturating_sub(1);
            }
            Token::Text(text) => assign(&mut offer, context, text.trim(), profile),
            _ => {}
        }
    }

    if offer.url.is_empty() {
        return Offer::default();
    }
    offer
}

fn assign(offer: &mut Offer, context: Context, text: &str, profile: &ExtractionProfile) {
    if text.is_empty() {
        return;
    }
    match context {
        Context::Title if offer.title.is_empty() => offer.title = text.to_string(),
        Context::Price if offer.price == 0 => {
            let price = extract_price(text, &profile.price_pattern);
            if price > 0 {
                offer.price = price;
            }
        }
        Context::LocationDate if offer.location.is_empty() => {
            let (location, time) = extract_location_and_time(text, profile);
            offer.location = location;
            offer.time = time;
        }
        _ => {}
    }
}

/// `"1 700 zł"` → 1700. Spaces (plain and non-breaking) are dropped and every
/// digit run is joined; anything unparseable is 0.
pub fn extract_price(text: &str, pattern: &Regex) -> i64 {
    let compact: String = text
        .chars()
        .filter(|&c| c != ' ' && c != '\u{a0}')
        .collect();
    let digits: String = pattern.find_iter(&compact).map(|m| m.as_str()).collect();
    digits.parse().unwrap_or(0)
}

/// Splits `"Szczecin, Gumieńce - Dzisiaj o 14:30"` into location and local
/// posting time. The time stays empty unless the date part says "today".
pub fn extract_location_and_time(text: &str, profile: &ExtractionProfile) -> (String, String) {
    let Some((location, date)) = text.rsplit_once(" - ") else {
        return (text.trim().to_string(), String::new());
    };
    let location = location.trim().to_string();
    if !date.contains(profile.today) {
        return (location, String::new());
    }

    let time = profile
        .time_pattern
        .find(date)
        .and_then(|m| NaiveTime::parse_from_str(m.as_str(), "%H:%M").ok())
        .map(|t| {
            let (local, _) = t.overflowing_add_signed(profile.clock_offset);
            local.format("%H:%M").to_string()
        })
        .unwrap_or_default();
    (location, time)
}

/// Makes a link absolute against `base` (scheme + host, no trailing slash needed).
pub fn normalize_url(href: &str, base: &str) -> String {
    let base = base.trim_end_matches('/');
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if let Some(rest) = href.strip_prefix("//") {
        format!("https://{rest}")
    } else if href.starts_with('/') {
        format!("{base}{href}")
    } else {
        format!("{base}/{href}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Site;
    use crate::parser::profile::{CardLayout, Selector};
    use chrono::Duration;

    const CARD: &str = r#"<div data-cy="l-card" data-testid="l-card" class="css-1sw7q4x">
		<div class="css-1apmciz">
			<div data-cy="ad-card-title" class="css-u2ayx9">
				<a class="css-1tqlkj0" href="/d/oferta/wynajme-kawalerke-na-osiedlu-przy-ul-cukrowej-w-szczecinie-CID3-ID16SdDt.html">
					<h4 class="css-1g61gc2">Wynajmę kawalerkę na osiedlu przy ul. Cukrowej w Szczecinie</h4>
				</a>
				<p data-testid="ad-price" class="css-uj7mm0">1 700 zł<span class="css-18rym86"></span></p>
			</div>
			<div class="css-odp1qd">
				<p data-testid="location-date" class="css-vbz67q">Szczecin, Gumieńce - Dzisiaj o 14:30</p>
			</div>
		</div>
	</div>"#;

    #[test]
    fn extracts_olx_card() {
        let offer = extract_offer(CARD, &ExtractionProfile::olx());
        assert_eq!(
            offer.title,
            "Wynajmę kawalerkę na osiedlu przy ul. Cukrowej w Szczecinie"
        );
        assert_eq!(offer.price, 1700);
        assert_eq!(offer.location, "Szczecin, Gumieńce");
        assert_eq!(offer.time, "16:30");
        assert_eq!(
            offer.url,
            "https://www.olx.pl/d/oferta/wynajme-kawalerke-na-osiedlu-przy-ul-cukrowej-w-szczecinie-CID3-ID16SdDt.html"
        );
    }

    #[test]
    fn custom_profile() {
        let profile = ExtractionProfile {
            site: Site::Olx,
            cards: CardLayout {
                container: "div",
                marker: ("class", "card"),
                featured: "",
            },
            title: Selector::tag("h3"),
            price: Selector::with_attr("span", "class", "price"),
            location_date: Selector::with_attr("div", "class", "location"),
            link_tag: "a",
            link_attr: "href",
            hints: Vec::new(),
            price_pattern: Regex::new(r"\d+").unwrap(),
            time_pattern: Regex::new(r"\d{2}:\d{2}").unwrap(),
            today: "Today",
            base_url: "https://example.com",
            clock_offset: Duration::zero(),
        };
        let html = r#"<div>
            <a href="/offer/123"><h3>Test Apartment</h3></a>
            <span class="price">2500 PLN</span>
            <div class="location">Warsaw - Today at 10:00</div>
        </div>"#;

        let offer = extract_offer(html, &profile);
        assert_eq!(offer.title, "Test Apartment");
        assert_eq!(offer.price, 2500);
        assert_eq!(offer.location, "Warsaw");
        assert_eq!(offer.time, "10:00");
        assert_eq!(offer.url, "https://example.com/offer/123");
    }

    #[test]
    fn card_without_link_is_empty() {
        let html = r#"<h4>No link</h4><p data-testid="ad-price">1 000 zł</p>"#;
        assert_eq!(extract_offer(html, &ExtractionProfile::olx()), Offer::default());

        let html = r#"<a class="x"><h4>Link without href</h4></a>"#;
        assert!(extract_offer(html, &ExtractionProfile::olx()).is_empty());
    }

    #[test]
    fn title_outside_link_is_ignored_and_first_title_wins() {
        let html = r#"<h4>Not a title</h4>
            <a href="/d/1.html"><h4>Real</h4></a>
            <a href="/d/2.html"><h4>Second</h4></a>"#;
        let offer = extract_offer(html, &ExtractionProfile::olx());
        assert_eq!(offer.title, "Real");
        assert_eq!(offer.url, "https://www.olx.pl/d/1.html");
    }

    #[test]
    fn hint_attribute_sets_context() {
        let html = r#"<a href="/pl/oferta/abc"><p data-cy="listing-item-title">Dwa pokoje</p></a>
            <div data-testid="listing-item-price">3 200 zł/mc</div>
            <span data-testid="listing-item-date">Mokotów - Dzisiaj 09:15</span>"#;
        let offer = extract_offer(html, &ExtractionProfile::otodom());
        assert_eq!(offer.title, "Dwa pokoje");
        assert_eq!(offer.price, 3200);
        assert_eq!(offer.location, "Mokotów");
        assert_eq!(offer.time, "11:15");
        assert_eq!(offer.url, "https://www.otodom.pl/pl/oferta/abc");
    }

    #[test]
    fn transition_ignores_non_start_tags() {
        let profile = ExtractionProfile::olx();
        let end = Token::EndTag { name: "p".into() };
        assert_eq!(transition(Context::Price, &end, false, &profile), Context::Price);
        let text = Token::Text("x".into());
        assert_eq!(transition(Context::Title, &text, true, &profile), Context::Title);

        let h4 = Tokenizer::new("<h4>").next().unwrap();
        assert_eq!(transition(Context::None, &h4, false, &profile), Context::None);
        assert_eq!(transition(Context::None, &h4, true, &profile), Context::Title);
    }

    #[test]
    fn price_normalization() {
        let digits = Regex::new(r"\d+").unwrap();
        assert_eq!(extract_price("1500 zł", &digits), 1500);
        assert_eq!(extract_price("1 700 zł", &digits), 1700);
        assert_eq!(extract_price("2\u{a0}000 PLN", &digits), 2000);
        assert_eq!(extract_price("Price: 3000 zł/month", &digits), 3000);
        assert_eq!(extract_price("Contact for price", &digits), 0);
    }

    #[test]
    fn zero_price_is_not_recorded() {
        let html = r#"<a href="/d/x.html"><h4>Free</h4></a>
            <p data-testid="ad-price">Zamienię</p>"#;
        assert_eq!(extract_offer(html, &ExtractionProfile::olx()).price, 0);
    }

    #[test]
    fn location_and_time() {
        let profile = ExtractionProfile::olx();
        assert_eq!(
            extract_location_and_time("Warszawa, Mokotów - Dzisiaj o 14:30", &profile),
            ("Warszawa, Mokotów".to_string(), "16:30".to_string())
        );
        assert_eq!(
            extract_location_and_time("Kraków - 02 sierpnia 2025", &profile),
            ("Kraków".to_string(), String::new())
        );
        assert_eq!(
            extract_location_and_time("Gdańsk", &profile),
            ("Gdańsk".to_string(), String::new())
        );
    }

    #[test]
    fn location_may_contain_separator() {
        let profile = ExtractionProfile::olx();
        assert_eq!(
            extract_location_and_time("Warszawa, Bielany - Chomiczówka - Dzisiaj o 14:30", &profile),
            ("Warszawa, Bielany - Chomiczówka".to_string(), "16:30".to_string())
        );
    }

    #[test]
    fn clock_offset_wraps_past_midnight() {
        let profile = ExtractionProfile::olx();
        let (_, time) = extract_location_and_time("Łódź - Dzisiaj o 23:10", &profile);
        assert_eq!(time, "01:10");
    }

    #[test]
    fn url_normalization() {
        let base = "https://example.com";
        assert_eq!(
            normalize_url("/d/oferta/x.html", base),
            "https://example.com/d/oferta/x.html"
        );
        assert_eq!(
            normalize_url("https://example.com/x.html", base),
            "https://example.com/x.html"
        );
        assert_eq!(normalize_url("x.html", base), "https://example.com/x.html");
        assert_eq!(
            normalize_url("//cdn.example.com/a.jpg", base),
            "https://cdn.example.com/a.jpg"
        );
    }
}
