use crate::models::{Offer, Site};
use crate::parser::extract::extract_price;
use crate::parser::profile::DIGITS;
use crate::parser::tokenizer::{Token, Tokenizer};
use crate::scrapers::traits::DetailScraper;

const DESCRIPTION_CLASS: &str = "css-1t507yq";
const TAG_CLASS: &str = "css-b5m1rv";
const IMAGE_CLASS: &str = "css-1bmvjcs";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagField {
    Surcharge,
    Rooms,
    Area,
    Floor,
}

const TAG_PREFIXES: [(&str, TagField); 4] = [
    ("Czynsz", TagField::Surcharge),
    ("Liczba pokoi", TagField::Rooms),
    ("Powierzchnia", TagField::Area),
    ("Poziom", TagField::Floor),
];

/// One "tags" paragraph, e.g. `Liczba pokoi: 2 pokoje`.
#[derive(Default)]
struct TagLine {
    field: Option<TagField>,
    text: String,
}

impl TagLine {
    fn push(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if self.text.is_empty() {
            self.field = TAG_PREFIXES
                .iter()
                .find(|(prefix, _)| text.starts_with(prefix))
                .map(|&(_, field)| field);
        } else {
            self.text.push(' ');
        }
        self.text.push_str(text);
    }

    fn apply(self, offer: &mut Offer) {
        match self.field {
            Some(TagField::Surcharge) => offer.additional_payment = parse_surcharge(&self.text),
            Some(TagField::Rooms) => offer.rooms = self.text,
            Some(TagField::Area) => offer.area = self.text,
            Some(TagField::Floor) => offer.floor = self.text,
            None => {}
        }
    }
}

/// `"Czynsz (dodatkowo): 1 050 zł"` → 1050. Decimals are dropped, garbage gives 0.
fn parse_surcharge(text: &str) -> i64 {
    let value = text.split_once(':').map_or(text, |(_, value)| value);
    let whole = value.split([',', '.']).next().unwrap_or_default();
    extract_price(whole, &DIGITS)
}

/// Detail page scanner for olx.pl
pub struct OlxScraper;

impl DetailScraper for OlxScraper {
    fn site(&self) -> Site {
        Site::Olx
    }

    fn apply(&self, html: &str, offer: &mut Offer) {
        let mut description = String::new();
        // Nesting depth inside the description container, if we are in it.
        let mut in_description: Option<usize> = None;
        let mut tag_line: Option<TagLine> = None;

        for token in Tokenizer::new(html) {
            match &token {
                Token::StartTag { name, .. } if name == "div" => {
                    if let Some(depth) = in_description.as_mut() {
                        *depth += 1;
                    } else if token.has_class(DESCRIPTION_CLASS) {
                        in_description = Some(0);
                    }
                }
                Token::EndTag { name } if name == "div" => {
                    in_description = match in_description {
                        Some(0) | None => None,
                        Some(depth) => Some(depth - 1),
                    };
                }
                Token::StartTag { name, .. } if name == "p" && token.has_class(TAG_CLASS) => {
                    tag_line = Some(TagLine::default());
                }
                Token::EndTag { name } if name == "p" => {
                    if let Some(line) = tag_line.take() {
                        line.apply(offer);
                    }
                }
                Token::StartTag { name, .. } | Token::SelfClosingTag { name, .. }
                    if name == "br" && in_description.is_some() =>
                {
                    description.push('\n');
                }
                Token::Text(text) => {
                    if in_description.is_some() {
                        description.push_str(text);
                    } else if let Some(line) = tag_line.as_mut() {
                        line.push(text);
                    }
                }
                _ if token.is_open("img") && token.has_class(IMAGE_CLASS) => {
                    if let Some(src) = token.attr("src").filter(|s| !s.is_empty()) {
                        offer.images.push(src.to_string());
                    }
                }
                _ => {}
            }
        }

        let description = description.trim();
        if !description.is_empty() {
            offer.description = description.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <div class="swiper">
          <img class="css-1bmvjcs" src="https://ireland.apollo.olxcdn.com/v1/files/a/image;s=1000x700"/>
          <img class="css-1bmvjcs" src="https://ireland.apollo.olxcdn.com/v1/files/b/image;s=1000x700"/>
          <img class="avatar" src="https://example.com/avatar.png"/>
        </div>
        <ul>
          <li><p class="css-b5m1rv er34gjf0"><span>Prywatne</span></p></li>
          <li><p class="css-b5m1rv er34gjf0">Poziom: 3</p></li>
          <li><p class="css-b5m1rv er34gjf0">Umeblowane: Tak</p></li>
          <li><p class="css-b5m1rv er34gjf0">Powierzchnia: 38 m²</p></li>
          <li><p class="css-b5m1rv er34gjf0">Liczba pokoi: <span>2 pokoje</span></p></li>
          <li><p class="css-b5m1rv er34gjf0">Czynsz (dodatkowo): 1 050 zł</p></li>
        </ul>
        <div class="css-1t507yq er34gjf0">Mieszkanie po remoncie.<br/>Blisko <b>tramwaju</b>.<div>Bez zwierząt.</div></div>
        <div class="footer">Kontakt</div>
    </body></html>"#;

    #[test]
    fn fills_detail_fields() {
        let mut offer = Offer {
            title: "Kawalerka".into(),
            url: "https://www.olx.pl/d/oferta/x.html".into(),
            ..Offer::default()
        };
        OlxScraper.apply(PAGE, &mut offer);

        assert_eq!(offer.floor, "Poziom: 3");
        assert_eq!(offer.area, "Powierzchnia: 38 m²");
        assert_eq!(offer.rooms, "Liczba pokoi: 2 pokoje");
        assert_eq!(offer.additional_payment, 1050);
        assert_eq!(
            offer.description,
            "Mieszkanie po remoncie.\nBlisko tramwaju.Bez zwierząt."
        );
        assert_eq!(offer.images.len(), 2);
        assert!(offer.images[0].contains("/files/a/"));
        assert_eq!(offer.title, "Kawalerka");
    }

    #[test]
    fn surcharge_parsing() {
        assert_eq!(parse_surcharge("Czynsz (dodatkowo): 500 zł"), 500);
        assert_eq!(parse_surcharge("Czynsz (dodatkowo): 1\u{a0}200,50 zł"), 1200);
        assert_eq!(parse_surcharge("Czynsz (dodatkowo): brak"), 0);
    }

    #[test]
    fn page_without_markers_leaves_offer_alone() {
        let mut offer = Offer {
            title: "X".into(),
            description: "kept".into(),
            ..Offer::default()
        };
        let before = offer.clone();
        OlxScraper.apply("<html><p>nothing here</p></html>", &mut offer);
        assert_eq!(offer, before);
    }
}
