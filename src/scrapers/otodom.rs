use crate::error::ImageError;
use crate::models::{Offer, Site};
use crate::parser::extract::extract_price;
use crate::parser::profile::DIGITS;
use crate::parser::tokenizer::{Token, Tokenizer};
use crate::scrapers::traits::DetailScraper;
use serde_json::Value;
use tracing::warn;

const DESCRIPTION_KEY: &str = "adPageAdDescription";
const IMAGES_PATH: [&str; 4] = ["props", "pageProps", "ad", "images"];

/// Labeled value cell in the offer's parameter table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableField {
    Floor,
    Rent,
    Area,
    Rooms,
}

impl TableField {
    fn from_test_id(id: &str) -> Option<Self> {
        match id {
            "table-value-floor" => Some(Self::Floor),
            "table-value-rent" => Some(Self::Rent),
            "table-value-area" => Some(Self::Area),
            "table-value-rooms_num" => Some(Self::Rooms),
            _ => None,
        }
    }

    fn apply(self, offer: &mut Offer, text: &str) {
        match self {
            Self::Floor => offer.floor = text.to_string(),
            Self::Rent => offer.additional_payment = extract_price(text, &DIGITS),
            Self::Area => offer.area = text.to_string(),
            Self::Rooms => offer.rooms = text.to_string(),
        }
    }
}

/// Walks `props → pageProps → ad → images` of the embedded page state and
/// collects every entry's `large` URL.
pub fn parse_images(json: &str) -> Result<Vec<String>, ImageError> {
    let data: Value = serde_json::from_str(json)?;
    let images = IMAGES_PATH.into_iter().try_fold(&data, |node, key| {
        node.get(key).ok_or(ImageError::MissingKey(key))
    })?;
    let entries = images
        .as_array()
        .ok_or(ImageError::MissingKey("images"))?;

    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            entry
                .get("large")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or(ImageError::MissingLarge(i))
        })
        .collect()
}

/// Detail page scanner for otodom.pl
pub struct OtodomScraper;

impl DetailScraper for OtodomScraper {
    fn site(&self) -> Site {
        Site::Otodom
    }

    fn apply(&self, html: &str, offer: &mut Offer) {
        let mut pending: Option<TableField> = None;
        let mut in_description: Option<usize> = None;
        let mut description: Vec<String> = Vec::new();
        let mut json: Option<String> = None;

        for token in Tokenizer::new(html) {
            match &token {
                Token::StartTag { name, .. } if name == "div" => {
                    if let Some(field) = token.attr("data-testid").and_then(TableField::from_test_id) {
                        pending = Some(field);
                    }
                    if let Some(depth) = in_description.as_mut() {
                        *depth += 1;
                    } else if token.has_attr("data-cy", DESCRIPTION_KEY) {
                        in_description = Some(0);
                    }
                }
                Token::EndTag { name } if name == "div" => {
                    in_description = match in_description {
                        Some(0) | None => None,
                        Some(depth) => Some(depth - 1),
                    };
                }
                Token::StartTag { name, .. }
                    if name == "script" && token.has_attr("type", "application/json") =>
                {
                    json = Some(String::new());
                }
                Token::EndTag { name } if name == "script" => {
                    if let Some(doc) = json.take() {
                        match parse_images(&doc) {
                            Ok(images) => offer.images = images,
                            Err(e) => warn!("No images for {}: {}", offer.url, e),
                        }
                    }
                }
                Token::Text(text) => {
                    if let Some(doc) = json.as_mut() {
                        doc.push_str(text);
                        continue;
                    }
                    let text = text.trim();
                    if text.is_empty() {
                        continue;
                    }
                    if let Some(field) = pending.take() {
                        field.apply(offer, text);
                    } else if in_description.is_some() {
                        description.push(text.to_string());
                    }
                }
                _ => {}
            }
        }

        if !description.is_empty() {
            offer.description = description.join("\n");
        }
    }
}
