//! Splits a results page into per-card markup fragments.

use tracing::debug;

use super::profile::CardLayout;
use super::tokenizer::{Token, Tokenizer};

/// Lazily yields the inner markup of every non-featured card on `page`.
pub fn segment<'a>(page: &'a str, layout: &'a CardLayout) -> Fragments<'a> {
    Fragments {
        tokens: Tokenizer::new(page),
        layout,
    }
}

pub struct Fragments<'a> {
    tokens: Tokenizer<'a>,
    layout: &'a CardLayout,
}

impl CardLayout {
    fn is_featured(&self, markup: &str) -> bool {
        !self.featured.is_empty() && markup.contains(self.featured)
    }

    fn opens_card(&self, token: &Token) -> bool {
        let (key, value) = self.marker;
        token.is_start(self.container) && token.has_attr(key, value)
    }
}

impl Iterator for Fragments<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let layout = self.layout;
        loop {
            let opening = self.tokens.by_ref().find(|t| layout.opens_card(t))?;
            let mut featured = layout.is_featured(&opening.to_string());
            let mut depth = 0usize;
            let mut buf = String::new();
            let mut closed = false;

            for token in self.tokens.by_ref() {
                match &token {
                    Token::StartTag { name, .. } if name == layout.container => depth += 1,
                    Token::EndTag { name } if name == layout.container => {
                        if depth == 0 {
                            closed = true;
                            break;
                        }
                        depth -= 1;
                    }
                    _ => {}
                }
                let markup = token.to_string();
                featured = featured || layout.is_featured(&markup);
                buf.push_str(&markup);
            }

            if !closed {
                debug!("Dropping card cut off by end of document");
                return None;
            }
            if featured {
                debug!("Skipping featured card");
                continue;
            }
            return Some(buf);
        }
    }
}
