//! Single-pass HTML token scanner.
//!
//! No tree is built. The scanner walks the input once and hands out start
//! tags, end tags, self-closing tags and text, in document order. Comments,
//! doctypes and processing instructions are skipped. Anything it cannot make
//! sense of (an unterminated tag or comment) ends the stream.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    StartTag { name: String, attrs: Vec<Attribute> },
    EndTag { name: String },
    SelfClosingTag { name: String, attrs: Vec<Attribute> },
    /// Text with entities already decoded (raw for `script`/`style` bodies).
    Text(String),
}

impl Token {
    pub fn attrs(&self) -> &[Attribute] {
        match self {
            Token::StartTag { attrs, .. } | Token::SelfClosingTag { attrs, .. } => attrs,
            _ => &[],
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs()
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }

    pub fn has_attr(&self, key: &str, value: &str) -> bool {
        self.attrs().iter().any(|a| a.key == key && a.value == value)
    }

    /// True when the `class` attribute lists `class` among its tokens.
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|classes| classes.split_ascii_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Start or self-closing tag called `name`.
    pub fn is_open(&self, name: &str) -> bool {
        matches!(self,
            Token::StartTag { name: n, .. } | Token::SelfClosingTag { name: n, .. } if n == name)
    }

    pub fn is_start(&self, name: &str) -> bool {
        matches!(self, Token::StartTag { name: n, .. } if n == name)
    }
}

/// Re-serializes the token as markup. Scanning the output again yields an
/// equal token.
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::StartTag { name, attrs } | Token::SelfClosingTag { name, attrs } => {
                write!(f, "<{name}")?;
                for attr in attrs {
                    write!(f, " {}=\"{}\"", attr.key, escape_attr(&attr.value))?;
                }
                if matches!(self, Token::SelfClosingTag { .. }) {
                    f.write_str("/>")
                } else {
                    f.write_str(">")
                }
            }
            Token::EndTag { name } => write!(f, "</{name}>"),
            Token::Text(text) => f.write_str(&escape_text(text)),
        }
    }
}

/// Pull-based scanner over an in-memory document. Restart by building a new
/// one over the same text.
pub struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
    /// Set after `<script>`/`<style>`: the body up to the closing tag is one text token.
    raw_text: Option<&'static str>,
    done: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            raw_text: None,
            done: false,
        }
    }

    fn scan(&mut self) -> Option<Token> {
        loop {
            let rest = &self.src[self.pos..];
            if rest.is_empty() {
                return None;
            }

            if let Some(tag) = self.raw_text.take() {
                let end = find_ascii_ci(rest, &format!("</{tag}")).unwrap_or(rest.len());
                self.pos += end;
                if end > 0 {
                    return Some(Token::Text(rest[..end].to_string()));
                }
                continue;
            }

            if !markup_at(rest, 0) {
                let end = (1..rest.len())
                    .find(|&i| rest.is_char_boundary(i) && markup_at(rest, i))
                    .unwrap_or(rest.len());
                self.pos += end;
                return Some(Token::Text(decode_entities(&rest[..end])));
            }

            if let Some(body) = rest.strip_prefix("<!--") {
                self.pos += body.find("-->")? + 7;
                continue;
            }
            if rest.starts_with("<!") || rest.starts_with("<?") {
                self.pos += rest.find('>')? + 1;
                continue;
            }
            if rest.starts_with("</") {
                let end = rest.find('>')?;
                let name = rest[2..end]
                    .split(|c: char| c.is_ascii_whitespace())
                    .next()
                    .unwrap_or_default()
                    .to_ascii_lowercase();
                self.pos += end + 1;
                if name.is_empty() {
                    continue;
                }
                return Some(Token::EndTag { name });
            }

            let (token, len) = parse_tag(rest)?;
            self.pos += len;
            if let Token::StartTag { name, .. } = &token {
                self.raw_text = match name.as_str() {
                    "script" => Some("script"),
                    "style" => Some("style"),
                    _ => None,
                };
            }
            return Some(token);
        }
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.done {
            return None;
        }
        let token = self.scan();
        if token.is_none() {
            self.done = true;
        }
        token
    }
}

/// Does a tag, end tag, comment or declaration start at byte `i`?
fn markup_at(s: &str, i: usize) -> bool {
    let bytes = s.as_bytes();
    bytes[i] == b'<'
        && bytes
            .get(i + 1)
            .is_some_and(|&b| b.is_ascii_alphabetic() || matches!(b, b'/' | b'!' | b'?'))
}

/// Parses `<name attr=...>` at the start of `s`. Returns the token and the
/// number of bytes consumed, `None` if the tag never closes.
fn parse_tag(s: &str) -> Option<(Token, usize)> {
    let mut i = 1;
    let name_len = s[i..].find(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')?;
    let name = s[i..i + name_len].to_ascii_lowercase();
    i += name_len;

    let mut attrs = Vec::new();
    loop {
        i += leading_ws(&s[i..]);
        let c = s[i..].chars().next()?;
        match c {
            '>' => {
                return Some((Token::StartTag { name, attrs }, i + 1));
            }
            '/' => {
                if s[i + 1..].starts_with('>') {
                    return Some((Token::SelfClosingTag { name, attrs }, i + 2));
                }
                i += 1;
            }
            _ => {
                let key_len = s[i..].find(|c: char| {
                    c.is_ascii_whitespace() || matches!(c, '=' | '>' | '/')
                })?;
                if key_len == 0 {
                    i += c.len_utf8();
                    continue;
                }
                let key = s[i..i + key_len].to_ascii_lowercase();
                i += key_len;
                i += leading_ws(&s[i..]);

                let value = if let Some(after_eq) = s[i..].strip_prefix('=') {
                    i += 1 + leading_ws(after_eq);
                    let quote = s[i..].chars().next()?;
                    if quote == '"' || quote == '\'' {
                        let len = s[i + 1..].find(quote)?;
                        let value = &s[i + 1..i + 1 + len];
                        i += len + 2;
                        value
                    } else {
                        let len = s[i..]
                            .find(|c: char| c.is_ascii_whitespace() || c == '>')
                            .unwrap_or(s.len() - i);
                        let value = &s[i..i + len];
                        i += len;
                        value
                    }
                } else {
                    ""
                };
                attrs.push(Attribute {
                    key,
                    value: decode_entities(value),
                });
            }
        }
    }
}

fn leading_ws(s: &str) -> usize {
    s.len() - s.trim_start_matches(|c: char| c.is_ascii_whitespace()).len()
}

fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle.as_bytes()))
}

/// Decodes the handful of named entities listings actually use, plus numeric ones.
/// Unknown entities are left as-is.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match decode_entity(rest) {
            Some((ch, len)) => {
                out.push(ch);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(s: &str) -> Option<(char, usize)> {
    let end = s.find(';')?;
    if end > 10 {
        return None;
    }
    let body = &s[1..end];
    let ch = if let Some(num) = body.strip_prefix('#') {
        let code = match num.strip_prefix(|c| c == 'x' || c == 'X') {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        char::from_u32(code)?
    } else {
        match body {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            "nbsp" => '\u{a0}',
            _ => return None,
        }
    };
    Some((ch, end + 1))
}

pub fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

pub fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;")
}
