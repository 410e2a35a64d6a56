use anyhow::{anyhow, bail, Context, Result};
use reqwest::Url;

const OLX_RENTALS: &str = "https://www.olx.pl/nieruchomosci/mieszkania/wynajem/";

/// A city subscribers can search in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct City {
    pub name: &'static str,
    /// Slug used in listing URLs
    pub code: &'static str,
}

pub const CITIES: [City; 15] = [
    City { name: "Białystok", code: "bialystok" },
    City { name: "Bydgoszcz", code: "bydgoszcz" },
    City { name: "Gdańsk", code: "gdansk" },
    City { name: "Gdynia", code: "gdynia" },
    City { name: "Katowice", code: "katowice" },
    City { name: "Kielce", code: "kielce" },
    City { name: "Kraków", code: "krakow" },
    City { name: "Lublin", code: "lublin" },
    City { name: "Łódź", code: "lodz" },
    City { name: "Poznań", code: "poznan" },
    City { name: "Radom", code: "radom" },
    City { name: "Rzeszów", code: "rzeszow" },
    City { name: "Szczecin", code: "szczecin" },
    City { name: "Wrocław", code: "wroclaw" },
    City { name: "Warszawa", code: "warszawa" },
];

pub fn find_city(code: &str) -> Option<City> {
    CITIES.iter().copied().find(|c| c.code == code)
}

fn floor_name(code: &str) -> Option<&'static str> {
    let name = match code {
        "floor_0" => "Ground",
        "floor_1" => "First",
        "floor_2" => "Second",
        "floor_3" => "Third",
        "floor_4" => "Fourth",
        "floor_5" => "Fifth",
        "floor_6" => "Sixth",
        "floor_7" => "Seventh",
        "floor_8" => "Eighth",
        "floor_9" => "Ninth",
        "floor_10" => "Tenth",
        "floor_11" => "Above Tenth",
        "floor_17" => "Attic",
        _ => return None,
    };
    Some(name)
}

/// Search parameters a subscriber submits; zero bounds mean "no limit".
#[derive(Debug, Clone, Default)]
pub struct SearchTerm {
    pub city: String,
    pub price_min: i64,
    pub price_max: i64,
    pub area_min: i64,
    pub area_max: i64,
    /// OLX room filters: `one`, `two`, `three`, `four`
    pub rooms: Vec<String>,
}

impl SearchTerm {
    /// Newest-first OLX rentals listing URL for this search.
    pub fn create_url(&self) -> Result<String> {
        if self.city.is_empty() {
            bail!("No location specified in search term");
        }

        let mut url = format!(
            "{OLX_RENTALS}{}/q-mieszkanie/?search[order]=created_at:desc",
            self.city
        );
        let bounds = [
            ("filter_float_price:from", self.price_min),
            ("filter_float_price:to", self.price_max),
            ("filter_float_m:from", self.area_min),
            ("filter_float_m:to", self.area_max),
        ];
        for (key, value) in bounds {
            if value != 0 {
                url.push_str(&format!("&search[{key}]={value}"));
            }
        }
        for (i, room) in self.rooms.iter().enumerate() {
            url.push_str(&format!("&search[filter_enum_rooms][{i}]={room}"));
        }
        Ok(url)
    }
}

/// Parses a price range typed by a subscriber into `(min, max)`, 0 meaning unbounded.
///
/// Accepts `1000-2000`, `1000+`, `1000-`, `-2000` and a bare `2000` (a maximum).
pub fn parse_price_range(input: &str) -> Result<(i64, i64)> {
    let s = input.trim();

    if let Some(min) = s.strip_suffix('+') {
        let min: i64 = min
            .trim()
            .parse()
            .map_err(|_| anyhow!("invalid minimum price format"))?;
        if min < 0 {
            bail!("minimum price cannot be negative");
        }
        return Ok((min, 0));
    }

    if let Some(max) = s.strip_prefix('-').filter(|rest| !rest.contains('-')) {
        let max: i64 = max
            .trim()
            .parse()
            .map_err(|_| anyhow!("invalid maximum price format"))?;
        if max <= 0 {
            bail!("maximum price must be positive");
        }
        return Ok((0, max));
    }

    if let Some((lo, hi)) = s.split_once('-') {
        if hi.contains('-') {
            bail!("invalid price range format");
        }
        let min = match lo.trim() {
            "" => 0,
            lo => lo.parse().map_err(|_| anyhow!("invalid minimum price"))?,
        };
        let max = match hi.trim() {
            "" => 0,
            hi => hi.parse().map_err(|_| anyhow!("invalid maximum price"))?,
        };
        if min < 0 {
            bail!("minimum price cannot be negative");
        }
        if !hi.trim().is_empty() && max <= 0 {
            bail!("maximum price must be positive");
        }
        if min > 0 && max > 0 && min > max {
            bail!("minimum price cannot be higher than maximum price");
        }
        return Ok((min, max));
    }

    match s.parse::<i64>() {
        Ok(price) if price > 0 => Ok((0, price)),
        Ok(_) => bail!("price must be positive"),
        Err(_) => bail!("invalid price format"),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn parse_olx_search(url: &str) -> Result<(Url, String)> {
    if !url.starts_with("https://www.olx.pl") {
        bail!("Invalid URL: {url}");
    }
    let parsed = Url::parse(url).with_context(|| format!("Invalid URL: {url}"))?;
    let city = parsed
        .path_segments()
        .and_then(|mut segments| segments.nth(3))
        .filter(|city| !city.is_empty())
        .map(capitalize)
        .ok_or_else(|| anyhow!("No city in search URL: {url}"))?;
    Ok((parsed, city))
}

fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// One-line summary, e.g. `Poznan (1000-3000)`.
pub fn describe_short(url: &str) -> Result<String> {
    let (parsed, city) = parse_olx_search(url)?;
    let from = query_value(&parsed, "search[filter_float_price:from]").unwrap_or_default();
    let to = query_value(&parsed, "search[filter_float_price:to]").unwrap_or_default();
    Ok(format!("{city} ({from}-{to})"))
}

/// Multi-line summary of every filter in the search URL (HTML formatted).
pub fn describe_full(url: &str) -> Result<String> {
    let (parsed, city) = parse_olx_search(url)?;
    let mut text = format!("🏠 Full info of the search:\n\n📍 {city}\n");

    let range = |from: &str, to: &str| {
        Some(format!(
            "{}-{}",
            query_value(&parsed, from)?,
            query_value(&parsed, to)?
        ))
    };
    if let Some(price) = range("search[filter_float_price:from]", "search[filter_float_price:to]") {
        text.push_str(&format!("💰 Price: {price} zł\n"));
    }
    if let Some(area) = range("search[filter_float_m:from]", "search[filter_float_m:to]") {
        text.push_str(&format!("📐 Area: {area} m²\n"));
    }

    let mut rooms = Vec::new();
    let mut floors = Vec::new();
    for (key, value) in parsed.query_pairs() {
        if key.starts_with("search[filter_enum_rooms]") {
            rooms.push(capitalize(&value));
        } else if key.starts_with("search[filter_enum_floor_select]") {
            floors.push(floor_name(&value).unwrap_or("Unknown").to_string());
        }
    }
    if !rooms.is_empty() {
        text.push_str(&format!("🛏 Bedrooms:\n    - {}\n", rooms.join(", ")));
    }
    if !floors.is_empty() {
        text.push_str(&format!("🏢 Floors:\n    - {}\n", floors.join(", ")));
    }

    text.push_str(&format!("\n🔗 <a href=\"{url}\">Link to the search</a>"));
    Ok(text)
}
