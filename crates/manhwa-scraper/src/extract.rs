//! Extraction utilities shared by all adapters.
//!
//! Structural queries return `Result<Option<_>, ParseError>`: a locator that
//! does not compile is a failure, a locator that matches nothing is merely an
//! absent value the caller replaces with a default.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use shared::{MangaStatus, ParseError};

static CHAPTER_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)chapter[^\d]*(\d+(?:\.\d+)?)").expect("chapter number pattern"));

static DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("decimal pattern"));

static COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d[\d,]*(?:\.\d+)?)\s*([kmb])?\b").expect("count pattern"));

fn selector(locator: &str) -> Result<Selector, ParseError> {
    Selector::parse(locator).map_err(|e| ParseError::new(format!("locator `{}`", locator), format!("{:?}", e)))
}

/// Parsed markup of one fetched page
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
        }
    }

    /// First node matching `locator`
    pub fn select_one(&self, locator: &str) -> Result<Option<Node<'_>>, ParseError> {
        let selector = selector(locator)?;
        let found = self.html.select(&selector).next().map(Node);
        Ok(found)
    }

    /// All nodes matching `locator`, in document order
    pub fn select_all(&self, locator: &str) -> Result<Vec<Node<'_>>, ParseError> {
        let selector = selector(locator)?;
        let found = self.html.select(&selector).map(Node).collect();
        Ok(found)
    }
}

/// A matched element
#[derive(Clone, Copy)]
pub struct Node<'a>(ElementRef<'a>);

impl<'a> Node<'a> {
    pub fn select_one(&self, locator: &str) -> Result<Option<Node<'a>>, ParseError> {
        let selector = selector(locator)?;
        let found = self.0.select(&selector).next().map(Node);
        Ok(found)
    }

    pub fn select_all(&self, locator: &str) -> Result<Vec<Node<'a>>, ParseError> {
        let selector = selector(locator)?;
        let found = self.0.select(&selector).map(Node).collect();
        Ok(found)
    }

    /// Attribute value, trimmed; empty values count as absent
    pub fn attr(&self, name: &str) -> Option<String> {
        self.0
            .value()
            .attr(name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    /// First present attribute out of `names`
    pub fn first_attr(&self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|name| self.attr(name))
    }

    /// Text content with every fragment trimmed and joined by single spaces
    pub fn text(&self) -> String {
        self.0
            .text()
            .map(str::trim)
            .filter(|fragment| !fragment.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn text_opt(&self) -> Option<String> {
        Some(self.text()).filter(|text| !text.is_empty())
    }
}

/// Turn an absent node the operation cannot do without into a failure
pub fn require<T>(value: Option<T>, context: &str) -> Result<T, ParseError> {
    value.ok_or_else(|| ParseError::new(context, "expected node not found"))
}

/// Text of the first node matching `locator` under `node`, if any
pub fn text_of(node: &Node<'_>, locator: &str) -> Result<Option<String>, ParseError> {
    Ok(node.select_one(locator)?.and_then(|found| found.text_opt()))
}

/// Apply a source-specific pattern to pull an id out of a URL.
///
/// Returns the URL unchanged when the pattern does not match.
pub fn extract_identifier_from_url(url: &str, pattern: &Regex) -> String {
    pattern
        .captures(url)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| url.to_string())
}

/// Number following the word "chapter", or 0.0 when there is none.
///
/// 0.0 is ambiguous with a genuine chapter 0.
pub fn extract_chapter_number(text: &str) -> f64 {
    CHAPTER_NUMBER
        .captures(text)
        .and_then(|captures| captures.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0.0)
}

/// Chapter number from a label, trying `fallback` (a chapter id or URL) when the label has none
pub fn chapter_number_or(label: Option<&str>, fallback: &str) -> f64 {
    match label.map(extract_chapter_number) {
        Some(number) if number > 0.0 => number,
        _ => extract_chapter_number(fallback),
    }
}

/// Map free-text status to the canonical enum, defaulting to ongoing
pub fn normalize_status(text: &str) -> MangaStatus {
    let lower = text.to_lowercase();
    if lower.contains("ongoing") {
        MangaStatus::Ongoing
    } else if lower.contains("completed") {
        MangaStatus::Completed
    } else if lower.contains("hiatus") {
        MangaStatus::Hiatus
    } else {
        MangaStatus::Ongoing
    }
}

/// First decimal number in `text`, e.g. a rating
pub fn parse_decimal(text: &str) -> Option<f64> {
    DECIMAL.find(text).and_then(|m| m.as_str().parse().ok())
}

/// View counts such as "12,345", "1.2K" or "96.5M"
pub fn parse_count(text: &str) -> Option<u64> {
    let captures = COUNT.captures(text)?;
    let value: f64 = captures.get(1)?.as_str().replace(',', "").parse().ok()?;
    let multiplier = match captures.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(suffix) if suffix == "k" => 1_000.0,
        Some(suffix) if suffix == "m" => 1_000_000.0,
        Some(suffix) if suffix == "b" => 1_000_000_000.0,
        _ => 1.0,
    };
    Some((value * multiplier).round() as u64)
}

/// Split a list of titles separated by commas or semicolons
pub fn split_titles(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split([',', ';'])
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(str::to_string)
}
