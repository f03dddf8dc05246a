// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Turns the loosely typed records returned by the webhook into
//! [`ArticleRecord`]s.
//!
//! This is the only place field defaults are decided. Display, statistics and
//! exports all read the normalised fields directly.

use std::sync::OnceLock;

use regex::Regex;
use scraper::Html;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

pub const UNSPECIFIED: &str = "unspecified";
pub const NOT_AVAILABLE: &str = "not available";
pub const NO_SUMMARY: &str = "No summary available";
pub const NO_YEAR: &str = "N/A";

// Spanish keys come first, they are what the search workflow emits.
const TITLE_KEYS: &[&str] = &["titulo", "título", "title"];
const AUTHOR_KEYS: &[&str] = &["autores", "authors", "author"];
const YEAR_KEYS: &[&str] = &["año", "anio", "year"];
const SOURCE_KEYS: &[&str] = &["fuente", "source"];
const VENUE_KEYS: &[&str] = &["revista", "venue", "journal"];
const OBJECTIVE_KEYS: &[&str] = &["objetivo", "objective"];
const METHODOLOGY_KEYS: &[&str] = &["metodologia", "metodología", "methodology"];
const KEYWORD_KEYS: &[&str] = &["palabras_clave", "keywords"];
const SUMMARY_KEYS: &[&str] = &["resumen", "summary", "abstract"];
const URL_KEYS: &[&str] = &["url", "enlace", "link"];
const DOI_KEYS: &[&str] = &["doi", "DOI"];

/// A normalised article. Every field is present; `title` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    pub authors: String,
    /// Year as received, for display.
    pub year: String,
    /// Numeric year, `None` when `year` is not a number.
    pub year_value: Option<i32>,
    pub source: String,
    pub venue: String,
    pub objective: String,
    pub methodology: String,
    /// Comma separated.
    pub keywords: String,
    pub summary: String,
    pub url: String,
    pub doi: String,
}

impl ArticleRecord {
    /// A record holding only a title, every other field defaulted.
    pub fn with_title(title: &str) -> Self {
        Self {
            title: title.to_string(),
            authors: UNSPECIFIED.to_string(),
            year: NO_YEAR.to_string(),
            year_value: None,
            source: String::new(),
            venue: NOT_AVAILABLE.to_string(),
            objective: NOT_AVAILABLE.to_string(),
            methodology: NOT_AVAILABLE.to_string(),
            keywords: String::new(),
            summary: NO_SUMMARY.to_string(),
            url: String::new(),
            doi: String::new(),
        }
    }

    /// Summary cut to `max_chars` characters for display.
    pub fn summary_preview(&self, max_chars: usize) -> String {
        truncate_chars(&self.summary, max_chars)
    }

    /// Link to the article: the URL if it is http(s), otherwise the DOI
    /// resolver. Other schemes are never linked.
    pub fn link(&self) -> Option<String> {
        if is_web_url(&self.url) {
            Some(self.url.clone())
        } else if !self.doi.is_empty() {
            Some(format!("https://doi.org/{}", self.doi))
        } else {
            None
        }
    }

    fn from_object(obj: &Map<String, Value>) -> Option<Self> {
        let title = pick(obj, TITLE_KEYS).map(|t| strip_markup(&t))?;
        if title.is_empty() {
            return None;
        }

        let mut record = Self::with_title(&title);
        if let Some(authors) = pick(obj, AUTHOR_KEYS) {
            record.authors = authors;
        }
        if let Some(year) = pick(obj, YEAR_KEYS) {
            record.year_value = parse_year(&year);
            record.year = year;
        }
        if let Some(source) = pick(obj, SOURCE_KEYS) {
            record.source = source;
        }
        if let Some(venue) = pick(obj, VENUE_KEYS) {
            record.venue = venue;
        }
        if let Some(objective) = pick(obj, OBJECTIVE_KEYS) {
            record.objective = objective;
        }
        if let Some(methodology) = pick(obj, METHODOLOGY_KEYS) {
            record.methodology = methodology;
        }
        if let Some(keywords) = pick(obj, KEYWORD_KEYS) {
            record.keywords = keywords;
        }
        if let Some(summary) = pick(obj, SUMMARY_KEYS).map(|s| strip_markup(&s)) {
            if !summary.is_empty() {
                record.summary = summary;
            }
        }
        if let Some(url) = pick(obj, URL_KEYS) {
            record.url = url;
        }
        record.doi = pick(obj, DOI_KEYS)
            .and_then(|d| extract_doi(&d))
            .or_else(|| extract_doi_from_url(&record.url))
            .unwrap_or_default();

        Some(record)
    }
}

/// Normalise raw webhook records, keeping input order.
///
/// Elements that are not objects, or have no usable title, are dropped.
pub fn normalize(raw: &[Value]) -> Vec<ArticleRecord> {
    let records: Vec<ArticleRecord> = raw
        .iter()
        .filter_map(|v| v.as_object().and_then(ArticleRecord::from_object))
        .collect();

    let dropped = raw.len() - records.len();
    if dropped > 0 {
        debug!(dropped, kept = records.len(), "dropped records without a title");
    }
    records
}

/// First non-empty value among `keys`, rendered as text.
fn pick(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .filter_map(value_to_text)
        .find(|s| !s.is_empty())
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(collapse_whitespace(s)),
        Value::Number(n) => Some(match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        }),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(value_to_text)
                .filter(|s| !s.is_empty())
                .collect();
            Some(parts.join(", "))
        }
        Value::Null | Value::Object(_) => None,
    }
}

/// Numeric year, or `None` when the text is not a whole number.
pub fn parse_year(text: &str) -> Option<i32> {
    let text = text.trim();
    if let Ok(year) = text.parse::<i32>() {
        return Some(year);
    }
    let f = text.parse::<f64>().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() <= f64::from(i32::MAX) {
        Some(f as i32)
    } else {
        None
    }
}

/// Cut `text` to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", text[..idx].trim_end()),
        None => text.to_string(),
    }
}

fn is_web_url(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    lower.starts_with("https://") || lower.starts_with("http://")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// Abstracts from CrossRef style sources arrive with JATS tags.
fn strip_markup(text: &str) -> String {
    if !text.contains('<') {
        return collapse_whitespace(text);
    }
    let fragment = Html::parse_fragment(text);
    let plain: String = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    collapse_whitespace(&plain)
}

fn doi_regex() -> &'static Regex {
    static DOI: OnceLock<Regex> = OnceLock::new();
    DOI.get_or_init(|| Regex::new(r"10\.\d{4,9}/[-._;()/:A-Za-z0-9]+").expect("valid DOI pattern"))
}

fn clean_doi(doi: &str) -> &str {
    let doi = doi.trim();
    let doi = doi
        .strip_prefix("https://doi.org/")
        .or_else(|| doi.strip_prefix("http://doi.org/"))
        .unwrap_or(doi);
    doi.strip_prefix("doi:").unwrap_or(doi).trim()
}

fn extract_doi(text: &str) -> Option<String> {
    doi_regex()
        .find(clean_doi(text))
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';']).to_string())
}

fn extract_doi_from_url(url: &str) -> Option<String> {
    let (_, tail) = url.split_once("doi.org/")?;
    extract_doi(tail)
}
