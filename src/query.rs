// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

// Builds the webhook payload from what the user typed in the form.

use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ValidationError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Languages the search workflow understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    English,
    Spanish,
    #[default]
    EnglishSpanish,
    SpanishEnglish,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::EnglishSpanish,
        Language::English,
        Language::Spanish,
        Language::SpanishEnglish,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Spanish => "es",
            Self::EnglishSpanish => "en,es",
            Self::SpanishEnglish => "es,en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        Self::ALL
            .into_iter()
            .find(|lang| lang.as_str() == compact.to_ascii_lowercase())
            .ok_or_else(|| ValidationError::UnknownLanguage(s.to_string()))
    }
}

impl Serialize for Language {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Raw form input, exactly as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchForm {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// A validated search. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRequest {
    topic: String,
    #[serde(serialize_with = "serialize_date")]
    start_date: NaiveDate,
    #[serde(serialize_with = "serialize_date")]
    end_date: NaiveDate,
    language: Language,
}

impl SearchRequest {
    pub fn new(
        topic: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        language: Language,
    ) -> Result<Self, ValidationError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ValidationError::EmptyTopic);
        }
        if end_date < start_date {
            return Err(ValidationError::InvertedRange {
                start: start_date,
                end: end_date,
            });
        }
        Ok(Self {
            topic: topic.to_string(),
            start_date,
            end_date,
            language,
        })
    }

    /// Validate a submitted form. Missing dates fall back to the page
    /// defaults (2020-01-01 through today) and a missing language to `en,es`.
    pub fn from_form(form: &SearchForm) -> Result<Self, ValidationError> {
        // Topic first: an empty topic is the only thing the user sees.
        if form.topic.trim().is_empty() {
            return Err(ValidationError::EmptyTopic);
        }
        let start_date = match non_blank(form.start_date.as_deref()) {
            Some(s) => parse_date("start date", s)?,
            None => default_start_date(),
        };
        let end_date = match non_blank(form.end_date.as_deref()) {
            Some(s) => parse_date("end date", s)?,
            None => Local::now().date_naive(),
        };
        let language = match non_blank(form.language.as_deref()) {
            Some(s) => s.parse()?,
            None => Language::default(),
        };
        Self::new(&form.topic, start_date, end_date, language)
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// `YYYY-MM-DD / YYYY-MM-DD`, as shown in the history list.
    pub fn date_range(&self) -> String {
        format!(
            "{} / {}",
            self.start_date.format(DATE_FORMAT),
            self.end_date.format(DATE_FORMAT)
        )
    }
}

pub fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default()
}

pub fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| ValidationError::InvalidDate {
        field,
        value: value.to_string(),
    })
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.trim().is_empty())
}

fn serialize_date<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&date.format(DATE_FORMAT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case("en", Language::English)]
    #[case("es", Language::Spanish)]
    #[case("en,es", Language::EnglishSpanish)]
    #[case("es, en", Language::SpanishEnglish)]
    #[case("EN", Language::English)]
    fn parses_languages(#[case] input: &str, #[case] expected: Language) {
        assert_eq!(input.parse::<Language>().unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_language() {
        assert_eq!(
            "fr".parse::<Language>(),
            Err(ValidationError::UnknownLanguage("fr".into()))
        );
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn blank_topic_is_rejected(#[case] topic: &str) {
        let form = SearchForm {
            topic: topic.into(),
            start_date: Some("not a date".into()),
            ..Default::default()
        };
        assert_eq!(SearchRequest::from_form(&form), Err(ValidationError::EmptyTopic));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = SearchRequest::new("rust", date(2024, 5, 1), date(2023, 1, 1), Language::English)
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvertedRange { .. }));
    }

    #[test]
    fn bad_date_names_the_field() {
        let form = SearchForm {
            topic: "rust".into(),
            start_date: Some("2024/01/01".into()),
            ..Default::default()
        };
        assert_eq!(
            SearchRequest::from_form(&form),
            Err(ValidationError::InvalidDate {
                field: "start date",
                value: "2024/01/01".into()
            })
        );
    }

    #[test]
    fn payload_shape() {
        let req = SearchRequest::new(
            "  machine learning ",
            date(2020, 1, 1),
            date(2024, 12, 31),
            Language::EnglishSpanish,
        )
        .unwrap();
        let payload = serde_json::to_value(&req).unwrap();
        assert_eq!(
            payload,
            serde_json::json!({
                "topic": "machine learning",
                "start_date": "2020-01-01",
                "end_date": "2024-12-31",
                "language": "en,es"
            })
        );
        assert_eq!(req.date_range(), "2020-01-01 / 2024-12-31");
    }

    #[test]
    fn form_defaults() {
        let form = SearchForm {
            topic: "soil".into(),
            ..Default::default()
        };
        let req = SearchRequest::from_form(&form).unwrap();
        assert_eq!(req.start_date(), date(2020, 1, 1));
        assert_eq!(req.language(), Language::EnglishSpanish);
    }
}
