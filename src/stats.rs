// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Descriptive statistics over a normalised result set.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::normalize::{ArticleRecord, UNSPECIFIED};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearBin {
    pub year: i32,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermCount {
    pub term: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsSummary {
    pub total_count: usize,
    pub distinct_source_count: usize,
    pub distinct_year_count: usize,
    /// One bin per calendar year, ascending.
    pub year_histogram: Vec<YearBin>,
    pub top_keywords: Vec<TermCount>,
    pub top_authors: Vec<TermCount>,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
}

impl StatisticsSummary {
    /// Label/value pairs printed at the top of reports.
    pub fn headline(&self) -> Vec<(&'static str, String)> {
        let range = match (self.year_min, self.year_max) {
            (Some(min), Some(max)) if min == max => min.to_string(),
            (Some(min), Some(max)) => format!("{min} - {max}"),
            _ => "N/A".to_string(),
        };
        vec![
            ("Articles found", self.total_count.to_string()),
            ("Unique sources", self.distinct_source_count.to_string()),
            ("Distinct years", self.distinct_year_count.to_string()),
            ("Year range", range),
        ]
    }
}

/// Summarise `records`. `top_n` bounds the keyword and author rankings.
pub fn summarize(records: &[ArticleRecord], top_n: usize) -> StatisticsSummary {
    let sources: HashSet<&str> = records
        .iter()
        .map(|r| r.source.trim())
        .filter(|s| !s.is_empty())
        .collect();

    let mut histogram: BTreeMap<i32, usize> = BTreeMap::new();
    for year in records.iter().filter_map(|r| r.year_value) {
        *histogram.entry(year).or_default() += 1;
    }

    StatisticsSummary {
        total_count: records.len(),
        distinct_source_count: sources.len(),
        distinct_year_count: histogram.len(),
        year_min: histogram.keys().next().copied(),
        year_max: histogram.keys().next_back().copied(),
        year_histogram: histogram
            .into_iter()
            .map(|(year, count)| YearBin { year, count })
            .collect(),
        top_keywords: top_terms(records.iter().map(|r| r.keywords.as_str()), top_n),
        top_authors: top_terms(
            records
                .iter()
                .map(|r| r.authors.as_str())
                .filter(|a| *a != UNSPECIFIED),
            top_n,
        ),
    }
}

/// Frequency of comma separated tokens, most frequent first, ties in
/// first-seen order.
fn top_terms<'a>(fields: impl Iterator<Item = &'a str>, top_n: usize) -> Vec<TermCount> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for token in fields.flat_map(|f| f.split(',')).map(str::trim).filter(|t| !t.is_empty()) {
        let count = counts.entry(token).or_insert_with(|| {
            order.push(token);
            0
        });
        *count += 1;
    }

    let mut ranked: Vec<TermCount> = order
        .into_iter()
        .map(|term| TermCount {
            term: term.to_string(),
            count: counts[term],
        })
        .collect();
    // Stable sort keeps first-seen order among equal counts.
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(top_n);
    ranked
}
