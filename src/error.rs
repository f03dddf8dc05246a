// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Error taxonomy for the search flow.
//!
//! Every externally facing failure ends up as an [`AppError`] at the boundary
//! of the action that caused it, where it is turned into a user message.

use chrono::NaiveDate;
use thiserror::Error;

/// Rejected user input. No request is issued when one of these is raised.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a research topic.")]
    EmptyTopic,

    #[error("Invalid {field} '{value}', expected YYYY-MM-DD")]
    InvalidDate { field: &'static str, value: String },

    #[error("Unsupported language '{0}', expected one of: en, es, en,es, es,en")]
    UnknownLanguage(String),

    #[error("The end date ({end}) is before the start date ({start})")]
    InvertedRange { start: NaiveDate, end: NaiveDate },
}

/// Outcome of a failed webhook call.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Could not reach the search service: {message}")]
    Transport { message: String },

    #[error("The search took longer than {secs} seconds")]
    Timeout { secs: u64 },

    #[error("Server error ({status}): {body}")]
    Server { status: u16, body: String },

    #[error("No articles found.")]
    NoResults,

    #[error("Search client misconfigured: {0}")]
    InvalidConfig(String),
}

impl SearchError {
    /// Network level failures the user can only fix by submitting again.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport {
            message: e.to_string(),
        }
    }
}

/// History store failures. Never fatal to the search that triggered them.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Query failed: {0}")]
    Query(String),

    #[error("Corrupt result snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("No stored search with id {0}")]
    NotFound(i64),

    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("CSV generation failed: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<printpdf::Error> for ReportError {
    fn from(e: printpdf::Error) -> Self {
        Self::Pdf(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self::Figment(Box::new(e))
    }
}

/// Umbrella error for a single user action.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("A search is already running for this session")]
    Busy,

    #[error("There are no results to export")]
    NothingDisplayed,

    #[error("Search history is not configured")]
    HistoryDisabled,
}

impl AppError {
    /// Stable label the page uses to pick how a message is shown.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Search(SearchError::Timeout { .. }) => "timeout",
            Self::Search(SearchError::Transport { .. }) => "transport",
            Self::Search(SearchError::Server { .. }) => "server",
            Self::Search(SearchError::NoResults) => "no_results",
            Self::Search(SearchError::InvalidConfig(_)) => "config",
            Self::Store(StoreError::NotFound(_)) => "not_found",
            Self::Store(_) => "store",
            Self::Report(_) => "report",
            Self::Busy => "busy",
            Self::NothingDisplayed => "not_found",
            Self::HistoryDisabled => "history_disabled",
        }
    }

    /// Text shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Search(SearchError::Timeout { .. }) => {
                "The search took too long. Try narrowing the date range.".to_string()
            }
            Self::Search(e @ SearchError::Transport { .. }) => {
                format!("Error searching articles: {e}")
            }
            Self::Store(e) => format!("Could not access search history: {e}"),
            other => other.to_string(),
        }
    }

    /// HTTP status used when the error is returned from an endpoint.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Search(SearchError::NoResults) => 200,
            Self::Search(SearchError::Timeout { .. }) => 504,
            Self::Search(_) => 502,
            Self::Store(StoreError::NotFound(_)) | Self::NothingDisplayed => 404,
            Self::Store(_) | Self::Report(_) => 500,
            Self::Busy => 409,
            Self::HistoryDisabled => 503,
        }
    }
}
