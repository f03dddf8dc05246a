// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! User actions: search, browse history, export.
//!
//! Each action runs to completion for the session that triggered it and
//! reports failures as an [`AppError`]; nothing here panics on bad input.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::client::{ArticleSearch, WebhookClient};
use crate::config::{AppConfig, ReportConfig};
use crate::error::{AppError, ReportError, SearchError};
use crate::history::{HistoryStore, SearchHistory, SearchLogEntry};
use crate::normalize::{normalize, ArticleRecord};
use crate::query::{SearchForm, SearchRequest};
use crate::report::{build_csv, build_report, download_name};
use crate::session::{Displayed, Session};
use crate::stats::{summarize, StatisticsSummary};

/// An article as shown on a result card.
#[derive(Debug, Serialize)]
pub struct RecordCard {
    #[serde(flatten)]
    pub record: ArticleRecord,
    pub link: Option<String>,
}

/// What the page renders after a search or a history reload.
#[derive(Debug, Serialize)]
pub struct SearchView {
    pub status: &'static str,
    pub message: String,
    pub topic: String,
    pub records: Vec<RecordCard>,
    pub summary: StatisticsSummary,
    pub history_id: Option<i64>,
    /// Set when the results could not be stored. The results are still shown.
    pub store_warning: Option<String>,
}

/// A row of the history list.
#[derive(Debug, Serialize)]
pub struct HistoryItem {
    pub id: Option<i64>,
    pub topic: String,
    pub date_range: String,
    pub language: String,
    pub result_count: usize,
    pub created_at: String,
}

impl From<&SearchLogEntry> for HistoryItem {
    fn from(entry: &SearchLogEntry) -> Self {
        Self {
            id: entry.id,
            topic: entry.topic.clone(),
            date_range: entry.date_range(),
            language: entry.language.clone(),
            result_count: entry.result_count,
            created_at: entry.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

pub struct Export {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

pub struct Assistant {
    search: Box<dyn ArticleSearch>,
    history: Option<Box<dyn SearchHistory>>,
    report: ReportConfig,
    history_limit: u32,
}

impl Assistant {
    pub fn new(
        search: Box<dyn ArticleSearch>,
        history: Option<Box<dyn SearchHistory>>,
        config: &AppConfig,
    ) -> Self {
        Self {
            search,
            history,
            report: config.report.clone(),
            history_limit: config.store.history_limit,
        }
    }

    /// Wire up the webhook client and, when configured, the history store.
    ///
    /// A store that cannot be opened disables history instead of failing.
    pub async fn from_config(config: &AppConfig) -> Result<Self, SearchError> {
        let client = WebhookClient::new(&config.webhook)?;

        let history: Option<Box<dyn SearchHistory>> = if config.store.is_configured() {
            match HistoryStore::open(&config.store).await {
                Ok(store) => Some(Box::new(store)),
                Err(e) => {
                    error!(error = %e, "history store unavailable, continuing without history");
                    None
                }
            }
        } else {
            info!("no history store configured");
            None
        };

        Ok(Self::new(Box::new(client), history, config))
    }

    pub fn history_enabled(&self) -> bool {
        self.history.is_some()
    }

    /// Run one search for `session`.
    ///
    /// Validation failures leave the session untouched and send nothing.
    /// Any other failure moves the session to its error state.
    pub async fn search(
        &self,
        session: &mut Session,
        form: &SearchForm,
    ) -> Result<SearchView, AppError> {
        let request = SearchRequest::from_form(form)?;
        session.begin_search(&request);

        match self.run_search(&request).await {
            Ok((records, summary)) => {
                session.show(Displayed {
                    topic: request.topic().to_string(),
                    records,
                    summary,
                    history_id: None,
                });
                let store_warning = self.persist(session, &request).await;
                let displayed = session
                    .displayed()
                    .ok_or(AppError::NothingDisplayed)?;
                Ok(self.view(displayed, store_warning))
            }
            Err(e) => {
                let e = AppError::from(e);
                warn!(kind = e.kind(), error = %e, "search failed");
                session.fail(e.kind(), e.user_message());
                Err(e)
            }
        }
    }

    async fn run_search(
        &self,
        request: &SearchRequest,
    ) -> Result<(Vec<ArticleRecord>, StatisticsSummary), SearchError> {
        let raw = self.search.search(request).await?;
        let records = normalize(&raw);
        info!(received = raw.len(), kept = records.len(), "records normalised");
        if records.is_empty() {
            return Err(SearchError::NoResults);
        }
        let summary = summarize(&records, self.report.top_terms);
        Ok((records, summary))
    }

    // Best effort: returns the user-facing warning when storing fails.
    async fn persist(&self, session: &mut Session, request: &SearchRequest) -> Option<String> {
        let history = self.history.as_ref()?;
        let entry = SearchLogEntry::new(request, &session.displayed()?.records);
        match history.append(&entry).await {
            Ok(id) => {
                session.mark_stored(id);
                None
            }
            Err(e) => {
                warn!(error = %e, "could not store search");
                Some(AppError::from(e).user_message())
            }
        }
    }

    fn view(&self, displayed: &Displayed, store_warning: Option<String>) -> SearchView {
        let records = displayed
            .records
            .iter()
            .map(|r| {
                let mut record = r.clone();
                record.summary = r.summary_preview(self.report.summary_chars);
                RecordCard {
                    link: r.link(),
                    record,
                }
            })
            .collect();
        SearchView {
            status: "ok",
            message: format!(
                "{} articles found for '{}'",
                displayed.records.len(),
                displayed.topic
            ),
            topic: displayed.topic.clone(),
            records,
            summary: displayed.summary.clone(),
            history_id: displayed.history_id,
            store_warning,
        }
    }

    /// Most recent stored searches.
    pub async fn history(&self) -> Result<Vec<HistoryItem>, AppError> {
        let history = self.history.as_ref().ok_or(AppError::HistoryDisabled)?;
        let entries = history.list_recent(self.history_limit).await?;
        Ok(entries.iter().map(HistoryItem::from).collect())
    }

    /// Load a stored search back into `session` for display.
    pub async fn reopen(&self, session: &mut Session, id: i64) -> Result<SearchView, AppError> {
        let history = self.history.as_ref().ok_or(AppError::HistoryDisabled)?;
        let entry = history.get(id).await?;
        let summary = summarize(&entry.records, self.report.top_terms);
        session.show(Displayed {
            topic: entry.topic,
            records: entry.records,
            summary,
            history_id: entry.id,
        });
        let displayed = session.displayed().ok_or(AppError::NothingDisplayed)?;
        Ok(self.view(displayed, None))
    }

    pub fn export_csv(&self, session: &Session) -> Result<Export, AppError> {
        let displayed = session.displayed().ok_or(AppError::NothingDisplayed)?;
        let bytes = build_csv(&displayed.records)?;
        info!(bytes = bytes.len(), rows = displayed.records.len(), "csv export built");
        Ok(Export {
            file_name: download_name(&displayed.topic, "csv"),
            content_type: "text/csv; charset=utf-8",
            bytes,
        })
    }

    pub async fn export_pdf(&self, session: &Session) -> Result<Export, AppError> {
        let displayed = session.displayed().ok_or(AppError::NothingDisplayed)?.clone();
        let options = self.report.clone();
        let file_name = download_name(&displayed.topic, "pdf");

        // Layout is CPU bound and the document handle is not Send.
        let bytes = tokio::task::spawn_blocking(move || {
            build_report(&displayed.records, &displayed.topic, &displayed.summary, &options)
        })
        .await
        .map_err(|e| ReportError::Pdf(e.to_string()))??;

        info!(bytes = bytes.len(), "pdf report built");
        Ok(Export {
            file_name,
            content_type: "application/pdf",
            bytes,
        })
    }
}
