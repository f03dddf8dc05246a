#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use research_assistant::client::ArticleSearch;
use research_assistant::error::{SearchError, StoreError};
use research_assistant::history::{SearchHistory, SearchLogEntry};
use research_assistant::query::{SearchForm, SearchRequest};

/// What the stub webhook answers.
#[derive(Clone)]
pub enum Reply {
    Records(Vec<Value>),
    ServerError(u16, &'static str),
    Timeout,
}

/// Webhook stand-in that records every request it receives.
pub struct StubSearch {
    reply: Reply,
    pub calls: Arc<AtomicUsize>,
    pub last_request: Arc<Mutex<Option<SearchRequest>>>,
}

impl StubSearch {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            calls: Arc::new(AtomicUsize::new(0)),
            last_request: Arc::new(Mutex::new(None)),
        }
    }
}

#[async_trait]
impl ArticleSearch for StubSearch {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Value>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        match &self.reply {
            Reply::Records(records) => Ok(records.clone()),
            Reply::ServerError(status, body) => Err(SearchError::Server {
                status: *status,
                body: body.to_string(),
            }),
            Reply::Timeout => Err(SearchError::Timeout { secs: 120 }),
        }
    }
}

/// History that counts appends and can be told to fail.
pub struct RecordingHistory {
    pub appends: Arc<AtomicUsize>,
    fail: bool,
}

impl RecordingHistory {
    pub fn working() -> Self {
        Self {
            appends: Arc::new(AtomicUsize::new(0)),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            appends: Arc::new(AtomicUsize::new(0)),
            fail: true,
        }
    }
}

#[async_trait]
impl SearchHistory for RecordingHistory {
    async fn append(&self, _entry: &SearchLogEntry) -> Result<i64, StoreError> {
        let n = self.appends.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(StoreError::Query("database is locked".into()))
        } else {
            Ok(n as i64 + 1)
        }
    }

    async fn list_recent(&self, _limit: u32) -> Result<Vec<SearchLogEntry>, StoreError> {
        Ok(Vec::new())
    }

    async fn get(&self, id: i64) -> Result<SearchLogEntry, StoreError> {
        Err(StoreError::NotFound(id))
    }
}

pub fn sample_records() -> Vec<Value> {
    vec![
        json!({
            "titulo": "Carbono en suelos agrícolas",
            "autores": ["Ana Pérez", "Luis Gómez"],
            "año": 2021,
            "fuente": "Scopus",
            "revista": "Geoderma",
            "palabras_clave": "soil, carbon",
            "resumen": "<p>Estudio de <b>carbono</b> orgánico.</p>",
            "doi": "https://doi.org/10.1016/j.geoderma.2021.115000"
        }),
        json!({
            "title": "Cover crops and soil organic matter",
            "authors": "Ana Pérez",
            "year": "2022",
            "source": "Web of Science",
            "keywords": ["soil", "cover crops"],
            "url": "https://example.org/cover-crops"
        }),
        json!({ "authors": "Nobody" }),
    ]
}

pub fn form(topic: &str) -> SearchForm {
    SearchForm {
        topic: topic.to_string(),
        start_date: Some("2020-01-01".into()),
        end_date: Some("2024-12-31".into()),
        language: Some("en,es".into()),
    }
}
