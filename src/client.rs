// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Webhook client. One blocking-style POST per search, no retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{EnvelopeMode, WebhookConfig};
use crate::error::SearchError;
use crate::query::SearchRequest;

/// Anything that can run a search and hand back raw records.
#[async_trait]
pub trait ArticleSearch: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Value>, SearchError>;
}

pub struct WebhookClient {
    client: Client,
    url: String,
    timeout: Option<Duration>,
    envelope: EnvelopeMode,
    envelope_keys: Vec<String>,
}

impl WebhookClient {
    pub fn new(config: &WebhookConfig) -> Result<Self, SearchError> {
        let timeout = (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs));

        let mut builder =
            Client::builder().user_agent(concat!("research_assistant/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| SearchError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            timeout,
            envelope: config.unwrap_envelope,
            envelope_keys: config.envelope_keys.clone(),
        })
    }

    fn map_send_error(&self, e: reqwest::Error) -> SearchError {
        if e.is_timeout() {
            SearchError::Timeout {
                secs: self.timeout.map(|t| t.as_secs()).unwrap_or_default(),
            }
        } else {
            SearchError::from(e)
        }
    }
}

#[async_trait]
impl ArticleSearch for WebhookClient {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Value>, SearchError> {
        info!(topic = request.topic(), language = %request.language(), "sending search to webhook");

        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "webhook returned an error status");
            return Err(SearchError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let records = interpret_body(&body, self.envelope, &self.envelope_keys)?;
        info!(count = records.len(), "webhook returned records");
        Ok(records)
    }
}

/// Turn a successful response body into the raw record list.
///
/// Accepts a bare array or an object holding the array under one of
/// `envelope_keys`. Anything else, including an empty list, is
/// [`SearchError::NoResults`].
pub fn interpret_body(
    body: &str,
    envelope: EnvelopeMode,
    envelope_keys: &[String],
) -> Result<Vec<Value>, SearchError> {
    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "webhook body is not JSON");
            return Err(SearchError::NoResults);
        }
    };

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => envelope_keys
            .iter()
            .find_map(|key| match obj.remove(key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or(SearchError::NoResults)?,
        _ => return Err(SearchError::NoResults),
    };

    if items.is_empty() {
        return Err(SearchError::NoResults);
    }

    Ok(match envelope {
        EnvelopeMode::Auto => items.into_iter().map(unwrap_json_envelope).collect(),
        EnvelopeMode::Never => items,
    })
}

/// `{"json": {...}}` becomes `{...}`; anything else is returned unchanged.
pub fn unwrap_json_envelope(item: Value) -> Value {
    match item {
        Value::Object(mut obj)
            if obj.len() == 1 && obj.get("json").is_some_and(Value::is_object) =>
        {
            obj.remove("json").unwrap_or_default()
        }
        other => other,
    }
}
