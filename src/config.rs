// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Layered configuration loading.
//!
//! Sources, highest priority first:
//! 1. Environment variables (`RESEARCH_ASSISTANT_*`, `__` separates sections)
//! 2. A TOML file (`research-assistant.toml`, or the path given with `--config`)
//! 3. Built-in defaults
//!
//! `RESEARCH_ASSISTANT_STORE__AUTH_TOKEN` maps to `store.auth_token`, and so on.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ENV_PREFIX: &str = "RESEARCH_ASSISTANT_";
pub const DEFAULT_CONFIG_FILE: &str = "research-assistant.toml";

const DEFAULT_WEBHOOK_URL: &str = "https://eriks20252.app.n8n.cloud/webhook/busqueda-cientifica";

const fn default_timeout_secs() -> u64 {
    120
}

const fn default_history_limit() -> u32 {
    10
}

const fn default_summary_chars() -> usize {
    500
}

const fn default_records_per_page() -> usize {
    3
}

const fn default_top_terms() -> usize {
    10
}

const fn default_idle_minutes() -> u64 {
    120
}

const fn default_max_sessions() -> usize {
    1000
}

fn default_webhook_url() -> String {
    DEFAULT_WEBHOOK_URL.to_string()
}

fn default_envelope_keys() -> Vec<String> {
    ["result", "results", "data", "articles", "articulos"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// How the search client treats `{"json": {...}}` wrapped records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeMode {
    /// Unwrap elements whose only key is `json` holding an object.
    #[default]
    Auto,
    /// Pass elements through untouched.
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WebhookConfig {
    #[serde(default = "default_webhook_url")]
    pub url: String,

    /// Request timeout in seconds. `0` waits indefinitely.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub unwrap_envelope: EnvelopeMode,

    /// Keys accepted when the response is an object wrapping the record list.
    #[serde(default = "default_envelope_keys")]
    pub envelope_keys: Vec<String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: default_webhook_url(),
            timeout_secs: default_timeout_secs(),
            unwrap_envelope: EnvelopeMode::default(),
            envelope_keys: default_envelope_keys(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoreConfig {
    /// `libsql://` or `https://` for a hosted database, a file path or
    /// `:memory:` for a local one. Empty disables history.
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub auth_token: String,

    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            auth_token: String::new(),
            history_limit: default_history_limit(),
        }
    }
}

impl StoreConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty()
    }

    pub fn is_remote(&self) -> bool {
        ["libsql://", "https://", "http://"]
            .iter()
            .any(|scheme| self.url.starts_with(scheme))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReportConfig {
    /// Summary text is cut to this many characters in the page and the PDF.
    #[serde(default = "default_summary_chars")]
    pub summary_chars: usize,

    #[serde(default = "default_records_per_page")]
    pub records_per_page: usize,

    /// Length of the keyword and author rankings.
    #[serde(default = "default_top_terms")]
    pub top_terms: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            summary_chars: default_summary_chars(),
            records_per_page: default_records_per_page(),
            top_terms: default_top_terms(),
        }
    }
}

/// Limits on browser sessions held in memory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Sessions untouched for this long are dropped with their results.
    #[serde(default = "default_idle_minutes")]
    pub idle_minutes: u64,

    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_minutes: default_idle_minutes(),
            max_sessions: default_max_sessions(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl AppConfig {
    /// Load from defaults, the default TOML file if present, and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Like [`AppConfig::load`], reading `path` instead of the default file.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Self = Self::figment(path).extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        let file = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        if file.exists() {
            figment = figment.merge(Toml::file(file));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.webhook.url.trim().is_empty() {
            return Err(invalid("webhook.url", "must not be empty"));
        }
        if self.report.records_per_page == 0 {
            return Err(invalid("report.records_per_page", "must be greater than zero"));
        }
        if self.report.top_terms == 0 {
            return Err(invalid("report.top_terms", "must be greater than zero"));
        }
        if self.store.history_limit == 0 {
            return Err(invalid("store.history_limit", "must be greater than zero"));
        }
        if self.session.idle_minutes == 0 {
            return Err(invalid("session.idle_minutes", "must be greater than zero"));
        }
        if self.session.max_sessions == 0 {
            return Err(invalid("session.max_sessions", "must be greater than zero"));
        }
        if self.store.is_remote() && self.store.auth_token.is_empty() {
            return Err(invalid("store.auth_token", "required for a hosted store"));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().expect("defaults validate");
        assert_eq!(config.webhook.timeout_secs, 120);
        assert_eq!(config.webhook.unwrap_envelope, EnvelopeMode::Auto);
        assert_eq!(config.report.summary_chars, 500);
        assert_eq!(config.report.records_per_page, 3);
        assert_eq!(config.store.history_limit, 10);
        assert_eq!(config.session.idle_minutes, 120);
        assert_eq!(config.session.max_sessions, 1000);
        assert!(!config.store.is_configured());
    }

    #[test]
    fn remote_store_needs_token() {
        let mut config = AppConfig::default();
        config.store.url = "libsql://history-demo.turso.io".into();
        assert!(config.store.is_remote());
        assert!(config.validate().is_err());

        config.store.auth_token = "token".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn local_store_is_not_remote() {
        let store = StoreConfig {
            url: ":memory:".into(),
            ..Default::default()
        };
        assert!(store.is_configured());
        assert!(!store.is_remote());
    }

    #[test]
    fn zero_page_size_rejected() {
        let mut config = AppConfig::default();
        config.report.records_per_page = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
