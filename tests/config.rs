use std::path::Path;

use figment::Jail;
use pretty_assertions::assert_eq;

use research_assistant::config::{AppConfig, EnvelopeMode};
use research_assistant::error::ConfigError;

#[test]
fn defaults_without_file_or_env() {
    Jail::expect_with(|_jail| {
        let config = AppConfig::load().expect("defaults load");
        assert_eq!(config, AppConfig::default());
        Ok(())
    });
}

#[test]
fn toml_file_overrides_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "research-assistant.toml",
            r#"
                [webhook]
                url = "http://localhost:5678/webhook/search"
                timeout_secs = 45
                unwrap_envelope = "never"

                [store]
                url = "history.db"
                history_limit = 25

                [report]
                summary_chars = 300

                [session]
                max_sessions = 50
            "#,
        )?;

        let config = AppConfig::load().expect("file loads");
        assert_eq!(config.webhook.url, "http://localhost:5678/webhook/search");
        assert_eq!(config.webhook.timeout_secs, 45);
        assert_eq!(config.webhook.unwrap_envelope, EnvelopeMode::Never);
        assert_eq!(config.store.url, "history.db");
        assert_eq!(config.store.history_limit, 25);
        assert_eq!(config.report.summary_chars, 300);
        assert_eq!(config.report.records_per_page, 3);
        assert_eq!(config.session.max_sessions, 50);
        assert_eq!(config.session.idle_minutes, 120);
        Ok(())
    });
}

#[test]
fn environment_beats_file() {
    Jail::expect_with(|jail| {
        jail.create_file("custom.toml", "[webhook]\ntimeout_secs = 45\n")?;
        jail.set_env("RESEARCH_ASSISTANT_WEBHOOK__TIMEOUT_SECS", "0");
        jail.set_env("RESEARCH_ASSISTANT_STORE__URL", "libsql://history-demo.turso.io");
        jail.set_env("RESEARCH_ASSISTANT_STORE__AUTH_TOKEN", "secret");

        let config = AppConfig::load_from(Some(Path::new("custom.toml"))).expect("loads");
        assert_eq!(config.webhook.timeout_secs, 0);
        assert!(config.store.is_remote());
        assert_eq!(config.store.auth_token, "secret");
        Ok(())
    });
}

#[test]
fn hosted_store_without_token_is_rejected() {
    Jail::expect_with(|jail| {
        jail.set_env("RESEARCH_ASSISTANT_STORE__URL", "libsql://history-demo.turso.io");

        let err = AppConfig::load().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, .. } if field == "store.auth_token"
        ));
        Ok(())
    });
}

#[test]
fn malformed_value_is_a_figment_error() {
    Jail::expect_with(|jail| {
        jail.create_file("research-assistant.toml", "[report]\nsummary_chars = \"lots\"\n")?;

        assert!(matches!(AppConfig::load(), Err(ConfigError::Figment(_))));
        Ok(())
    });
}
