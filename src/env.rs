//! Environment variable names used by this crate for convenient
//! configuration of the adapter from microservices.
//!
//! These are purely helpers; the adapter itself never reads the
//! environment.

use crate::config::{ConfigError, LokiConfig};
use crate::record::{LabelSet, Level};
use std::str::FromStr;
use std::time::Duration;

/// Loki push endpoint, e.g. `http://127.0.0.1:3100/loki/api/v1/push`. Required.
pub const LOKI_SINK_URL_ENV: &str = "LOKI_SINK_URL";

/// `true`/`false`, defaults to enabled.
pub const LOKI_SINK_ENABLED_ENV: &str = "LOKI_SINK_ENABLED";

/// Minimum level name (`trace`, `debug`, `info`, `warn`, `error`, `fatal`).
pub const LOKI_SINK_LEVEL_ENV: &str = "LOKI_SINK_LEVEL";

/// Static labels as `key=value` pairs separated by commas.
pub const LOKI_SINK_LABELS_ENV: &str = "LOKI_SINK_LABELS";

pub const LOKI_SINK_BATCH_SIZE_ENV: &str = "LOKI_SINK_BATCH_SIZE";

pub const LOKI_SINK_BATCH_INTERVAL_MS_ENV: &str = "LOKI_SINK_BATCH_INTERVAL_MS";

pub const LOKI_SINK_RETRY_COUNT_ENV: &str = "LOKI_SINK_RETRY_COUNT";

pub const LOKI_SINK_RETRY_DELAY_MS_ENV: &str = "LOKI_SINK_RETRY_DELAY_MS";

pub const LOKI_SINK_TIMEOUT_MS_ENV: &str = "LOKI_SINK_TIMEOUT_MS";

/// Optional `X-Scope-OrgID` tenant.
pub const LOKI_SINK_TENANT_ID_ENV: &str = "LOKI_SINK_TENANT_ID";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl LokiConfig {
    /// Build a configuration from the `LOKI_SINK_*` environment variables.
    /// Unset variables keep the defaults of [`LokiConfig::new`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`LokiConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let url = lookup(LOKI_SINK_URL_ENV).ok_or(ConfigError::MissingEnv(LOKI_SINK_URL_ENV))?;
        let mut cfg = LokiConfig::new(url);

        if let Some(v) = lookup(LOKI_SINK_ENABLED_ENV) {
            cfg.enabled = parse(LOKI_SINK_ENABLED_ENV, &v)?;
        }
        if let Some(v) = lookup(LOKI_SINK_LEVEL_ENV) {
            cfg.level = parse::<Level>(LOKI_SINK_LEVEL_ENV, &v)?;
        }
        if let Some(v) = lookup(LOKI_SINK_LABELS_ENV) {
            cfg.labels = parse_labels(&v)?;
        }
        if let Some(v) = lookup(LOKI_SINK_BATCH_SIZE_ENV) {
            cfg.batch_size = parse(LOKI_SINK_BATCH_SIZE_ENV, &v)?;
        }
        if let Some(v) = lookup(LOKI_SINK_BATCH_INTERVAL_MS_ENV) {
            cfg.batch_interval = parse_millis(LOKI_SINK_BATCH_INTERVAL_MS_ENV, &v)?;
        }
        if let Some(v) = lookup(LOKI_SINK_RETRY_COUNT_ENV) {
            cfg.retry_count = parse(LOKI_SINK_RETRY_COUNT_ENV, &v)?;
        }
        if let Some(v) = lookup(LOKI_SINK_RETRY_DELAY_MS_ENV) {
            cfg.retry_delay = parse_millis(LOKI_SINK_RETRY_DELAY_MS_ENV, &v)?;
        }
        if let Some(v) = lookup(LOKI_SINK_TIMEOUT_MS_ENV) {
            cfg.timeout = parse_millis(LOKI_SINK_TIMEOUT_MS_ENV, &v)?;
        }
        if let Some(v) = lookup(LOKI_SINK_TENANT_ID_ENV) {
            if !v.trim().is_empty() {
                cfg.tenant_id = Some(v.trim().to_string());
            }
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key,
        value: value.to_string(),
    })
}

fn parse_millis(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    parse::<u64>(key, value).map(Duration::from_millis)
}

fn parse_labels(value: &str) -> Result<LabelSet, ConfigError> {
    let mut labels = LabelSet::new();
    for pair in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match pair.split_once('=') {
            Some((k, v)) if !k.trim().is_empty() => {
                labels.insert(k.trim().to_string(), v.trim().to_string());
            }
            _ => {
                return Err(ConfigError::InvalidEnv {
                    key: LOKI_SINK_LABELS_ENV,
                    value: value.to_string(),
                })
            }
        }
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&'static str, &str)]) -> impl Fn(&'static str) -> Option<String> {
        let map: HashMap<&'static str, String> =
            vars.iter().map(|(k, v)| (*k, v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn url_is_required() {
        assert_eq!(
            LokiConfig::from_lookup(lookup(&[])),
            Err(ConfigError::MissingEnv(LOKI_SINK_URL_ENV))
        );
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = LokiConfig::from_lookup(lookup(&[
            (LOKI_SINK_URL_ENV, "http://loki:3100/loki/api/v1/push"),
            (LOKI_SINK_LEVEL_ENV, "warn"),
            (LOKI_SINK_LABELS_ENV, "app=api, env=prod"),
            (LOKI_SINK_BATCH_SIZE_ENV, "10"),
            (LOKI_SINK_BATCH_INTERVAL_MS_ENV, "250"),
            (LOKI_SINK_RETRY_COUNT_ENV, "0"),
            (LOKI_SINK_TENANT_ID_ENV, "team-a"),
        ]))
        .unwrap();

        assert_eq!(cfg.level, Level::Warn);
        assert_eq!(cfg.labels.get("env").map(String::as_str), Some("prod"));
        assert_eq!(cfg.labels.len(), 2);
        assert_eq!(cfg.batch_size, 10);
        assert_eq!(cfg.batch_interval, Duration::from_millis(250));
        assert_eq!(cfg.retry_count, 0);
        assert_eq!(cfg.retry_delay, Duration::from_secs(1));
        assert_eq!(cfg.tenant_id.as_deref(), Some("team-a"));
    }

    #[test]
    fn malformed_values_are_reported() {
        let err = LokiConfig::from_lookup(lookup(&[
            (LOKI_SINK_URL_ENV, "http://loki"),
            (LOKI_SINK_BATCH_SIZE_ENV, "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { key: LOKI_SINK_BATCH_SIZE_ENV, .. }));

        let err = LokiConfig::from_lookup(lookup(&[
            (LOKI_SINK_URL_ENV, "http://loki"),
            (LOKI_SINK_LABELS_ENV, "novalue"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { key: LOKI_SINK_LABELS_ENV, .. }));
    }
}
