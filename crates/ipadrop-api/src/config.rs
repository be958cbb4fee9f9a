//! # Service Configuration
//!
//! Built once at startup from environment variables. Everything has a
//! default; only unparseable values are errors.
//!
//! | Variable           | Default          |
//! |--------------------|------------------|
//! | `PORT`             | `3000`           |
//! | `BIND_ADDR`        | `0.0.0.0`        |
//! | `UPLOAD_DIR`       | `uploads`        |
//! | `MAX_UPLOAD_BYTES` | `209715200`      |
//! | `PUBLIC_HOST`      | `localhost:3000` |
//! | `PUBLIC_SCHEME`    | `http`           |
//! | `LOG_FORMAT`       | `text`           |
//!
//! `DATABASE_URL` is read separately by [`crate::db::init_pool`].

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

/// 200 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 200 * 1024 * 1024;

/// A configuration variable held a value that could not be parsed.
#[derive(Debug, Error)]
#[error("invalid value {value:?} for {var}: {reason}")]
pub struct ConfigError {
    /// Environment variable name.
    pub var: &'static str,
    /// The rejected raw value.
    pub value: String,
    /// Parser message.
    pub reason: String,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("expected \"text\" or \"json\", got \"{other}\"")),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Listening port.
    pub port: u16,
    /// Listening address.
    pub bind_addr: IpAddr,
    /// Directory that receives uploaded archives.
    pub upload_dir: PathBuf,
    /// Largest accepted archive, in bytes.
    pub max_upload_bytes: u64,
    /// Host used in generated URLs when the request carries no host headers.
    pub public_host: String,
    /// Scheme used in generated URLs when `X-Forwarded-Proto` is absent.
    pub public_scheme: String,
    /// Output format for the tracing subscriber.
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            public_host: "localhost:3000".to_string(),
            public_scheme: "http".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let non_empty = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        Ok(Self {
            port: parse_var(&non_empty, "PORT")?.unwrap_or(defaults.port),
            bind_addr: parse_var(&non_empty, "BIND_ADDR")?.unwrap_or(defaults.bind_addr),
            upload_dir: non_empty("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            max_upload_bytes: parse_var(&non_empty, "MAX_UPLOAD_BYTES")?
                .unwrap_or(defaults.max_upload_bytes),
            public_host: non_empty("PUBLIC_HOST").unwrap_or(defaults.public_host),
            public_scheme: non_empty("PUBLIC_SCHEME").unwrap_or(defaults.public_scheme),
            log_format: parse_var(&non_empty, "LOG_FORMAT")?.unwrap_or(defaults.log_format),
        })
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(var)
        .map(|value| {
            value.trim().parse::<T>().map_err(|e| ConfigError {
                var,
                reason: e.to_string(),
                value,
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.max_upload_bytes, 209_715_200);
        assert_eq!(config.public_host, "localhost:3000");
        assert_eq!(config.public_scheme, "http");
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn overrides_are_applied() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("BIND_ADDR", "127.0.0.1"),
            ("UPLOAD_DIR", "/srv/ipa"),
            ("MAX_UPLOAD_BYTES", "1024"),
            ("PUBLIC_HOST", "apps.example.com"),
            ("PUBLIC_SCHEME", "https"),
            ("LOG_FORMAT", "JSON"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.bind_addr, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.upload_dir, PathBuf::from("/srv/ipa"));
        assert_eq!(config.max_upload_bytes, 1024);
        assert_eq!(config.public_host, "apps.example.com");
        assert_eq!(config.public_scheme, "https");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = AppConfig::from_lookup(lookup(&[("PORT", "  "), ("UPLOAD_DIR", "")])).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
    }

    #[test]
    fn unparseable_port_is_an_error() {
        let err = AppConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert_eq!(err.var, "PORT");
        assert_eq!(err.value, "eighty");
    }

    #[test]
    fn unknown_log_format_is_an_error() {
        let err = AppConfig::from_lookup(lookup(&[("LOG_FORMAT", "xml")])).unwrap_err();
        assert_eq!(err.var, "LOG_FORMAT");
        assert!(err.reason.contains("xml"));
    }
}
