// Runtime configuration: defaults, then an optional TOML file, then env vars.

use serde::Deserialize;
use std::{env, fs, io, time::Duration};
use thiserror::Error;
use url::Url;

use crate::use_cases::PollSettings;

pub const DEFAULT_API_URL: &str = "http://localhost:3001/api";
pub const DEFAULT_PROCESSOR_API_URL: &str = "https://api.stripe.com";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_AUTH_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 3_000;
const DEFAULT_POLL_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_url: Url,
    pub request_timeout: Duration,
    pub auth_timeout: Duration,
    pub poll: PollSettings,
    pub processor_api_url: String,
    pub processor_publishable_key: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid api url {value:?}: {source}")]
    InvalidUrl {
        value: String,
        source: url::ParseError,
    },
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    api: ApiSection,
    #[serde(default)]
    polling: PollingSection,
    #[serde(default)]
    processor: ProcessorSection,
}

#[derive(Debug, Default, Deserialize)]
struct ApiSection {
    url: Option<String>,
    request_timeout_ms: Option<u64>,
    auth_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PollingSection {
    interval_ms: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ProcessorSection {
    api_url: Option<String>,
    publishable_key: Option<String>,
}

/// Loads settings from `PERMISOS_CONFIG` (if set) and the environment.
pub fn load() -> Result<Settings, ConfigError> {
    let file = match env::var("PERMISOS_CONFIG") {
        Ok(path) => {
            let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            parse_file(&raw)?
        }
        Err(_) => FileConfig::default(),
    };
    resolve(file, |key| env::var(key).ok())
}

fn parse_file(raw: &str) -> Result<FileConfig, ConfigError> {
    Ok(toml::from_str(raw)?)
}

// Environment wins over the file, the file wins over defaults.
fn resolve(
    file: FileConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Settings, ConfigError> {
    let number = |key: &str| lookup(key).and_then(|value| value.trim().parse::<u64>().ok());

    let api_url = lookup("PERMISOS_API_URL")
        .or(file.api.url)
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let api_url = Url::parse(&api_url).map_err(|source| ConfigError::InvalidUrl {
        value: api_url.clone(),
        source,
    })?;

    let request_timeout = number("PERMISOS_REQUEST_TIMEOUT_MS")
        .or(file.api.request_timeout_ms)
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);
    let auth_timeout = number("PERMISOS_AUTH_TIMEOUT_MS")
        .or(file.api.auth_timeout_ms)
        .unwrap_or(DEFAULT_AUTH_TIMEOUT_MS);
    let interval = number("PERMISOS_POLL_INTERVAL_MS")
        .or(file.polling.interval_ms)
        .unwrap_or(DEFAULT_POLL_INTERVAL_MS);
    let max_retries = lookup("PERMISOS_POLL_MAX_RETRIES")
        .and_then(|value| value.trim().parse::<u32>().ok())
        .or(file.polling.max_retries)
        .unwrap_or(DEFAULT_POLL_MAX_RETRIES);

    Ok(Settings {
        api_url,
        request_timeout: Duration::from_millis(request_timeout),
        auth_timeout: Duration::from_millis(auth_timeout),
        poll: PollSettings {
            interval: Duration::from_millis(interval),
            max_retries,
        },
        processor_api_url: lookup("PERMISOS_PROCESSOR_API_URL")
            .or(file.processor.api_url)
            .unwrap_or_else(|| DEFAULT_PROCESSOR_API_URL.to_string()),
        processor_publishable_key: lookup("PERMISOS_PROCESSOR_PUBLISHABLE_KEY")
            .or(file.processor.publishable_key),
    })
}
