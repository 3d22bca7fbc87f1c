use std::{fs, path::Path, time::Duration};

use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_SETTINGS_FILE: &str = "client.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub use_mock: bool,
    pub api_base_url: String,
    pub stale_time_secs: u64,
    pub query_retry: u32,
    pub request_timeout_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            use_mock: true,
            api_base_url: "https://api.example.com".into(),
            stale_time_secs: 5 * 60,
            query_retry: 3,
            request_timeout_secs: 10,
        }
    }
}

impl ClientSettings {
    pub fn stale_time(&self) -> Duration {
        Duration::from_secs(self.stale_time_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    use_mock: Option<bool>,
    api_base_url: Option<String>,
    stale_time_secs: Option<u64>,
    query_retry: Option<u32>,
    request_timeout_secs: Option<u64>,
}

/// Defaults, then `client.toml` in the working directory, then `APP__*`
/// environment variables.
pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE), |key| std::env::var(key).ok())
}

pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        apply_file_overrides(&mut settings, &raw);
    }
    apply_env_overrides(&mut settings, env);

    settings
}

fn apply_file_overrides(settings: &mut ClientSettings, raw: &str) {
    let file_cfg = match toml::from_str::<FileSettings>(raw) {
        Ok(cfg) => cfg,
        Err(err) => {
            warn!(error = %err, "ignoring malformed client settings file");
            return;
        }
    };

    if let Some(v) = file_cfg.use_mock {
        settings.use_mock = v;
    }
    if let Some(v) = file_cfg.api_base_url {
        settings.api_base_url = v;
    }
    if let Some(v) = file_cfg.stale_time_secs {
        settings.stale_time_secs = v;
    }
    if let Some(v) = file_cfg.query_retry {
        settings.query_retry = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
}

fn apply_env_overrides(settings: &mut ClientSettings, env: impl Fn(&str) -> Option<String>) {
    if let Some(v) = env("APP__USE_MOCK") {
        match parse_bool(&v) {
            Some(parsed) => settings.use_mock = parsed,
            None => warn!(value = %v, "ignoring invalid APP__USE_MOCK"),
        }
    }
    if let Some(v) = env("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = env("APP__STALE_TIME_SECS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.stale_time_secs = parsed,
            Err(_) => warn!(value = %v, "ignoring invalid APP__STALE_TIME_SECS"),
        }
    }
    if let Some(v) = env("APP__QUERY_RETRY") {
        match v.parse::<u32>() {
            Ok(parsed) => settings.query_retry = parsed,
            Err(_) => warn!(value = %v, "ignoring invalid APP__QUERY_RETRY"),
        }
    }
    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.request_timeout_secs = parsed,
            Err(_) => warn!(value = %v, "ignoring invalid APP__REQUEST_TIMEOUT_SECS"),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
