use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "onboarding.toml";
const DEFAULT_API_URL: &str = "http://localhost:3000/api";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_url: Url,
    pub request_timeout_secs: u64,
    /// Recorded as `sentByUser` when credentials are generated.
    pub current_user_email: Option<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: Url::parse(DEFAULT_API_URL).expect("default api url is valid"),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            current_user_email: None,
        }
    }
}

impl ClientSettings {
    pub fn with_api_url(mut self, raw: &str) -> Result<Self> {
        self.api_url = parse_api_url(raw)?;
        Ok(self)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_url: Option<String>,
    request_timeout_secs: Option<u64>,
    current_user_email: Option<String>,
}

/// Defaults, then `onboarding.toml` in the working directory, then environment.
pub fn load_settings() -> Result<ClientSettings> {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE), |key| std::env::var(key).ok())
}

pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ClientSettings> {
    let mut settings = ClientSettings::default();

    if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
        let file_cfg: FileSettings = toml::from_str(&raw)
            .with_context(|| format!("failed to parse settings file '{}'", path.display()))?;

        if let Some(v) = file_cfg.api_url {
            settings.api_url = parse_api_url(&v)?;
        }
        if let Some(v) = file_cfg.request_timeout_secs {
            settings.request_timeout_secs = v;
        }
        if let Some(v) = file_cfg.current_user_email {
            settings.current_user_email = Some(v);
        }
    }

    if let Some(v) = env("ONBOARDING_API_URL") {
        settings.api_url = parse_api_url(&v)?;
    }
    if let Some(v) = env("APP__API_URL") {
        settings.api_url = parse_api_url(&v)?;
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    if let Some(v) = env("ONBOARDING_USER_EMAIL") {
        settings.current_user_email = Some(v);
    }
    if let Some(v) = env("APP__USER_EMAIL") {
        settings.current_user_email = Some(v);
    }

    Ok(settings)
}

fn parse_api_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("invalid api url '{raw}'"))?;
    if url.cannot_be_a_base() {
        anyhow::bail!("api url '{raw}' cannot be used as a base url");
    }
    Ok(url)
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
