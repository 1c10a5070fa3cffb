use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::Url;

use crate::feed::PersonalizationMode;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api/";
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub page_size: u32,
    pub personalization: PersonalizationMode,
    pub session_file: PathBuf,
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Build from `NEWSDESK_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let base = env_or("NEWSDESK_API_URL", DEFAULT_API_URL);
        let page_size = env_or("NEWSDESK_PAGE_SIZE", &DEFAULT_PAGE_SIZE.to_string())
            .parse::<u32>()
            .context("NEWSDESK_PAGE_SIZE must be a positive integer")?;
        let personalization = env_or("NEWSDESK_PERSONALIZATION", "server")
            .parse::<PersonalizationMode>()
            .map_err(|e| anyhow!(e))
            .context("NEWSDESK_PERSONALIZATION")?;
        let timeout = env_or("NEWSDESK_TIMEOUT_SECS", &DEFAULT_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .context("NEWSDESK_TIMEOUT_SECS must be a number of seconds")?;
        let session_file = std::env::var("NEWSDESK_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_session_file());

        let mut cfg = Self::new(&base)?;
        cfg.page_size = page_size;
        cfg.personalization = personalization;
        cfg.session_file = session_file;
        cfg.request_timeout = Duration::from_secs(timeout);
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults for everything but the base URL.
    pub fn new(base: &str) -> Result<Self> {
        Ok(Self {
            base_url: normalize_base(base)?,
            page_size: DEFAULT_PAGE_SIZE,
            personalization: PersonalizationMode::Server,
            session_file: default_session_file(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(anyhow!("page size must be at least 1"));
        }
        Ok(())
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty()).unwrap_or_else(|| default.to_string())
}

/// Parse the base URL and force a trailing slash so relative joins keep the prefix.
pub fn normalize_base(base: &str) -> Result<Url> {
    let mut url = Url::parse(base.trim()).with_context(|| format!("invalid base URL '{}'", base))?;
    if !url.path().ends_with('/') {
        let p = format!("{}/", url.path());
        url.set_path(&p);
    }
    Ok(url)
}

fn default_session_file() -> PathBuf {
    let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"));
    match home {
        Some(h) => PathBuf::from(h).join(".newsdesk").join("session.json"),
        None => PathBuf::from(".newsdesk").join("session.json"),
    }
}
