use anyhow::{Context, Result};

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const ASSISTANT_ID_VAR: &str = "ASIM_ASSISTANT_ID";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub assistant_id: Option<String>,
    pub openai_base_url: String,
    pub temperature: f32,
    pub top_p: f32,
    pub host: String,
    pub port: u16,
    pub static_dir: String,
    pub log_dir: String,
    pub debug: bool,
    pub poll_interval_ms: u64,
    pub remote_timeout_secs: u64,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Credentials are allowed
    /// to be absent here; see [`Config::missing_settings`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.into());

        Ok(Self {
            openai_api_key: non_empty(lookup(API_KEY_VAR)),
            assistant_id: non_empty(lookup(ASSISTANT_ID_VAR)),
            openai_base_url: get("OPENAI_BASE_URL", "https://api.openai.com/v1")
                .trim_end_matches('/')
                .to_string(),
            temperature: get("ASIM_TEMPERATURE", "0.1")
                .parse()
                .context("ASIM_TEMPERATURE must be a number")?,
            top_p: get("ASIM_TOP_P", "1.0")
                .parse()
                .context("ASIM_TOP_P must be a number")?,
            host: get("HOST", "0.0.0.0"),
            port: get("PORT", "3000")
                .parse()
                .context("PORT must be a port number")?,
            static_dir: get("STATIC_DIR", "static"),
            log_dir: get("LOG_DIR", "logs"),
            debug: parse_flag(&get("ASIM_DEBUG", "false")),
            poll_interval_ms: get("RUN_POLL_INTERVAL_MS", "500")
                .parse()
                .context("RUN_POLL_INTERVAL_MS must be a number")?,
            remote_timeout_secs: get("REMOTE_TIMEOUT_SECS", "600")
                .parse()
                .context("REMOTE_TIMEOUT_SECS must be a number")?,
            log_format: match get("LOG_FORMAT", "text").to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Text,
            },
        })
    }

    /// Names of the required deployment settings that are not set.
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.openai_api_key.is_none() {
            missing.push(API_KEY_VAR);
        }
        if self.assistant_id.is_none() {
            missing.push(ASSISTANT_ID_VAR);
        }
        missing
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
