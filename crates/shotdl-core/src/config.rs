use std::path::PathBuf;

use crate::app_config::{AppConfig, DEFAULT_USER_AGENT};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build configuration using the provided env-var lookup function, so the
/// parsing rules can be exercised with a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let defaults = AppConfig::default();

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse_u32 = |var: &str, default: u32| -> Result<u32, ConfigError> {
        let raw = or_default(var, &default.to_string());
        raw.trim()
            .parse::<u32>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u64 = |var: &str, default: u64| -> Result<u64, ConfigError> {
        let raw = or_default(var, &default.to_string());
        raw.trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let log_level = or_default("SHOTDL_LOG_LEVEL", &defaults.log_level);
    let base_url = parse_base_url(&or_default("SHOTDL_BASE_URL", &defaults.base_url))?;
    let user_agent = or_default("SHOTDL_USER_AGENT", DEFAULT_USER_AGENT);

    let request_timeout_secs =
        parse_u64("SHOTDL_REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs)?;
    let nav_timeout_ms = parse_u64("SHOTDL_NAV_TIMEOUT_MS", defaults.nav_timeout_ms)?;
    let settle_ms = parse_u64("SHOTDL_SETTLE_MS", defaults.settle_ms)?;
    let max_attempts = parse_u32("SHOTDL_MAX_ATTEMPTS", defaults.max_attempts)?;
    if max_attempts == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "SHOTDL_MAX_ATTEMPTS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let retry_backoff_ms = parse_u64("SHOTDL_RETRY_BACKOFF_MS", defaults.retry_backoff_ms)?;
    let max_scroll_rounds = parse_u32("SHOTDL_MAX_SCROLL_ROUNDS", defaults.max_scroll_rounds)?;

    Ok(AppConfig {
        log_level,
        base_url,
        user_agent,
        request_timeout_secs,
        nav_timeout_ms,
        settle_ms,
        max_attempts,
        retry_backoff_ms,
        max_scroll_rounds,
        cdp_endpoint: optional("SHOTDL_CDP_ENDPOINT"),
        chrome_path: optional("SHOTDL_CHROME_PATH").map(PathBuf::from),
        magick_path: optional("SHOTDL_MAGICK_PATH").map(PathBuf::from),
    })
}

/// Accepts only absolute `http(s)` origins and strips any trailing slash.
fn parse_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
        Ok(trimmed.to_string())
    } else {
        Err(ConfigError::InvalidEnvVar {
            var: "SHOTDL_BASE_URL".to_string(),
            reason: format!("expected an http(s) URL, got \"{raw}\""),
        })
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
