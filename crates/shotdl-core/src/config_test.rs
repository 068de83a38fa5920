use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn build_app_config_uses_defaults_with_empty_env() {
    let map: HashMap<&str, &str> = HashMap::new();
    let result = build_app_config(lookup_from_map(&map));
    assert!(result.is_ok(), "expected Ok, got: {result:?}");
    let cfg = result.unwrap();
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.base_url, "https://dribbble.com");
    assert_eq!(cfg.user_agent, DEFAULT_USER_AGENT);
    assert_eq!(cfg.request_timeout_secs, 60);
    assert_eq!(cfg.nav_timeout_ms, 30_000);
    assert_eq!(cfg.settle_ms, 2_000);
    assert_eq!(cfg.max_attempts, 3);
    assert_eq!(cfg.retry_backoff_ms, 1_000);
    assert_eq!(cfg.max_scroll_rounds, 5);
    assert!(cfg.cdp_endpoint.is_none());
    assert!(cfg.chrome_path.is_none());
    assert!(cfg.magick_path.is_none());
}

#[test]
fn build_app_config_reads_overrides() {
    let mut map = HashMap::new();
    map.insert("SHOTDL_LOG_LEVEL", "debug");
    map.insert("SHOTDL_SETTLE_MS", "0");
    map.insert("SHOTDL_MAX_ATTEMPTS", "5");
    map.insert("SHOTDL_CDP_ENDPOINT", "http://127.0.0.1:9222");
    map.insert("SHOTDL_MAGICK_PATH", "/opt/im/bin/magick");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.log_level, "debug");
    assert_eq!(cfg.settle_ms, 0);
    assert_eq!(cfg.max_attempts, 5);
    assert_eq!(cfg.cdp_endpoint.as_deref(), Some("http://127.0.0.1:9222"));
    assert_eq!(
        cfg.magick_path.as_deref(),
        Some(std::path::Path::new("/opt/im/bin/magick"))
    );
}

#[test]
fn build_app_config_treats_blank_optional_as_unset() {
    let mut map = HashMap::new();
    map.insert("SHOTDL_CHROME_PATH", "   ");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert!(cfg.chrome_path.is_none());
}

#[test]
fn build_app_config_strips_trailing_slash_from_base_url() {
    let mut map = HashMap::new();
    map.insert("SHOTDL_BASE_URL", "http://localhost:8080/");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.base_url, "http://localhost:8080");
}

#[test]
fn build_app_config_rejects_schemeless_base_url() {
    let mut map = HashMap::new();
    map.insert("SHOTDL_BASE_URL", "dribbble.com");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SHOTDL_BASE_URL"),
        "expected InvalidEnvVar(SHOTDL_BASE_URL), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_non_numeric_timeout() {
    let mut map = HashMap::new();
    map.insert("SHOTDL_NAV_TIMEOUT_MS", "soon");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SHOTDL_NAV_TIMEOUT_MS"),
        "expected InvalidEnvVar(SHOTDL_NAV_TIMEOUT_MS), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_zero_attempts() {
    let mut map = HashMap::new();
    map.insert("SHOTDL_MAX_ATTEMPTS", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SHOTDL_MAX_ATTEMPTS"),
        "expected InvalidEnvVar(SHOTDL_MAX_ATTEMPTS), got: {result:?}"
    );
}
