//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`GatewaySettings::default()`]
//! 2. If the settings file exists, deep-merge its values over defaults
//! 3. Apply `NEXUS_*` environment overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::{GatewaySettings, LogFormat, nexus_home};

/// Env var naming an explicit settings file.
pub const SETTINGS_PATH_ENV: &str = "NEXUS_SETTINGS";

/// Resolve the settings file: `$NEXUS_SETTINGS`, else `~/.nexus/settings.json`.
pub fn settings_path() -> PathBuf {
    match std::env::var(SETTINGS_PATH_ENV) {
        Ok(p) if !p.is_empty() => PathBuf::from(p),
        _ => nexus_home().join("settings.json"),
    }
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<GatewaySettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON or the merged values fail validation, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<GatewaySettings> {
    load_with_env(path, |name| std::env::var(name).ok())
}

fn load_with_env(path: &Path, env: impl Fn(&str) -> Option<String>) -> Result<GatewaySettings> {
    let defaults = serde_json::to_value(GatewaySettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: GatewaySettings = serde_json::from_value(merged)?;
    apply_overrides(&mut settings, &EnvReader(env));
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `NEXUS_*` overrides read through `env`.
///
/// Integers must parse and fall within range; anything else is logged
/// and ignored, keeping the file/default value.
fn apply_overrides<F: Fn(&str) -> Option<String>>(settings: &mut GatewaySettings, env: &EnvReader<F>) {
    if let Some(v) = env.string("NEXUS_ENV") {
        settings.env = v;
    }

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = env.string("NEXUS_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.u16("NEXUS_GATEWAY_PORT", 0, 65535) {
        settings.server.gateway_port = v;
    }
    if let Some(v) = env.u16("NEXUS_CONTROL_PORT", 0, 65535) {
        settings.server.control_port = v;
    }
    if let Some(v) = env.u64("NEXUS_SHUTDOWN_TIMEOUT_SECS", 0, 3600) {
        settings.server.shutdown_timeout_secs = v;
    }

    // ── Realtime ────────────────────────────────────────────────────
    if let Some(v) = env.usize("NEXUS_HUB_QUEUE_CAPACITY", 1, 65_536) {
        settings.realtime.hub_queue_capacity = v;
    }
    if let Some(v) = env.usize("NEXUS_STREAM_QUEUE_CAPACITY", 1, 65_536) {
        settings.realtime.stream_queue_capacity = v;
    }
    if let Some(v) = env.u64("NEXUS_STREAM_HEARTBEAT_SECS", 1, 3600) {
        settings.realtime.stream_heartbeat_secs = v;
    }
    if let Some(v) = env.u64("NEXUS_WS_PING_INTERVAL_SECS", 0, 3600) {
        settings.realtime.ws_ping_interval_secs = v;
    }

    // ── Logging / storage ───────────────────────────────────────────
    if let Some(v) = env.string("NEXUS_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.string("NEXUS_LOG_FORMAT") {
        match parse_log_format(&v) {
            Some(format) => settings.logging.format = format,
            None => warn!(key = "NEXUS_LOG_FORMAT", value = %v, "invalid log format env var, ignoring"),
        }
    }
    if let Some(v) = env.string("NEXUS_DB_PATH") {
        settings.database.path = PathBuf::from(v);
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a log format name (case-insensitive).
pub fn parse_log_format(val: &str) -> Option<LogFormat> {
    match val.to_lowercase().as_str() {
        "json" => Some(LogFormat::Json),
        "pretty" | "text" => Some(LogFormat::Pretty),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

struct EnvReader<F>(F);

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn string(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|v| !v.is_empty())
    }

    fn u16(&self, name: &str, min: u16, max: u16) -> Option<u16> {
        let val = self.string(name)?;
        let result = parse_u16_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid u16 env var, ignoring");
        }
        result
    }

    fn u64(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = self.string(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid u64 env var, ignoring");
        }
        result
    }

    fn usize(&self, name: &str, min: usize, max: usize) -> Option<usize> {
        let val = self.string(name)?;
        let result = parse_usize_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid usize env var, ignoring");
        }
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::errors::SettingsError;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_simple_override() {
        let merged = deep_merge(json!({"a": 1, "b": 2}), json!({"b": 3}));
        assert_eq!(merged, json!({"a": 1, "b": 3}));
    }

    #[test]
    fn merge_nested_override() {
        let target = json!({"server": {"host": "0.0.0.0", "gateway_port": 8080}});
        let source = json!({"server": {"gateway_port": 9000}});
        assert_eq!(
            deep_merge(target, source),
            json!({"server": {"host": "0.0.0.0", "gateway_port": 9000}})
        );
    }

    #[test]
    fn merge_array_replace() {
        let merged = deep_merge(json!({"a": [1, 2, 3]}), json!({"a": [4]}));
        assert_eq!(merged, json!({"a": [4]}));
    }

    #[test]
    fn merge_null_preserves_target() {
        let merged = deep_merge(json!({"a": 1}), json!({"a": null}));
        assert_eq!(merged, json!({"a": 1}));
    }

    #[test]
    fn merge_new_keys_added() {
        let merged = deep_merge(json!({"a": 1}), json!({"b": 2}));
        assert_eq!(merged, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let merged = deep_merge(json!({"a": {"x": 1}}), json!({"a": 5}));
        assert_eq!(merged, json!({"a": 5}));
    }

    // ── file loading ────────────────────────────────────────────────

    #[test]
    fn load_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_with_env(&dir.path().join("nope.json"), no_env).unwrap();
        assert_eq!(s.server.gateway_port, 8080);
        assert_eq!(s.realtime.hub_queue_capacity, 32);
    }

    #[test]
    fn load_empty_json_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{}").unwrap();
        let s = load_with_env(&path, no_env).unwrap();
        assert_eq!(s.env, "local");
        assert_eq!(s.realtime.stream_queue_capacity, 16);
    }

    #[test]
    fn load_partial_json_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"env": "staging", "realtime": {"hub_queue_capacity": 64}, "logging": {"format": "pretty"}}"#,
        )
        .unwrap();
        let s = load_with_env(&path, no_env).unwrap();
        assert_eq!(s.env, "staging");
        assert_eq!(s.realtime.hub_queue_capacity, 64);
        assert_eq!(s.realtime.stream_queue_capacity, 16);
        assert_eq!(s.logging.format, LogFormat::Pretty);
        assert_eq!(s.logging.level, "debug");
    }

    #[test]
    fn load_invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = load_with_env(&path, no_env).unwrap_err();
        assert!(matches!(err, SettingsError::Json(_)));
    }

    #[test]
    fn load_invalid_value_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"realtime": {"stream_queue_capacity": 0}}"#).unwrap();
        let err = load_with_env(&path, no_env).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue(_)));
    }

    // ── env overrides ───────────────────────────────────────────────

    #[test]
    fn env_overrides_beat_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"server": {"gateway_port": 9000}}"#).unwrap();
        let env = env_from(&[
            ("NEXUS_GATEWAY_PORT", "9100"),
            ("NEXUS_ENV", "production"),
            ("NEXUS_LOG_LEVEL", "info"),
            ("NEXUS_LOG_FORMAT", "PRETTY"),
            ("NEXUS_DB_PATH", "/var/lib/nexus.db"),
        ]);
        let s = load_with_env(&path, env).unwrap();
        assert_eq!(s.server.gateway_port, 9100);
        assert_eq!(s.env, "production");
        assert_eq!(s.logging.level, "info");
        assert_eq!(s.logging.format, LogFormat::Pretty);
        assert_eq!(s.database.path, PathBuf::from("/var/lib/nexus.db"));
    }

    #[test]
    fn invalid_env_values_ignored() {
        let mut s = GatewaySettings::default();
        let env = EnvReader(env_from(&[
            ("NEXUS_CONTROL_PORT", "not-a-port"),
            ("NEXUS_HUB_QUEUE_CAPACITY", "0"),
            ("NEXUS_LOG_FORMAT", "xml"),
        ]));
        apply_overrides(&mut s, &env);
        assert_eq!(s.server.control_port, 8081);
        assert_eq!(s.realtime.hub_queue_capacity, 32);
        assert_eq!(s.logging.format, LogFormat::Json);
    }

    #[test]
    fn empty_env_value_ignored() {
        let mut s = GatewaySettings::default();
        apply_overrides(&mut s, &EnvReader(env_from(&[("NEXUS_HOST", "")])));
        assert_eq!(s.server.host, "0.0.0.0");
    }

    // ── parsers ─────────────────────────────────────────────────────

    #[test]
    fn parse_u16_bounds() {
        assert_eq!(parse_u16_range("8080", 1, 65535), Some(8080));
        assert_eq!(parse_u16_range("0", 1, 65535), None);
        assert_eq!(parse_u16_range("70000", 1, 65535), None);
        assert_eq!(parse_u16_range("abc", 1, 65535), None);
    }

    #[test]
    fn parse_u64_bounds() {
        assert_eq!(parse_u64_range("30", 1, 3600), Some(30));
        assert_eq!(parse_u64_range("3601", 1, 3600), None);
        assert_eq!(parse_u64_range("-1", 0, 10), None);
    }

    #[test]
    fn parse_usize_bounds() {
        assert_eq!(parse_usize_range("32", 1, 100), Some(32));
        assert_eq!(parse_usize_range("0", 1, 100), None);
    }

    #[test]
    fn parse_log_format_variants() {
        assert_eq!(parse_log_format("json"), Some(LogFormat::Json));
        assert_eq!(parse_log_format("Pretty"), Some(LogFormat::Pretty));
        assert_eq!(parse_log_format("text"), Some(LogFormat::Pretty));
        assert_eq!(parse_log_format("yaml"), None);
    }
}
