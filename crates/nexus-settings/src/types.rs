//! Settings types for the gateway.
//!
//! Every struct is `#[serde(default)]`, so a settings file only has to
//! name the values it changes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings object.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// Deployment environment label (`local`, `staging`, `production`, ...).
    pub env: String,
    /// Listener settings.
    pub server: ServerSettings,
    /// Fan-out queue and connection settings.
    pub realtime: RealtimeSettings,
    /// Log output settings.
    pub logging: LoggingSettings,
    /// Control-plane storage settings.
    pub database: DatabaseSettings,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            env: "local".to_string(),
            server: ServerSettings::default(),
            realtime: RealtimeSettings::default(),
            logging: LoggingSettings::default(),
            database: DatabaseSettings::default(),
        }
    }
}

impl GatewaySettings {
    /// Reject values that would leave the gateway unable to deliver.
    pub fn validate(&self) -> Result<()> {
        if self.realtime.hub_queue_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "realtime.hub_queue_capacity must be > 0".into(),
            ));
        }
        if self.realtime.stream_queue_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "realtime.stream_queue_capacity must be > 0".into(),
            ));
        }
        if self.realtime.stream_heartbeat_secs == 0 {
            return Err(SettingsError::InvalidValue(
                "realtime.stream_heartbeat_secs must be > 0".into(),
            ));
        }
        if self.server.gateway_port != 0 && self.server.gateway_port == self.server.control_port {
            return Err(SettingsError::InvalidValue(format!(
                "server.gateway_port and server.control_port are both {}",
                self.server.gateway_port
            )));
        }
        Ok(())
    }
}

/// Network listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address shared by both listeners.
    pub host: String,
    /// Port of the event gateway (ingest, WebSocket, SSE).
    pub gateway_port: u16,
    /// Port of the control-plane API.
    pub control_port: u16,
    /// How long in-flight connections get to drain on shutdown.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            gateway_port: 8080,
            control_port: 8081,
            shutdown_timeout_secs: 10,
        }
    }
}

/// Per-subscriber queue sizes and connection timers.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeSettings {
    /// Outbound queue capacity of each WebSocket client.
    pub hub_queue_capacity: usize,
    /// Queue capacity of each SSE subscription.
    pub stream_queue_capacity: usize,
    /// Idle interval after which an SSE stream emits a keep-alive comment.
    pub stream_heartbeat_secs: u64,
    /// WebSocket ping interval. `0` disables pings.
    pub ws_ping_interval_secs: u64,
    /// Maximum accepted inbound WebSocket message size in bytes.
    pub ws_max_message_size: usize,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            hub_queue_capacity: 32,
            stream_queue_capacity: 16,
            stream_heartbeat_secs: 30,
            ws_ping_interval_secs: 30,
            ws_max_message_size: 64 * 1024,
        }
    }
}

/// Log line encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable multi-line output.
    Pretty,
}

/// Log output settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive, used when `RUST_LOG` is unset.
    pub level: String,
    /// Line encoding.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "debug".to_string(),
            format: LogFormat::Json,
        }
    }
}

/// Control-plane storage settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite database file. `:memory:` opens a throwaway in-memory store.
    pub path: PathBuf,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: nexus_home().join("nexus.db"),
        }
    }
}

/// `~/.nexus`, falling back to `/tmp/.nexus` when `HOME` is unset.
pub fn nexus_home() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".nexus")
}
