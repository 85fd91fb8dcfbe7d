//! # nexus
//!
//! Entry point for the gateway and control-plane listeners. Both run from
//! the same binary against the same SQLite file:
//!
//! ```text
//! nexus gateway            # ingestion, WebSocket, SSE
//! nexus control            # tenant / API key / route administration
//! ```

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nexus_server::{ControlServer, GatewayConfig, GatewayServer, ServerHandle, ShutdownCoordinator};
use nexus_settings::GatewaySettings;
use nexus_store::{ControlStore, Database};
use tracing::info;

/// Nexus multi-tenant event gateway.
#[derive(Parser, Debug)]
#[command(name = "nexus", about = "Multi-tenant real-time event gateway")]
struct Cli {
    /// Settings file (defaults to `$NEXUS_SETTINGS` or `~/.nexus/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Path to the `SQLite` database (overrides settings).
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Serve event ingestion and live delivery.
    Gateway {
        /// Port to bind (overrides settings).
        #[arg(long)]
        port: Option<u16>,
    },
    /// Serve the administration API.
    Control {
        /// Port to bind (overrides settings).
        #[arg(long)]
        port: Option<u16>,
    },
}

impl Cli {
    fn load_settings(&self) -> Result<GatewaySettings> {
        let path = self
            .settings
            .clone()
            .unwrap_or_else(nexus_settings::settings_path);
        let mut settings = nexus_settings::load_settings_from_path(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;

        if let Some(db_path) = &self.db_path {
            settings.database.path.clone_from(db_path);
        }
        match self.command {
            Command::Gateway { port: Some(port) } => settings.server.gateway_port = port,
            Command::Control { port: Some(port) } => settings.server.control_port = port,
            _ => {}
        }
        settings.validate().context("Invalid settings")?;
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.load_settings()?;
    nexus_logging::init_subscriber(&settings.logging);

    let db = Database::open(&settings.database.path).with_context(|| {
        format!(
            "Failed to open database at {}",
            settings.database.path.display()
        )
    })?;
    let store = ControlStore::new(db);
    let config = GatewayConfig::from(&settings);
    let timeout = config.shutdown_timeout;
    info!(env = %settings.env, "starting nexus");

    match cli.command {
        Command::Gateway { .. } => {
            let server = GatewayServer::new(config, Arc::new(store.clone()), Arc::new(store));
            let handle = server.listen().await.context("Failed to bind gateway")?;
            info!("gateway listening on http://{}", handle.addr);
            run_until_signal(server.shutdown(), handle, timeout).await;
        }
        Command::Control { .. } => {
            let server = ControlServer::new(config, store);
            let handle = server.listen().await.context("Failed to bind control plane")?;
            info!("control plane listening on http://{}", handle.addr);
            run_until_signal(server.shutdown(), handle, timeout).await;
        }
    }

    info!("shutdown complete");
    Ok(())
}

async fn run_until_signal(
    shutdown: &ShutdownCoordinator,
    handle: ServerHandle,
    timeout: std::time::Duration,
) {
    nexus_server::wait_for_signal().await;
    info!("shutting down");
    shutdown
        .graceful_shutdown(vec![handle.task], Some(timeout))
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_subcommand() {
        let cli = Cli::parse_from(["nexus", "gateway"]);
        assert_eq!(cli.command, Command::Gateway { port: None });
        assert!(cli.settings.is_none());
    }

    #[test]
    fn control_subcommand_with_port() {
        let cli = Cli::parse_from(["nexus", "control", "--port", "9001"]);
        assert_eq!(cli.command, Command::Control { port: Some(9001) });
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["nexus", "gateway", "--db-path", "/tmp/n.db"]);
        assert_eq!(cli.db_path, Some(PathBuf::from("/tmp/n.db")));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["nexus"]).is_err());
    }

    #[test]
    fn settings_file_and_flags_merge() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"server": {"gateway_port": 7000, "control_port": 7001}, "logging": {"level": "warn"}}"#,
        )
        .unwrap();
        let db = dir.path().join("nexus.db");

        let cli = Cli::parse_from([
            "nexus",
            "--settings",
            path.to_str().unwrap(),
            "--db-path",
            db.to_str().unwrap(),
            "control",
            "--port",
            "7101",
        ]);
        let settings = cli.load_settings().unwrap();
        assert_eq!(settings.server.gateway_port, 7000);
        assert_eq!(settings.server.control_port, 7101);
        assert_eq!(settings.logging.level, "warn");
        assert_eq!(settings.database.path, db);
    }

    #[test]
    fn invalid_settings_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        let cli = Cli::parse_from(["nexus", "--settings", path.to_str().unwrap(), "gateway"]);
        assert!(cli.load_settings().is_err());
    }

    #[tokio::test]
    async fn gateway_boots_and_shuts_down() {
        let store = ControlStore::in_memory().unwrap();
        let server = GatewayServer::new(
            GatewayConfig::default(),
            Arc::new(store.clone()),
            Arc::new(store),
        );
        let handle = server.listen().await.unwrap();
        assert_ne!(handle.addr.port(), 0);

        server.shutdown().shutdown();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle.task)
            .await
            .expect("shutdown timed out")
            .expect("join error");
    }
}
