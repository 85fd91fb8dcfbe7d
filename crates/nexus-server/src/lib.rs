//! # nexus-server
//!
//! Axum HTTP servers for the Nexus gateway.
//!
//! - Gateway: `POST /api/v1/events`, `GET /ws`, `GET /sse/stream`, all behind
//!   `X-Api-Key` authentication, plus `GET /healthz`
//! - Control plane: tenant, API key, and route administration
//! - Graceful shutdown via `tokio::signal` + `CancellationToken`

#![deny(unsafe_code)]

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod health;
pub mod server;
pub mod shutdown;

pub use config::GatewayConfig;
pub use error::{ApiError, ApiResult};
pub use server::{ControlServer, GatewayServer, ServerHandle};
pub use shutdown::{ShutdownCoordinator, wait_for_signal};
