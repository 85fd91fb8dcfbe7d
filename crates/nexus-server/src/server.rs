//! Gateway and control-plane servers.
//!
//! Both listeners share the same outer stack: request IDs (generated when
//! absent and echoed back), request tracing, panic recovery, and permissive
//! CORS. Gateway routes other than `/healthz` sit behind API key
//! authentication.

use std::any::Any;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderName, Request};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::{Router, middleware};
use nexus_core::{RouteLookup, TenantAuthenticator};
use nexus_events::{EventService, LogEventService, RoutingResolver};
use nexus_realtime::{Broadcaster, ChannelHub, FanoutBroadcaster, StreamBroker};
use nexus_store::ControlStore;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::{Level, error, info, info_span};

use crate::auth::require_api_key;
use crate::config::GatewayConfig;
use crate::error::ApiError;
use crate::handlers::{control, events, socket, stream};
use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownCoordinator;

/// Header carrying the request ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared state of the gateway handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Ingestion backend.
    pub events: Arc<dyn EventService>,
    /// Channel resolution for ingested events.
    pub resolver: RoutingResolver,
    /// Fan-out to both registries.
    pub broadcaster: Arc<dyn Broadcaster>,
    /// API key to tenant resolution.
    pub authenticator: Arc<dyn TenantAuthenticator>,
    /// WebSocket registry.
    pub hub: Arc<ChannelHub>,
    /// SSE registry.
    pub broker: Arc<StreamBroker>,
    /// Acceptor configuration.
    pub config: Arc<GatewayConfig>,
    /// Shutdown coordinator. SSE streams hold its child tokens.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
}

/// Shared state of the control-plane handlers.
#[derive(Clone)]
pub struct ControlState {
    /// Administration store.
    pub store: ControlStore,
    /// When the server started.
    pub start_time: Instant,
}

/// A running listener.
pub struct ServerHandle {
    /// Bound address. Useful when the configured port was `0`.
    pub addr: SocketAddr,
    /// The serve task. Completes after graceful shutdown.
    pub task: JoinHandle<()>,
}

/// The event gateway: ingestion, WebSocket, and SSE.
pub struct GatewayServer {
    state: GatewayState,
}

impl GatewayServer {
    /// Create a gateway with log-only ingestion.
    pub fn new(
        config: GatewayConfig,
        routes: Arc<dyn RouteLookup>,
        authenticator: Arc<dyn TenantAuthenticator>,
    ) -> Self {
        Self::with_event_service(config, routes, authenticator, Arc::new(LogEventService::new()))
    }

    /// Create a gateway with a specific ingestion backend.
    pub fn with_event_service(
        config: GatewayConfig,
        routes: Arc<dyn RouteLookup>,
        authenticator: Arc<dyn TenantAuthenticator>,
        events: Arc<dyn EventService>,
    ) -> Self {
        let hub = Arc::new(ChannelHub::new(config.hub_queue_capacity));
        let broker = Arc::new(StreamBroker::new(config.stream_queue_capacity));
        let broadcaster = Arc::new(FanoutBroadcaster::new(hub.clone(), broker.clone()));
        Self {
            state: GatewayState {
                events,
                resolver: RoutingResolver::new(routes),
                broadcaster,
                authenticator,
                hub,
                broker,
                config: Arc::new(config),
                shutdown: Arc::new(ShutdownCoordinator::new()),
                start_time: Instant::now(),
            },
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let authed = Router::new()
            .route("/api/v1/events", post(events::ingest_event))
            .route("/ws", get(socket::ws_upgrade))
            .route("/sse/stream", get(stream::sse_subscribe))
            .route_layer(middleware::from_fn_with_state(
                self.state.authenticator.clone(),
                require_api_key,
            ));

        let router = Router::new()
            .route("/healthz", get(gateway_health))
            .merge(authed)
            .with_state(self.state.clone());
        with_http_layers(router)
    }

    /// Bind `host:gateway_port` and serve until shutdown.
    pub async fn listen(&self) -> io::Result<ServerHandle> {
        let addr = self.state.config.gateway_addr();
        serve(&addr, self.router(), self.state.shutdown.token(), "gateway").await
    }

    /// The WebSocket registry.
    pub fn hub(&self) -> &Arc<ChannelHub> {
        &self.state.hub
    }

    /// The SSE registry.
    pub fn broker(&self) -> &Arc<StreamBroker> {
        &self.state.broker
    }

    /// The shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.state.shutdown
    }
}

/// The administration API.
pub struct ControlServer {
    config: GatewayConfig,
    state: ControlState,
    shutdown: Arc<ShutdownCoordinator>,
}

impl ControlServer {
    /// Create a control-plane server over `store`.
    pub fn new(config: GatewayConfig, store: ControlStore) -> Self {
        Self {
            config,
            state: ControlState {
                store,
                start_time: Instant::now(),
            },
            shutdown: Arc::new(ShutdownCoordinator::new()),
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let router = Router::new()
            .route(
                "/control/tenants",
                post(control::create_tenant).get(control::list_tenants),
            )
            .route(
                "/control/tenants/{tenant_id}/api-keys",
                post(control::create_api_key),
            )
            .route(
                "/control/tenants/{tenant_id}/routes",
                get(control::list_routes).post(control::create_route),
            )
            .route("/healthz", get(control_health))
            .with_state(self.state.clone());
        with_http_layers(router)
    }

    /// Bind `host:control_port` and serve until shutdown.
    pub async fn listen(&self) -> io::Result<ServerHandle> {
        let addr = self.config.control_addr();
        serve(&addr, self.router(), self.shutdown.token(), "control").await
    }

    /// The shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }
}

fn with_http_layers(router: Router) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<Body>| {
                    let request_id = req
                        .headers()
                        .get(REQUEST_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default();
                    info_span!(
                        "http_request",
                        method = %req.method(),
                        path = %req.uri().path(),
                        request_id,
                    )
                })
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };
    ApiError::Internal(format!("handler panicked: {detail}")).into_response()
}

async fn serve(
    addr: &str,
    router: Router,
    shutdown: CancellationToken,
    name: &'static str,
) -> io::Result<ServerHandle> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!(server = name, addr = %local_addr, "listening");

    let task = tokio::spawn(async move {
        let result = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await;
        match result {
            Ok(()) => info!(server = name, "stopped"),
            Err(e) => error!(server = name, error = %e, "server failed"),
        }
    });

    Ok(ServerHandle {
        addr: local_addr,
        task,
    })
}

/// GET /healthz (gateway)
async fn gateway_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(
        health::health_check(state.start_time)
            .with_channels(state.hub.channel_count(), state.broker.channel_count()),
    )
}

/// GET /healthz (control plane)
async fn control_health(State(state): State<ControlState>) -> Json<HealthResponse> {
    Json(health::health_check(state.start_time))
}
