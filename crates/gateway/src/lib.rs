//! HTTP gateway for averygate.
//!
//! Exposes the record lookups, the chat endpoint, a health check and the
//! static chat UI. Upstream credentials and query syntax stay on the server.
//!
//! Built on Axum.

pub mod error;
pub mod routes;

use axum::{
    Router,
    extract::State,
    http::{Method, header},
    response::Json,
    routing::get,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{info, warn};

use averygate_chat::ChatService;
use averygate_config::{AppConfig, GatewayConfig};
use averygate_core::error::Error;
use averygate_records::{AirtableStore, RecordsClient};
use averygate_session::{InMemorySessionStore, SessionPolicy};

pub use error::ApiError;

/// Shared application state for the gateway.
pub struct AppState {
    pub records: RecordsClient,
    pub chat: ChatService,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(records: RecordsClient, chat: ChatService) -> Self {
        Self {
            records,
            chat,
            started_at: chrono::Utc::now(),
        }
    }

    /// Wire the Airtable store, the completion provider and the in-memory
    /// session store from configuration. Missing credentials are not an
    /// error here; the affected endpoints report them per request.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let store = AirtableStore::from_config(&config.records)?;
        let records = RecordsClient::new(Arc::new(store));

        let provider = averygate_providers::build_from_config(&config.completion)?;
        let sessions = Arc::new(InMemorySessionStore::new(SessionPolicy::from_config(
            &config.chat,
        )));

        let chat = ChatService::new(provider, sessions, records.clone())
            .with_system_prompt(config.chat.system_prompt.clone())
            .with_model_params(config.completion.model_params());

        Ok(Self::new(records, chat))
    }
}

/// Build the CORS layer from the configured origins.
fn cors_layer(config: &GatewayConfig) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Build the full router: API routes, health check, static UI, CORS and
/// HTTP trace logging.
pub fn build_router(state: SharedState, config: &GatewayConfig) -> Router {
    let mut app = routes::api_router()
        .route("/health", get(health_handler))
        .with_state(state);

    if config.static_dir.is_dir() {
        let assets = ServeDir::new(&config.static_dir).append_index_html_on_directories(true);
        app = app.nest_service("/chat-ui", assets);
    } else {
        warn!(
            dir = %config.static_dir.display(),
            "Static directory not found, /chat-ui disabled"
        );
    }

    app.layer(cors_layer(config))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server and run until Ctrl-C.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let state = Arc::new(AppState::from_config(&config)?);
    info!(
        records = state.records.store_name(),
        provider = state.chat.provider_name(),
        sessions = state.chat.sessions().name(),
        window = state.chat.sessions().retention_window(),
        "Gateway wired"
    );
    let app = build_router(state, &config.gateway);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    started_at: chrono::DateTime<chrono::Utc>,
    uptime_secs: i64,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        started_at: state.started_at,
        uptime_secs: (chrono::Utc::now() - state.started_at).num_seconds(),
    })
}
