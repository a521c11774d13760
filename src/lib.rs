//! UAST Dashboard Backend Library
//!
//! This library provides the HTTP gateway of the UAST dashboard: it forwards parse
//! and version requests to a parsing service over its binary protocol, filters the
//! returned syntax trees with path queries and relays gist snippets.

use axum::{
    Router,
    routing::{get, post},
};
use clap::Parser;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::core::backend_client::{BackendError, BackendFactory};
use crate::web::gist::GistFetcher;

pub mod core;
pub mod web;

/// Version reported by `/api/version` as the dashboard's own.
pub const DASHBOARD_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_BBLFSH_ADDR: &str = "localhost:9432";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[arg(
        long,
        env = "DASHBOARD_ADDR",
        default_value = DEFAULT_ADDR,
        help = "Address the HTTP server listens on"
    )]
    pub addr: String,
    #[arg(
        long,
        env = "BBLFSH_ADDR",
        default_value = DEFAULT_BBLFSH_ADDR,
        help = "Address of the default parsing service"
    )]
    pub bblfsh_addr: String,
    #[arg(long, env = "DASHBOARD_DEBUG", help = "Log at debug level")]
    pub debug: bool,
}

/// Dependencies shared by every handler. Nothing in here is mutated after startup.
#[derive(Clone)]
pub struct AppState {
    pub backends: BackendFactory,
    pub gists: GistFetcher,
    pub dashboard_version: String,
}

impl AppState {
    pub fn new(backends: BackendFactory, dashboard_version: impl Into<String>) -> Self {
        Self {
            backends,
            gists: GistFetcher::default(),
            dashboard_version: dashboard_version.into(),
        }
    }

    /// Connect to the default parsing service named in `args`.
    pub async fn from_args(args: &Args) -> Result<Self, BackendError> {
        let backends = BackendFactory::with_default_addr(&args.bblfsh_addr).await?;
        tracing::info!(addr = %args.bblfsh_addr, "connected to default parsing service");
        Ok(Self::new(backends, DASHBOARD_VERSION))
    }
}

/// All routes live under `/api`.
pub fn router(app_state: AppState) -> Router {
    let api = Router::new()
        .route("/parse", post(web::parse_handler))
        .route("/version", post(web::version_handler))
        .route("/gist", get(web::gist_handler));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}
