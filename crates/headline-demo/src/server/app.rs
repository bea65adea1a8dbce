use crate::server::routes;
use crate::state::AppState;
use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Opt-in for cross-origin requests from anywhere
pub const ALLOW_ANY_ORIGIN_ENV: &str = "HEADLINE_DEMO_ALLOW_ANY_ORIGIN";

/// Build the Axum application
pub fn build_app(state: AppState) -> Router {
    // CORS defaults to local origins; override only for explicit demo use.
    let allow_any_origin = std::env::var(ALLOW_ANY_ORIGIN_ENV)
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    let cors = cors_layer(allow_any_origin);

    // API routes
    let api_routes = Router::new()
        .route("/health", get(routes::health))
        // Models
        .route("/models", get(routes::list_models))
        .route("/models/load", post(routes::load_models))
        .route("/predict", post(routes::predict))
        // Hello page data
        .route("/hello/data", get(routes::hello_data));

    Router::new()
        .route("/", get(routes::index_page))
        .route("/hello", get(routes::hello_page))
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

fn cors_layer(allow_any_origin: bool) -> CorsLayer {
    if allow_any_origin {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list([
                HeaderValue::from_static("http://localhost:8501"),
                HeaderValue::from_static("http://127.0.0.1:8501"),
            ]))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Run the server until Ctrl+C or SIGTERM
pub async fn run_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Headline classifier listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::warn!("Shutdown signal received, stopping server...");
}
