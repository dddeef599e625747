pub mod handlers;
pub mod public_url;
pub mod state;

use crate::{config::Config, error::Result};
use axum::{Router, middleware, routing::get};
use state::AppState;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Build the application router.
///
/// Separated from [`start`] so tests can drive it with `oneshot` without
/// binding a socket.
pub fn build_router(config: Config) -> Result<Router> {
    let state = AppState::new(config)?;

    let proxy_routes = Router::new()
        .route(
            "/proxy",
            get(handlers::proxy::serve_proxy).options(handlers::proxy::preflight),
        )
        .route_layer(middleware::map_response(handlers::proxy::relay_headers));

    let app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::health::metrics))
        .merge(proxy_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

/// Start the Axum HTTP server and run until Ctrl-C / SIGTERM
pub async fn start(config: Config) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let addr = config.bind_addr();
    let app = build_router(config)?;

    // Bind TCP listener
    let listener = match tokio::net::TcpListener::bind(addr.as_str()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    info!("Relay listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("Relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
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

    info!("Shutdown signal received");
}
