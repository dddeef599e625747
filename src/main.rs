use hls_relay::{config::Config, server};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // DEBUG only picks the default filter; RUST_LOG still wins when set
    let debug = config.as_ref().map(|c| c.debug).unwrap_or(false);
    init_tracing(debug);

    let config = match config {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Starting hls-relay v{} (debug logging {})",
        env!("CARGO_PKG_VERSION"),
        if config.debug { "on" } else { "off" }
    );

    if let Err(e) = server::start(config).await {
        error!("Failed to start server: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}
