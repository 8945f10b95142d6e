use std::sync::Arc;

use tracing::{info, warn};

mod backend;
mod config;
mod conversation;
mod error;
mod repl;

use crate::backend::BackendClient;
use crate::config::StaticConfig;
use crate::conversation::Conversation;
use crate::repl::Repl;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_logging();

    info!("Starting Folio client v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration (file + FOLIO__-prefixed environment)
    let static_config = StaticConfig::load()?;
    info!(
        backend = %static_config.backend.base_url,
        timeout_secs = static_config.backend.request_timeout_secs,
        "Configuration loaded"
    );

    // Initialize the backend client
    let backend = Arc::new(BackendClient::new(static_config.backend.clone())?);

    // Check backend availability; the session still starts when it is down,
    // uploads and questions just fail until it comes back.
    if backend.health_check().await? {
        info!(url = %static_config.backend.base_url, "Backend is available");
    } else {
        warn!(url = %static_config.backend.base_url, "Backend is not reachable");
    }

    // Wire the conversation manager to the backend's question endpoint
    let (conversation, answer_rx) = Conversation::new(backend.clone());

    Repl::new(conversation, backend, static_config.limits.clone())
        .run(answer_rx)
        .await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let format = fmt::format()
        .with_target(true)
        .with_thread_ids(true)
        .compact();

    // Use RUST_LOG if set; otherwise stay quiet below warn so log lines
    // don't interleave with the interactive prompt.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("folio=warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter)
        .init();
}
