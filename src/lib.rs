pub mod agents; // LLM agents: medical, appointments, summary, lab report
pub mod api; // HTTP routes + chat WebSocket
pub mod auth;
pub mod chat; // Keyword router, buffers, slot prefetch
pub mod config;
pub mod db;
pub mod documents;
pub mod knowledge; // Embedding index for medical retrieval
pub mod llm;
pub mod models;
pub mod transcript;

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}
