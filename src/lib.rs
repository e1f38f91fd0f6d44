pub mod bundle;
pub mod config;
pub mod db;
pub mod models;
pub mod summary;
pub mod survey;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for the command-line entry points.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}
