use std::env;

use tracing_subscriber::EnvFilter;

const QUIET_DEPENDENCIES: &str = "hyper_util=warn,reqwest=warn,rusqlite=warn";

pub fn init_logging() {
    let directive = filter_directive(env::var("RUST_LOG").ok(), env::var("LOG_LEVEL").ok());

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directive))
        .with_target(false)
        .init();
}

/// `RUST_LOG` wins as-is; otherwise `LOG_LEVEL` (default info) for this crate
/// with noisy HTTP internals held at warn.
fn filter_directive(rust_log: Option<String>, log_level: Option<String>) -> String {
    if let Some(rust_log) = rust_log.filter(|val| !val.trim().is_empty()) {
        return rust_log;
    }
    let level = log_level
        .filter(|val| !val.trim().is_empty())
        .unwrap_or_else(|| "INFO".to_string())
        .to_lowercase();
    format!("{},{}", level, QUIET_DEPENDENCIES)
}
