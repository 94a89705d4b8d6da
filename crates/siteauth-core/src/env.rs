// Environment detection and logger initialization.

use std::sync::OnceLock;

static ENV_MODE: OnceLock<EnvMode> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvMode {
    Production,
    Development,
    Test,
}

impl EnvMode {
    /// Parse a mode name. Anything unrecognized is development.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "test" | "testing" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Detect the current environment mode from `SITEAUTH_ENV`, then `RUST_ENV`.
/// The result is cached for the life of the process.
pub fn detect_env_mode() -> EnvMode {
    *ENV_MODE.get_or_init(|| {
        let value = std::env::var("SITEAUTH_ENV")
            .or_else(|_| std::env::var("RUST_ENV"))
            .unwrap_or_default();
        EnvMode::parse(&value)
    })
}

pub fn is_production() -> bool {
    detect_env_mode() == EnvMode::Production
}

/// Default `EnvFilter` directive for the given mode.
pub fn default_filter(mode: EnvMode) -> &'static str {
    match mode {
        EnvMode::Production => "siteauth=info",
        EnvMode::Development | EnvMode::Test => "siteauth=debug",
    }
}

/// Install a `tracing` fmt subscriber. `RUST_LOG` wins over the mode default.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logger() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(detect_env_mode())));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .try_init();
}
