/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Common utilities shared across examples.

use std::env;
use std::time::Duration;

/// Default CoD window requested by the simulated counterparties.
pub const DEFAULT_COD_WINDOW_MS: u64 = 2_000;

/// Default framer tick interval.
pub const DEFAULT_TICK_MS: u64 = 50;

/// Example configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ExampleConfig {
    /// Acceptor CompID.
    pub local_comp_id: String,
    /// CoD window requested on logon.
    pub cod_window: Duration,
    /// Framer tick interval.
    pub tick_interval: Duration,
}

impl ExampleConfig {
    /// Creates a new configuration for the acceptor side.
    #[must_use]
    pub fn acceptor() -> Self {
        Self {
            local_comp_id: env::var("FIX_SENDER").unwrap_or_else(|_| "EXCH".to_string()),
            cod_window: Duration::from_millis(env_millis("COD_WINDOW_MS", DEFAULT_COD_WINDOW_MS)),
            tick_interval: Duration::from_millis(env_millis("COD_TICK_MS", DEFAULT_TICK_MS)),
        }
    }
}

fn env_millis(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Initializes logging for examples.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_thread_names(true)
        .try_init();
}
