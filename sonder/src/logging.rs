//! Process-wide tracing subscriber
//!
//! Hosts call `init_logging` once at startup. Later calls are no-ops, whatever
//! filter they pass; the first filter stays in effect.

use once_cell::sync::OnceCell;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::interface::SonderError;

static ACTIVE_FILTER: OnceCell<String> = OnceCell::new();

/// Install a stderr fmt subscriber filtered by `filter` (EnvFilter syntax,
/// e.g. "sonder=debug"). An empty filter defaults to "warn".
#[uniffi::export]
pub fn init_logging(filter: String) -> Result<(), SonderError> {
    if let Some(active) = ACTIVE_FILTER.get() {
        debug!(active = %active, requested = %filter, "logging already initialized");
        return Ok(());
    }

    let directives = if filter.trim().is_empty() { "warn".to_string() } else { filter };
    let env_filter = EnvFilter::try_new(&directives)
        .map_err(|e| SonderError::InvalidInput(format!("log filter `{}`: {}", directives, e)))?;

    ACTIVE_FILTER.get_or_try_init(|| {
        // A subscriber installed by the host takes precedence
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
        Ok::<_, SonderError>(directives)
    })?;
    Ok(())
}

/// The filter installed by the first successful `init_logging` call
pub fn active_filter() -> Option<&'static str> {
    ACTIVE_FILTER.get().map(String::as_str)
}
