use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `hostlink=debug`.
pub const LOG_ENV: &str = "HOSTLINK_LOG";

static INIT: Once = Once::new();

/// Installs a compact stderr subscriber once per process. An embedder that
/// already set a global subscriber keeps it.
pub fn init() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .try_init();
    });
}
