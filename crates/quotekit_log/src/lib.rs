//! `quotekit_log` v1:
//! Process-wide `tracing` subscriber setup.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable checked before `RUST_LOG`.
pub const ENV_LOG: &str = "QUOTEKIT_LOG";

/// Level used when no level is given and neither environment variable is set.
pub const LEVEL_DEFAULT: &str = "info";

/// Pick the filter directive: an explicit `level`, then `QUOTEKIT_LOG`, then
/// `RUST_LOG`.
pub fn derive_filter_directive(
    level: Option<&str>,
    env_quotekit: Option<&str>,
    env_rust: Option<&str>,
) -> String {
    [level, env_quotekit, env_rust]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|v| !v.is_empty())
        .unwrap_or(LEVEL_DEFAULT)
        .to_string()
}

/// Install a stderr fmt subscriber. Calling it twice is harmless.
pub fn init_logging(level: Option<&str>) {
    let env_quotekit = std::env::var(ENV_LOG).ok();
    let env_rust = std::env::var("RUST_LOG").ok();
    let directive =
        derive_filter_directive(level, env_quotekit.as_deref(), env_rust.as_deref());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(LEVEL_DEFAULT));

    let res_init = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
    if res_init.is_ok() {
        tracing::debug!(%directive, "logging initialized");
    }
}
