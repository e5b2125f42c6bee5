//! Per-invocation log subscriber.
//!
//! Nothing here installs a global subscriber: every command builds its own
//! [`Dispatch`] and runs under it, so tests and embedding code can run
//! several commands in one process with different settings.

use tracing::level_filters::LevelFilter;
use tracing::Dispatch;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

/// Environment variable holding filter directives, e.g. `LOG_LEVEL=decibel=trace`.
pub const LOG_LEVEL_ENV_VAR: &str = "LOG_LEVEL";

/// Builds a dispatch writing formatted events to stderr.
///
/// `default_level` applies when `LOG_LEVEL` is unset or holds no usable
/// directive.
pub fn build_dispatch(default_level: LevelFilter) -> Dispatch {
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var(LOG_LEVEL_ENV_VAR)
        .from_env_lossy();
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter);
    Dispatch::new(subscriber)
}

/// The dispatch active on the calling thread, to be re-entered from
/// threads that do not inherit it.
pub fn current_dispatch() -> Dispatch {
    tracing::dispatcher::get_default(Dispatch::clone)
}
