//! Subscriber construction for the blocksig binary.
//!
//! Events are formatted by `tracing_subscriber::fmt` and written to stderr,
//! leaving stdout free for command output. Thread names are included so
//! events from `blocksig-hasher-N` and `blocksig-writer` can be told apart.

use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

use crate::verbosity::Verbosity;

/// Environment variable that overrides the verbosity flags.
pub const FILTER_ENV: &str = "RUST_LOG";

/// Builds the event filter.
///
/// A non-empty, parseable `env_override` wins; otherwise the filter allows
/// everything at or above `verbosity`.
#[must_use]
pub fn build_filter(verbosity: Verbosity, env_override: Option<&str>) -> EnvFilter {
    env_override
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(verbosity.directive()))
}

/// Creates a formatting subscriber writing to `writer`.
pub fn subscriber_with_writer<W>(
    verbosity: Verbosity,
    env_override: Option<&str>,
    writer: W,
) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(verbosity, env_override))
        .with_writer(writer)
        .with_thread_names(true)
        .with_target(false)
        .with_ansi(false)
        .finish()
}

/// Installs the global subscriber, writing to stderr.
///
/// # Errors
///
/// Fails when a global subscriber is already installed.
pub fn init_tracing(verbosity: Verbosity) -> Result<(), TryInitError> {
    let env_override = std::env::var(FILTER_ENV).ok();
    subscriber_with_writer(verbosity, env_override.as_deref(), std::io::stderr).try_init()
}
