//! Errors surfaced by the front-end.

use signature::SignatureError;
use thiserror::Error;

use crate::exit_code::ExitCode;

/// Failure of one command-line invocation.
#[derive(Debug, Error)]
pub enum CliError {
    /// The arguments could not be parsed or validated.
    #[error("{}", usage_message(.0))]
    Usage(#[source] clap::Error),
    /// Signature generation failed.
    #[error(transparent)]
    Signature(#[from] SignatureError),
}

impl CliError {
    /// Exit status for this error.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::Usage(_) | Self::Signature(_) => ExitCode::Error,
        }
    }
}

/// First line of a `clap` diagnostic without its `error: ` prefix.
fn usage_message(error: &clap::Error) -> String {
    let rendered = error.to_string();
    let first = rendered.lines().next().unwrap_or_default();
    first.strip_prefix("error: ").unwrap_or(first).to_owned()
}
