#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `cli` is the command-line front-end of `blocksig`. It parses arguments
//! with a [`clap`](https://docs.rs/clap/) command definition, installs the
//! diagnostic subscriber, and delegates to
//! [`signature::generate_signature`].
//!
//! # Design
//!
//! [`run`] accepts an iterator of arguments together with handles for
//! standard output and error and returns the process exit status, so the
//! whole surface can be exercised in-process by tests. The binary wires it to
//! the real process streams.
//!
//! # Invariants
//!
//! - `run` never panics; every failure becomes exit status `1` with a
//!   `blocksig: error:` line on standard error.
//! - Help and version output go to standard output and exit with status `0`.
//! - Invocations with fewer than two operands print the help text and exit
//!   with status `0`.
//!
//! # Examples
//!
//! ```
//! let mut stdout = Vec::new();
//! let mut stderr = Vec::new();
//! let status = cli::run(["blocksig", "--version"], &mut stdout, &mut stderr);
//!
//! assert_eq!(status, 0);
//! assert!(String::from_utf8_lossy(&stdout).starts_with("blocksig "));
//! assert!(stderr.is_empty());
//! ```

mod arguments;
mod error;
mod exit_code;

use std::error::Error as _;
use std::ffi::OsString;
use std::io::Write;

use logging::Verbosity;
use signature::{SignatureSummary, generate_signature};
use tracing::debug;

pub use crate::arguments::{
    Invocation, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE, SignatureRequest, parse_args,
};
pub use crate::error::CliError;
pub use crate::exit_code::ExitCode;

/// Program name used in diagnostics.
pub const PROGRAM_NAME: &str = "blocksig";

/// Maximum exit code representable by a Unix process.
const MAX_EXIT_CODE: i32 = u8::MAX as i32;

/// Help text printed for `--help` and for incomplete invocations.
pub const HELP_TEXT: &str = concat!(
    "blocksig - block-wise file signature generator\n",
    "\n",
    "Usage: blocksig <INPUT> <OUTPUT> [-bs <BLOCK_SIZE>] [-h <CRC32|MD5>] [-t <THREADS>] [-v]...\n",
    "\n",
    "Splits INPUT into fixed-size blocks, hashes every block, and writes a\n",
    "32-byte header followed by one digest per block to OUTPUT.\n",
    "\n",
    "Options:\n",
    "  -bs, --block-size <BLOCK_SIZE>  Block size in bytes, 1024..=67108864 (default 1048576).\n",
    "  -h, --hash <CRC32|MD5>          Hash function (default CRC32).\n",
    "  -t, --threads <THREADS>         Hasher threads; 0 uses every available core (default 0).\n",
    "      --sync                      Flush the signature to stable storage before exiting.\n",
    "  -v, --verbose                   Increase diagnostic output; repeat for more.\n",
    "      --help                      Show this help message and exit.\n",
    "  -V, --version                   Output version information and exit.\n",
    "\n",
    "Diagnostics go to standard error; RUST_LOG overrides the -v level.\n",
);

/// Runs the front-end with `arguments`, the first of which is the program
/// name, and returns the process exit status.
pub fn run<I, S, Out, Err>(arguments: I, stdout: &mut Out, stderr: &mut Err) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
    Out: Write,
    Err: Write,
{
    let invocation = match parse_args(arguments) {
        Ok(invocation) => invocation,
        Err(error) => return report(stderr, &error, false),
    };

    match invocation {
        Invocation::Help => write_or_fail(stdout, HELP_TEXT),
        Invocation::Version => write_or_fail(stdout, &version_line()),
        Invocation::Generate(request) => execute(&request, stdout, stderr),
    }
}

fn execute<Out, Err>(request: &SignatureRequest, stdout: &mut Out, stderr: &mut Err) -> i32
where
    Out: Write,
    Err: Write,
{
    // A subscriber may already be installed when run is called repeatedly.
    if logging::init_tracing(request.verbosity).is_err() {
        debug!("tracing subscriber already installed");
    }

    match generate_signature(&request.input, &request.output, &request.config) {
        Ok(summary) => {
            if request.verbosity >= Verbosity::Info {
                let line = render_summary(request, &summary);
                return write_or_fail(stdout, &line);
            }
            ExitCode::Ok.as_i32()
        }
        Err(error) => report(
            stderr,
            &CliError::from(error),
            request.verbosity >= Verbosity::Info,
        ),
    }
}

fn render_summary(request: &SignatureRequest, summary: &SignatureSummary) -> String {
    format!(
        "{}: {} block(s) of {} byte(s) hashed with {} on {} thread(s); {} byte(s) written to {}\n",
        request.input.display(),
        summary.block_count,
        summary.block_size,
        request.config.hash(),
        summary.hasher_threads,
        summary.output_len,
        request.output.display(),
    )
}

fn version_line() -> String {
    format!("{PROGRAM_NAME} {}\n", env!("CARGO_PKG_VERSION"))
}

/// Writes `error` to `stderr` and returns its exit status.
///
/// With `show_causes`, every underlying cause follows on its own line.
fn report<Err: Write>(stderr: &mut Err, error: &CliError, show_causes: bool) -> i32 {
    let _ = writeln!(stderr, "{PROGRAM_NAME}: error: {error}");
    if show_causes {
        let mut cause = error.source();
        while let Some(current) = cause {
            let _ = writeln!(stderr, "  caused by: {current}");
            cause = current.source();
        }
    }
    error.exit_code().as_i32()
}

fn write_or_fail<Out: Write>(stdout: &mut Out, text: &str) -> i32 {
    match stdout.write_all(text.as_bytes()).and_then(|()| stdout.flush()) {
        Ok(()) => ExitCode::Ok.as_i32(),
        Err(_) => ExitCode::Error.as_i32(),
    }
}

/// Converts a numeric exit code into an [`std::process::ExitCode`].
#[must_use]
pub fn exit_code_from(status: i32) -> std::process::ExitCode {
    let clamped = status.clamp(0, MAX_EXIT_CODE);
    std::process::ExitCode::from(clamped as u8)
}
