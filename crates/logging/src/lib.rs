#![deny(unsafe_code)]
#![deny(missing_docs)]

//! Diagnostic output for blocksig.
//!
//! Library crates emit events through the [`tracing`] macros and never
//! install a subscriber. The binary calls [`init_tracing`] once with the
//! [`Verbosity`] derived from its `-v` flags; `RUST_LOG` takes precedence
//! when set.

mod tracing_bridge;
mod verbosity;

pub use tracing_bridge::{FILTER_ENV, build_filter, init_tracing, subscriber_with_writer};
pub use verbosity::Verbosity;
