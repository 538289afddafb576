//! Error taxonomy for block signature generation.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::algorithm::{DigestError, UnsupportedAlgorithm};
use crate::cancel::{Failure, Stage, WorkerCause};

/// Errors returned when generating a block signature.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// The configured block size was zero.
    #[error("block size must be greater than zero")]
    ZeroBlockSize,
    /// The input contained no data.
    #[error("input file is empty")]
    EmptyInput,
    /// The input file could not be opened or inspected.
    #[error("failed to open input {}: {source}", path.display())]
    OpenInput {
        /// Path of the input file.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: io::Error,
    },
    /// Reading from the input failed.
    #[error("failed to read input: {0}")]
    ReadInput(#[source] io::Error),
    /// The input ended before the block was filled.
    #[error("input ended early: block needs {expected} byte(s) but only {actual} could be read")]
    ShortRead {
        /// Number of bytes the block required.
        expected: usize,
        /// Number of bytes actually read before end of input.
        actual: usize,
    },
    /// The output file could not be created or sized.
    #[error("failed to create output {}: {source}", path.display())]
    CreateOutput {
        /// Path of the output file.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: io::Error,
    },
    /// The output path names the input file.
    #[error("output {} is the input file", path.display())]
    OutputIsInput {
        /// Canonical path shared by input and output.
        path: PathBuf,
    },
    /// Writing to the output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] io::Error),
    /// A digest record addressed a block outside the signature.
    #[error("block {block} is outside a signature of {block_count} block(s)")]
    BlockOutOfRange {
        /// Offending block number.
        block: u64,
        /// Number of blocks the output was sized for.
        block_count: u64,
    },
    /// A digest did not have the width the output was sized for.
    #[error(transparent)]
    Digest(#[from] DigestError),
    /// The requested hash function is unknown.
    #[error(transparent)]
    Unsupported(#[from] UnsupportedAlgorithm),
    /// The signature would not fit in a file offset.
    #[error("signature of {block_count} block(s) with {digest_len}-byte digests exceeds the maximum file size")]
    OutputTooLarge {
        /// Number of blocks in the plan.
        block_count: u64,
        /// Width of each digest record.
        digest_len: usize,
    },
    /// A worker thread could not be started.
    #[error("failed to spawn {stage} thread: {source}")]
    Spawn {
        /// Stage the thread would have run.
        stage: Stage,
        /// Error reported by the operating system.
        #[source]
        source: io::Error,
    },
    /// A worker thread failed while the pipeline was running.
    ///
    /// The message stays generic because several workers may fail at once;
    /// the first recorded cause is available through
    /// [`std::error::Error::source`].
    #[error("worker thread failed (most probably I/O related)")]
    WorkerFailed {
        /// Stage of the first worker that failed.
        stage: Stage,
        /// First recorded cause.
        #[source]
        source: WorkerCause,
    },
}

impl SignatureError {
    /// Reports whether the error stems from invalid arguments rather than a
    /// runtime failure.
    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Self::ZeroBlockSize | Self::EmptyInput | Self::OutputIsInput { .. }
        )
    }

    pub(crate) fn worker_failed(failure: Option<Failure>) -> Self {
        match failure {
            Some(failure) => {
                let stage = failure.stage();
                Self::WorkerFailed {
                    stage,
                    source: failure.into_cause(),
                }
            }
            None => Self::WorkerFailed {
                stage: Stage::Producer,
                source: "run cancelled without a recorded cause".into(),
            },
        }
    }
}
