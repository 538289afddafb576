#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `signature` splits a file into fixed-size blocks, hashes every block
//! concurrently, and writes a compact signature file: a 32-byte
//! [`SignatureHeader`] followed by one fixed-width digest per block, in block
//! order.
//!
//! # Design
//!
//! [`generate_signature`] runs a bounded pipeline. The calling thread reads
//! blocks sequentially into pooled buffers, a configurable number of hasher
//! threads compute digests, and a single writer thread places each digest at
//! its final offset in a pre-sized output. Memory use is bounded by the pool,
//! not by the input size.
//!
//! The first failure in any thread cancels the run through a shared
//! [`CancelToken`]; all threads are joined before the error is returned and
//! the incomplete output is removed.
//!
//! # Examples
//!
//! ```no_run
//! use std::path::Path;
//! use signature::{HashFunctionId, SignatureConfig, generate_signature};
//!
//! let config = SignatureConfig::new()
//!     .with_block_size(64 * 1024)
//!     .with_hash(HashFunctionId::Md5);
//! let summary = generate_signature(Path::new("disk.img"), Path::new("disk.sig"), &config)?;
//! println!("{} blocks", summary.block_count);
//! # Ok::<(), signature::SignatureError>(())
//! ```

mod algorithm;
mod cancel;
mod error;
mod header;
mod layout;
mod pipeline;
mod pool;
mod reader;
mod writer;

pub use crate::algorithm::{
    BlockHasher, DigestAlgorithm, DigestError, HashFunctionId, UnsupportedAlgorithm,
};
pub use crate::cancel::{CancelToken, Failure, Stage, WAKE_INTERVAL, WorkerCause};
pub use crate::error::SignatureError;
pub use crate::header::{FILE_MARK, FORMAT_VERSION, HEADER_LEN, HeaderError, SignatureHeader};
pub use crate::layout::{BlockPlan, digest_offset};
pub use crate::pipeline::{
    DEFAULT_BLOCK_SIZE, DEFAULT_BUFFERS_PER_HASHER, FALLBACK_HASHER_THREADS, SignatureConfig,
    SignatureSummary, generate_signature, generate_signature_with,
};
pub use crate::pool::Pool;
pub use crate::reader::SequentialReader;
pub use crate::writer::{OutputGuard, SignatureWriter};
