//! Concurrent signature generation.
//!
//! One run uses three kinds of threads:
//!
//! - the calling thread acts as producer, reading blocks in order into pooled
//!   buffers and queueing them as jobs;
//! - `N` hasher threads each own a [`BlockHasher`](crate::BlockHasher) and turn
//!   jobs into digests;
//! - one result writer thread stores each digest at its block's offset.
//!
//! Jobs and digests travel over `crossbeam-channel` channels. Buffers
//! circulate between the producer and the hashers through a pool, so memory
//! stays bounded no matter how large the input is. The first failure anywhere,
//! a panic on the calling thread included, cancels the run; every blocked
//! thread is woken, all threads are joined, and the partially written output
//! is removed.

mod hasher;
mod result_writer;
mod shared;

use std::fs;
use std::io::Read;
use std::num::NonZeroUsize;
use std::path::Path;
use std::thread::{self, Scope, ScopedJoinHandle};

use crossbeam_channel::Sender;
use tracing::{debug, info, instrument};

use crate::algorithm::{DigestAlgorithm, HashFunctionId};
use crate::cancel::Stage;
use crate::error::SignatureError;
use crate::header::SignatureHeader;
use crate::layout::BlockPlan;
use crate::reader::SequentialReader;
use crate::writer::SignatureWriter;

use shared::{Job, PanicGuard, Shared, WorkerChannels};

/// Block size used when none is configured (1 MiB).
pub const DEFAULT_BLOCK_SIZE: u32 = 1024 * 1024;

/// Hasher count used when the machine's parallelism cannot be determined.
pub const FALLBACK_HASHER_THREADS: usize = 4;

/// Pooled block buffers per hasher thread.
pub const DEFAULT_BUFFERS_PER_HASHER: usize = 2;

/// Configuration for [`generate_signature`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SignatureConfig {
    block_size: u32,
    hash: HashFunctionId,
    hasher_threads: Option<NonZeroUsize>,
    buffers_per_hasher: NonZeroUsize,
    sync_output: bool,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            hash: HashFunctionId::Crc32,
            hasher_threads: None,
            buffers_per_hasher: NonZeroUsize::MIN.saturating_add(DEFAULT_BUFFERS_PER_HASHER - 1),
            sync_output: false,
        }
    }
}

impl SignatureConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the block size. Zero is accepted here and rejected by the run.
    #[must_use]
    pub const fn with_block_size(mut self, block_size: u32) -> Self {
        self.block_size = block_size;
        self
    }

    /// Sets the hash function.
    #[must_use]
    pub const fn with_hash(mut self, hash: HashFunctionId) -> Self {
        self.hash = hash;
        self
    }

    /// Sets the number of hasher threads; zero selects the machine's
    /// available parallelism.
    #[must_use]
    pub const fn with_hasher_threads(mut self, threads: usize) -> Self {
        self.hasher_threads = NonZeroUsize::new(threads);
        self
    }

    /// Sets how many block buffers are pooled per hasher; clamped to one.
    #[must_use]
    pub const fn with_buffers_per_hasher(mut self, buffers: usize) -> Self {
        self.buffers_per_hasher = match NonZeroUsize::new(buffers) {
            Some(buffers) => buffers,
            None => NonZeroUsize::MIN,
        };
        self
    }

    /// Forces the output to stable storage before the run reports success.
    #[must_use]
    pub const fn with_sync_output(mut self, sync: bool) -> Self {
        self.sync_output = sync;
        self
    }

    /// Configured block size.
    #[must_use]
    pub const fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Configured hash function.
    #[must_use]
    pub const fn hash(&self) -> HashFunctionId {
        self.hash
    }

    /// Explicit hasher count, if any.
    #[must_use]
    pub const fn hasher_threads(&self) -> Option<NonZeroUsize> {
        self.hasher_threads
    }

    /// Pooled buffers per hasher.
    #[must_use]
    pub const fn buffers_per_hasher(&self) -> usize {
        self.buffers_per_hasher.get()
    }

    /// Whether the output is synced before success is reported.
    #[must_use]
    pub const fn sync_output(&self) -> bool {
        self.sync_output
    }

    /// Hasher count a run will use.
    #[must_use]
    pub fn resolved_hasher_threads(&self) -> usize {
        self.hasher_threads.map_or_else(
            || {
                thread::available_parallelism()
                    .map(NonZeroUsize::get)
                    .unwrap_or(FALLBACK_HASHER_THREADS)
            },
            NonZeroUsize::get,
        )
    }
}

/// Outcome of a successful run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SignatureSummary {
    /// Length of the input.
    pub file_size: u64,
    /// Nominal block length.
    pub block_size: u32,
    /// Number of digest records written.
    pub block_count: u64,
    /// Width of each digest record.
    pub digest_len: usize,
    /// Length of the signature file.
    pub output_len: u64,
    /// Hasher threads used.
    pub hasher_threads: usize,
    /// Identifier recorded in the header.
    pub hash_function_id: u16,
}

/// Generates the signature of the file at `input` into `output`.
///
/// The block size is validated before either file is touched; an empty input
/// is rejected before the output is created, and so is an output path that
/// resolves to the input file. On any failure the output file does not exist
/// when this returns.
///
/// # Errors
///
/// See [`SignatureError`]. Failures inside worker threads are reported as
/// [`SignatureError::WorkerFailed`] carrying the first recorded cause.
#[instrument(
    skip_all,
    fields(input = %input.display(), output = %output.display(), hash = %config.hash())
)]
pub fn generate_signature(
    input: &Path,
    output: &Path,
    config: &SignatureConfig,
) -> Result<SignatureSummary, SignatureError> {
    if config.block_size() == 0 {
        return Err(SignatureError::ZeroBlockSize);
    }
    let (reader, file_size) = SequentialReader::open(input)?;
    ensure_distinct(input, output)?;
    run(reader, file_size, output, &config.hash(), config)
}

/// Generates a signature for `file_size` bytes read from `reader`.
///
/// The hash function comes from `algorithm` rather than the configuration,
/// which lets callers supply their own [`DigestAlgorithm`].
///
/// # Errors
///
/// As [`generate_signature`]; a reader that ends before `file_size` bytes
/// yields [`SignatureError::ShortRead`].
#[instrument(skip_all, fields(file_size = file_size, output = %output.display()))]
pub fn generate_signature_with<R, A>(
    reader: R,
    file_size: u64,
    output: &Path,
    algorithm: &A,
    config: &SignatureConfig,
) -> Result<SignatureSummary, SignatureError>
where
    R: Read,
    A: DigestAlgorithm + ?Sized,
{
    run(
        SequentialReader::from_reader(reader),
        file_size,
        output,
        algorithm,
        config,
    )
}

fn run<R, A>(
    mut reader: SequentialReader<R>,
    file_size: u64,
    output: &Path,
    algorithm: &A,
    config: &SignatureConfig,
) -> Result<SignatureSummary, SignatureError>
where
    R: Read,
    A: DigestAlgorithm + ?Sized,
{
    let plan = BlockPlan::new(file_size, config.block_size())?;
    let digest_len = algorithm.digest_len();
    let output_len = plan.output_len(digest_len)?;
    let mut writer = SignatureWriter::create(output, digest_len, plan.block_count())?;

    let hashers = config.resolved_hasher_threads();
    let pool_size = pool_size(config.buffers_per_hasher(), hashers, plan.block_count());
    debug!(
        block_count = plan.block_count(),
        hashers, pool_size, digest_len, "starting pipeline"
    );

    let mut shared = Shared::new(
        plan.block_count(),
        plan.max_block_len() as usize,
        digest_len,
        pool_size,
    );

    let (job_tx, jobs) = crossbeam_channel::bounded(pool_size);
    let (results_tx, results_rx) = crossbeam_channel::unbounded();
    let channels = WorkerChannels {
        jobs,
        results_tx,
        results_rx,
    };

    let produced = thread::scope(|scope| {
        let shared = &shared;
        // Unwinding out of this closure must still release the workers,
        // otherwise the scope would wait on them forever.
        let _guard = PanicGuard::new(shared, Stage::Producer);
        let mut workers: Workers<'_> = Vec::with_capacity(hashers + 1);

        let started = spawn_workers(
            scope,
            shared,
            channels,
            &mut writer,
            algorithm,
            hashers,
            &mut workers,
        );
        let produced =
            started.and_then(|()| produce(shared, &mut reader, plan, digest_len, job_tx));
        if produced.is_err() {
            shared.cancel();
        }

        for (stage, handle) in workers {
            if handle.join().is_err() {
                shared.fail(stage, format!("{stage} thread panicked"));
            }
        }
        produced
    });

    produced?;
    if shared.token.is_cancelled() {
        return Err(SignatureError::worker_failed(shared.token.take_failure()));
    }

    writer.write_header(&SignatureHeader::new(
        algorithm.wire_id(),
        plan.file_size(),
        plan.block_size(),
    ))?;
    writer.finalize(config.sync_output())?;

    info!(
        block_count = plan.block_count(),
        output_len, "signature written"
    );
    Ok(SignatureSummary {
        file_size: plan.file_size(),
        block_size: plan.block_size(),
        block_count: plan.block_count(),
        digest_len,
        output_len,
        hasher_threads: hashers,
        hash_function_id: algorithm.wire_id(),
    })
}

type Workers<'scope> = Vec<(Stage, ScopedJoinHandle<'scope, ()>)>;

/// Starts the hasher threads and the result writer.
///
/// Threads started before a spawn failure are left in `workers` so the
/// caller can cancel and join them.
fn spawn_workers<'scope, A>(
    scope: &'scope Scope<'scope, '_>,
    shared: &'scope Shared,
    channels: WorkerChannels,
    writer: &'scope mut SignatureWriter,
    algorithm: &A,
    hashers: usize,
    workers: &mut Workers<'scope>,
) -> Result<(), SignatureError>
where
    A: DigestAlgorithm + ?Sized,
{
    let WorkerChannels {
        jobs,
        results_tx,
        results_rx,
    } = channels;

    for id in 0..hashers {
        let block_hasher = algorithm.new_hasher();
        let jobs = jobs.clone();
        let results = results_tx.clone();
        let handle = thread::Builder::new()
            .name(format!("blocksig-hasher-{id}"))
            .spawn_scoped(scope, move || {
                hasher::run(shared, &jobs, &results, block_hasher);
            })
            .map_err(|source| SignatureError::Spawn {
                stage: Stage::Hasher,
                source,
            })?;
        workers.push((Stage::Hasher, handle));
    }

    let handle = thread::Builder::new()
        .name("blocksig-writer".to_owned())
        .spawn_scoped(scope, move || result_writer::run(shared, &results_rx, writer))
        .map_err(|source| SignatureError::Spawn {
            stage: Stage::ResultWriter,
            source,
        })?;
    workers.push((Stage::ResultWriter, handle));
    Ok(())
}

/// Reads every block in order and sends it to the hashers.
///
/// Returns early without error when the run is cancelled by a worker; the
/// caller reports that failure after joining. Dropping `jobs` on return tells
/// the hashers no more blocks are coming.
fn produce<R: Read>(
    shared: &Shared,
    reader: &mut SequentialReader<R>,
    plan: BlockPlan,
    digest_len: usize,
    jobs: Sender<Job>,
) -> Result<(), SignatureError> {
    for (index, len) in plan.blocks() {
        let Some(mut block) = shared.buffers.acquire(&shared.token) else {
            debug!(block = index, "producer observed cancellation");
            return Ok(());
        };
        block.resize(len as usize, 0);
        reader.read_next_chunk(&mut block)?;

        let slot = shared
            .digests
            .try_acquire()
            .unwrap_or_else(|| vec![0u8; digest_len]);
        // Every job holds a pooled buffer, so the channel never fills.
        if jobs.send(Job { index, block, slot }).is_err() {
            debug!(block = index, "hashers exited before all blocks were sent");
            return Ok(());
        }
    }
    drop(jobs);
    Ok(())
}

/// Rejects an output path that resolves to the input file, which would
/// otherwise be truncated before it is read.
fn ensure_distinct(input: &Path, output: &Path) -> Result<(), SignatureError> {
    let (Ok(input), Ok(output)) = (fs::canonicalize(input), fs::canonicalize(output)) else {
        return Ok(());
    };
    if input == output {
        Err(SignatureError::OutputIsInput { path: output })
    } else {
        Ok(())
    }
}

/// Number of pooled buffers: enough to keep every hasher busy, never more
/// than there are blocks, and at least one.
fn pool_size(buffers_per_hasher: usize, hashers: usize, block_count: u64) -> usize {
    let wanted = buffers_per_hasher.saturating_mul(hashers);
    let blocks = usize::try_from(block_count).unwrap_or(usize::MAX);
    wanted.min(blocks).max(1)
}
