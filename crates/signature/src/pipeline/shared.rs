//! State shared between the producer and the worker threads of one run.

use std::thread;

use crossbeam_channel::{Receiver, Sender};
use tracing::warn;

use crate::cancel::{CancelToken, Stage, WorkerCause};
use crate::pool::Pool;

/// One block waiting to be hashed.
#[derive(Debug)]
pub(crate) struct Job {
    pub(crate) index: u64,
    pub(crate) block: Vec<u8>,
    pub(crate) slot: Vec<u8>,
}

/// A computed digest waiting to be written.
#[derive(Debug)]
pub(crate) struct BlockDigest {
    pub(crate) index: u64,
    pub(crate) digest: Vec<u8>,
}

#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) token: CancelToken,
    pub(crate) buffers: Pool<Vec<u8>>,
    pub(crate) digests: Pool<Vec<u8>>,
    pub(crate) block_count: u64,
}

impl Shared {
    /// Seeds `pool_size` block buffers of `buffer_len` bytes and as many
    /// digest slots.
    pub(crate) fn new(block_count: u64, buffer_len: usize, digest_len: usize, pool_size: usize) -> Self {
        Self {
            token: CancelToken::new(),
            buffers: Pool::with_items((0..pool_size).map(|_| vec![0u8; buffer_len])),
            digests: Pool::with_items((0..pool_size).map(|_| vec![0u8; digest_len])),
            block_count,
        }
    }

    /// Records a failure; every blocked thread wakes through the token.
    pub(crate) fn fail(&self, stage: Stage, cause: impl Into<WorkerCause>) {
        let cause = cause.into();
        let message = cause.to_string();
        if self.token.fail(stage, cause) {
            warn!(%stage, error = %message, "pipeline failed; cancelling run");
        }
    }

    /// Cancels the run without a cause.
    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }
}

/// Worker ends of the job and result channels.
///
/// The producer keeps the only job sender; hashers finish once it is dropped
/// and the channel drains. Each hasher holds a result sender, so the writer
/// sees a disconnect once every hasher has exited.
#[derive(Debug)]
pub(crate) struct WorkerChannels {
    pub(crate) jobs: Receiver<Job>,
    pub(crate) results_tx: Sender<BlockDigest>,
    pub(crate) results_rx: Receiver<BlockDigest>,
}

/// Cancels the run if the owning thread unwinds.
pub(crate) struct PanicGuard<'a> {
    shared: &'a Shared,
    stage: Stage,
}

impl<'a> PanicGuard<'a> {
    pub(crate) const fn new(shared: &'a Shared, stage: Stage) -> Self {
        Self { shared, stage }
    }
}

impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.shared.fail(self.stage, format!("{} thread panicked", self.stage));
        }
    }
}
