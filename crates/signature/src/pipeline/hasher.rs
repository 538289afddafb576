//! Hasher worker: turns queued blocks into digests.

use crossbeam_channel::{Receiver, Sender};
use tracing::trace;

use super::shared::{BlockDigest, Job, PanicGuard, Shared};
use crate::algorithm::BlockHasher;
use crate::cancel::Stage;

/// Hashes jobs until the job channel drains or the run is cancelled.
///
/// The block buffer goes back to the pool as soon as its digest is computed;
/// the digest slot travels on to the result writer.
pub(crate) fn run(
    shared: &Shared,
    jobs: &Receiver<Job>,
    results: &Sender<BlockDigest>,
    mut hasher: Box<dyn BlockHasher>,
) {
    let _guard = PanicGuard::new(shared, Stage::Hasher);

    while let Some(Job {
        index,
        block,
        mut slot,
    }) = shared.token.recv(jobs)
    {
        if let Err(error) = hasher.digest_into(&block, &mut slot) {
            shared.fail(Stage::Hasher, error);
            return;
        }
        trace!(block = index, len = block.len(), "hashed block");

        shared.buffers.release(block);
        if results
            .send(BlockDigest {
                index,
                digest: slot,
            })
            .is_err()
        {
            // The writer only leaves early after cancelling.
            return;
        }
    }
}
