//! Result writer worker: the only thread that touches the output file while
//! the pipeline runs.

use crossbeam_channel::Receiver;
use tracing::trace;

use super::shared::{BlockDigest, PanicGuard, Shared};
use crate::cancel::Stage;
use crate::writer::SignatureWriter;

/// Writes one digest per block at its offset, stopping early on cancellation.
pub(crate) fn run(shared: &Shared, results: &Receiver<BlockDigest>, writer: &mut SignatureWriter) {
    let _guard = PanicGuard::new(shared, Stage::ResultWriter);

    for written in 0..shared.block_count {
        let Some(BlockDigest { index, digest }) = shared.token.recv(results) else {
            if !shared.token.is_cancelled() {
                shared.fail(
                    Stage::ResultWriter,
                    format!(
                        "hashers stopped after {written} of {} digest(s)",
                        shared.block_count
                    ),
                );
            }
            return;
        };
        if let Err(error) = writer.write_digest(index, &digest) {
            shared.fail(Stage::ResultWriter, error);
            return;
        }
        trace!(block = index, "wrote digest");
        shared.digests.release(digest);
    }
}
