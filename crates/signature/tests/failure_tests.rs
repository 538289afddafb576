//! Failure propagation: every failure cancels the run, joins all threads,
//! and leaves no output behind.

use std::error::Error as _;
use std::io::{self, Cursor, Read};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use signature::{
    BlockHasher, DigestAlgorithm, DigestError, HashFunctionId, SignatureConfig, SignatureError,
    SignatureSummary, Stage, generate_signature_with,
};
use test_support::{ScratchDir, pattern_bytes};

/// Delegates to CRC32 but fails once a shared call budget is spent.
struct Exhausting {
    calls: Arc<AtomicUsize>,
    budget: usize,
    panic_instead: bool,
}

struct ExhaustingHasher {
    inner: Box<dyn BlockHasher>,
    calls: Arc<AtomicUsize>,
    budget: usize,
    panic_instead: bool,
}

impl DigestAlgorithm for Exhausting {
    fn wire_id(&self) -> u16 {
        HashFunctionId::Crc32.as_u16()
    }

    fn digest_len(&self) -> usize {
        HashFunctionId::Crc32.digest_len()
    }

    fn new_hasher(&self) -> Box<dyn BlockHasher> {
        Box::new(ExhaustingHasher {
            inner: HashFunctionId::Crc32.new_hasher(),
            calls: Arc::clone(&self.calls),
            budget: self.budget,
            panic_instead: self.panic_instead,
        })
    }
}

impl BlockHasher for ExhaustingHasher {
    fn digest_len(&self) -> usize {
        self.inner.digest_len()
    }

    fn digest_into(&mut self, block: &[u8], out: &mut [u8]) -> Result<(), DigestError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) >= self.budget {
            assert!(!self.panic_instead, "injected hasher panic");
            return Err(DigestError::LengthMismatch {
                expected: 0,
                actual: out.len(),
            });
        }
        self.inner.digest_into(block, out)
    }
}

/// Yields `good` bytes, then fails every read.
struct BrokenReader {
    inner: Cursor<Vec<u8>>,
    good: usize,
}

impl Read for BrokenReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let position = self.inner.position() as usize;
        if position >= self.good {
            return Err(io::Error::other("injected read failure"));
        }
        let limit = buf.len().min(self.good - position);
        self.inner.read(&mut buf[..limit])
    }
}

/// Yields `good` bytes, then panics.
struct PanickingReader {
    inner: Cursor<Vec<u8>>,
    good: usize,
}

impl Read for PanickingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let position = self.inner.position() as usize;
        assert!(position < self.good, "injected reader panic");
        let limit = buf.len().min(self.good - position);
        self.inner.read(&mut buf[..limit])
    }
}

/// CRC32, except that creating the second hasher panics.
#[derive(Default)]
struct FailingFactory {
    created: AtomicUsize,
}

impl DigestAlgorithm for FailingFactory {
    fn wire_id(&self) -> u16 {
        HashFunctionId::Crc32.as_u16()
    }

    fn digest_len(&self) -> usize {
        HashFunctionId::Crc32.digest_len()
    }

    fn new_hasher(&self) -> Box<dyn BlockHasher> {
        let previous = self.created.fetch_add(1, Ordering::SeqCst);
        assert_eq!(previous, 0, "injected hasher construction panic");
        HashFunctionId::Crc32.new_hasher()
    }
}

/// Runs `generate` on its own thread and reports whether it panicked.
///
/// Fails the test if the run neither returns nor panics within ten seconds.
fn panics_within_deadline<F>(generate: F) -> bool
where
    F: FnOnce() -> Result<SignatureSummary, SignatureError> + Send + 'static,
{
    let (done_tx, done_rx) = mpsc::channel();
    thread::spawn(move || {
        let outcome = panic::catch_unwind(AssertUnwindSafe(generate));
        let _ = done_tx.send(outcome.is_err());
    });
    done_rx
        .recv_timeout(Duration::from_secs(10))
        .expect("run did not finish after the calling thread panicked")
}

fn config(threads: usize) -> SignatureConfig {
    SignatureConfig::new()
        .with_block_size(64)
        .with_hasher_threads(threads)
}

#[test]
fn hasher_failure_reports_worker_failed_and_removes_output() {
    let scratch = ScratchDir::new().expect("scratch dir");
    let output = scratch.join("out.sig");
    let data = pattern_bytes(64 * 500, 1);
    let algorithm = Exhausting {
        calls: Arc::new(AtomicUsize::new(0)),
        budget: 20,
        panic_instead: false,
    };

    let error = generate_signature_with(
        Cursor::new(data.clone()),
        data.len() as u64,
        &output,
        &algorithm,
        &config(4),
    )
    .expect_err("hasher fails");

    match &error {
        SignatureError::WorkerFailed { stage, .. } => assert_eq!(*stage, Stage::Hasher),
        other => panic!("unexpected error: {other}"),
    }
    let cause = error.source().expect("cause recorded");
    assert!(cause.downcast_ref::<DigestError>().is_some());
    assert!(!output.exists());
    assert_eq!(scratch.entries().expect("list"), Vec::<String>::new());
}

#[test]
fn hasher_panic_is_contained() {
    let scratch = ScratchDir::new().expect("scratch dir");
    let output = scratch.join("out.sig");
    let data = pattern_bytes(64 * 100, 2);
    let algorithm = Exhausting {
        calls: Arc::new(AtomicUsize::new(0)),
        budget: 5,
        panic_instead: true,
    };

    let error = generate_signature_with(
        Cursor::new(data.clone()),
        data.len() as u64,
        &output,
        &algorithm,
        &config(2),
    )
    .expect_err("hasher panics");

    assert!(matches!(
        error,
        SignatureError::WorkerFailed {
            stage: Stage::Hasher,
            ..
        }
    ));
    assert!(!output.exists());
}

#[test]
fn failure_on_first_block_with_many_threads_returns_promptly() {
    let scratch = ScratchDir::new().expect("scratch dir");
    let output = scratch.join("out.sig");
    let data = pattern_bytes(64 * 2000, 3);
    let algorithm = Exhausting {
        calls: Arc::new(AtomicUsize::new(0)),
        budget: 0,
        panic_instead: false,
    };

    let started = Instant::now();
    let error = generate_signature_with(
        Cursor::new(data.clone()),
        data.len() as u64,
        &output,
        &algorithm,
        &config(64),
    )
    .expect_err("first block fails");
    assert!(matches!(error, SignatureError::WorkerFailed { .. }));
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!output.exists());
}

#[test]
fn read_error_propagates_directly() {
    let scratch = ScratchDir::new().expect("scratch dir");
    let output = scratch.join("out.sig");
    let data = pattern_bytes(64 * 50, 4);
    let reader = BrokenReader {
        inner: Cursor::new(data.clone()),
        good: 64 * 10 + 3,
    };

    let error = generate_signature_with(
        reader,
        data.len() as u64,
        &output,
        &HashFunctionId::Md5,
        &config(4),
    )
    .expect_err("read fails");

    match error {
        SignatureError::ReadInput(source) => {
            assert_eq!(source.to_string(), "injected read failure");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!output.exists());
}

#[test]
fn input_shorter_than_declared_size_is_a_short_read() {
    let scratch = ScratchDir::new().expect("scratch dir");
    let output = scratch.join("out.sig");
    let data = pattern_bytes(100, 5);

    let error = generate_signature_with(
        Cursor::new(data),
        1000,
        &output,
        &HashFunctionId::Crc32,
        &config(2),
    )
    .expect_err("input truncated");

    assert!(matches!(
        error,
        SignatureError::ShortRead {
            expected: 64,
            actual: 36
        }
    ));
    assert!(!output.exists());
}

#[test]
fn custom_algorithm_succeeds_within_budget() {
    let scratch = ScratchDir::new().expect("scratch dir");
    let output = scratch.join("out.sig");
    let data = pattern_bytes(64 * 8, 6);
    let algorithm = Exhausting {
        calls: Arc::new(AtomicUsize::new(0)),
        budget: 8,
        panic_instead: false,
    };

    let summary = generate_signature_with(
        Cursor::new(data.clone()),
        data.len() as u64,
        &output,
        &algorithm,
        &config(3),
    )
    .expect("exactly eight blocks");
    assert_eq!(summary.block_count, 8);
    assert!(output.exists());
}

#[test]
fn reader_panic_releases_workers_and_removes_output() {
    let scratch = ScratchDir::new().expect("scratch dir");
    let output = scratch.join("out.sig");
    let data = pattern_bytes(64 * 50, 7);
    let file_size = data.len() as u64;

    let run_output = output.clone();
    let panicked = panics_within_deadline(move || {
        let reader = PanickingReader {
            inner: Cursor::new(data),
            good: 64 * 3,
        };
        generate_signature_with(
            reader,
            file_size,
            &run_output,
            &HashFunctionId::Crc32,
            &config(2),
        )
    });

    assert!(panicked);
    assert!(!output.exists());
}

#[test]
fn hasher_construction_panic_releases_started_workers() {
    let scratch = ScratchDir::new().expect("scratch dir");
    let output = scratch.join("out.sig");
    let data = pattern_bytes(64 * 20, 8);
    let file_size = data.len() as u64;

    let run_output = output.clone();
    let panicked = panics_within_deadline(move || {
        generate_signature_with(
            Cursor::new(data),
            file_size,
            &run_output,
            &FailingFactory::default(),
            &config(4),
        )
    });

    assert!(panicked);
    assert!(!output.exists());
}
