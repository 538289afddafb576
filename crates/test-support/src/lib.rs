//! Shared fixtures for the blocksig test suites.
//!
//! Nothing here is used outside `[dev-dependencies]`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Deterministic, non-repeating-looking test data.
///
/// Each `seed` yields a different stream, so files built with different
/// seeds produce different digests for every block.
#[must_use]
pub fn pattern_bytes(len: usize, seed: u8) -> Vec<u8> {
    // xorshift32; never seeded with zero
    let mut state = u32::from(seed).wrapping_mul(0x9E37_79B9) | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect()
}

/// Reference digest records computed serially, block by block.
///
/// `digest` hashes one block; the result is every block's digest
/// concatenated in block order, which is what a signature holds after its
/// header.
pub fn expected_records<F>(data: &[u8], block_size: usize, digest: F) -> Vec<u8>
where
    F: Fn(&[u8]) -> Vec<u8>,
{
    data.chunks(block_size).flat_map(digest).collect()
}

/// Temporary directory with helpers for input and output paths.
///
/// The directory and everything in it is removed on drop.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Creates a fresh directory under the system temp location.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    /// Root of the scratch directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of `name` inside the directory; the file is not created.
    #[must_use]
    pub fn join(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Writes `contents` to `name` and returns its path.
    pub fn write(&self, name: &str, contents: &[u8]) -> io::Result<PathBuf> {
        let path = self.join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Lists the file names currently in the directory, sorted.
    pub fn entries(&self) -> io::Result<Vec<String>> {
        let mut names = fs::read_dir(self.dir.path())?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<io::Result<Vec<_>>>()?;
        names.sort();
        Ok(names)
    }
}
