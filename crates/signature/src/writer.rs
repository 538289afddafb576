//! Positional writer for the signature file.
//!
//! The output is sized up front so digest records can land at their final
//! offsets in any order. Until [`SignatureWriter::finalize`] succeeds, the
//! file is owned by an [`OutputGuard`] and removed when the writer drops.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::algorithm::DigestError;
use crate::error::SignatureError;
use crate::header::{HEADER_LEN, SignatureHeader};
use crate::layout::digest_offset;

/// Byte written before the file is extended to its final length.
const PLACEHOLDER: &[u8] = b"x";

/// Removes a file on drop unless disarmed.
///
/// Removal errors are ignored; the guard only runs on failure paths where the
/// original error is already being reported.
#[derive(Debug)]
pub struct OutputGuard {
    path: PathBuf,
    armed: bool,
}

impl OutputGuard {
    /// Creates an armed guard for `path`.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    /// Keeps the file when the guard drops.
    pub fn disarm(&mut self) {
        self.armed = false;
    }

    /// Path the guard owns.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for OutputGuard {
    fn drop(&mut self) {
        if self.armed {
            debug!(path = %self.path.display(), "removing incomplete signature");
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Writes the header and digest records of one signature file.
#[derive(Debug)]
pub struct SignatureWriter {
    // Declared before `guard` so the handle closes before removal.
    file: File,
    guard: OutputGuard,
    digest_len: usize,
    block_count: u64,
    file_len: u64,
}

impl SignatureWriter {
    /// Creates or truncates `path` and sizes it for `block_count` records of
    /// `digest_len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::OutputTooLarge`] when the final length
    /// overflows and [`SignatureError::CreateOutput`] when the file cannot be
    /// created or resized. A partially created file is removed.
    pub fn create(path: &Path, digest_len: usize, block_count: u64) -> Result<Self, SignatureError> {
        let file_len = (digest_len as u64)
            .checked_mul(block_count)
            .and_then(|records| records.checked_add(HEADER_LEN as u64))
            .ok_or(SignatureError::OutputTooLarge {
                block_count,
                digest_len,
            })?;
        let create_error = |source| SignatureError::CreateOutput {
            path: path.to_path_buf(),
            source,
        };

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(create_error)?;

        let mut writer = Self {
            file,
            guard: OutputGuard::new(path.to_path_buf()),
            digest_len,
            block_count,
            file_len,
        };
        writer.file.write_all(PLACEHOLDER).map_err(create_error)?;
        writer.file.set_len(file_len).map_err(create_error)?;

        debug!(path = %path.display(), file_len, block_count, "sized signature output");
        Ok(writer)
    }

    /// Writes `header` at offset zero.
    pub fn write_header(&mut self, header: &SignatureHeader) -> Result<(), SignatureError> {
        self.file
            .seek(SeekFrom::Start(0))
            .and_then(|_| header.write_to(&mut self.file))
            .map_err(SignatureError::WriteOutput)
    }

    /// Writes the digest record for `block`.
    ///
    /// # Errors
    ///
    /// Rejects digests of the wrong width and blocks past the end so the file
    /// never grows beyond its planned length.
    pub fn write_digest(&mut self, block: u64, digest: &[u8]) -> Result<(), SignatureError> {
        if digest.len() != self.digest_len {
            return Err(DigestError::LengthMismatch {
                expected: self.digest_len,
                actual: digest.len(),
            }
            .into());
        }
        if block >= self.block_count {
            return Err(SignatureError::BlockOutOfRange {
                block,
                block_count: self.block_count,
            });
        }

        let offset = digest_offset(block, self.digest_len);
        self.file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.file.write_all(digest))
            .map_err(SignatureError::WriteOutput)
    }

    /// Flushes the file and keeps it on disk.
    ///
    /// With `sync` set, file data is also forced to stable storage.
    pub fn finalize(mut self, sync: bool) -> Result<(), SignatureError> {
        self.file.flush().map_err(SignatureError::WriteOutput)?;
        if sync {
            self.file.sync_all().map_err(SignatureError::WriteOutput)?;
        }
        if let Err(error) = self.verify_len() {
            warn!(path = %self.guard.path().display(), %error, "signature length changed");
            return Err(SignatureError::WriteOutput(error));
        }
        self.guard.disarm();
        Ok(())
    }

    fn verify_len(&self) -> io::Result<()> {
        let actual = self.file.metadata()?.len();
        if actual == self.file_len {
            Ok(())
        } else {
            Err(io::Error::other(format!(
                "expected {} byte(s), found {actual}",
                self.file_len
            )))
        }
    }

    /// Path of the output file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.guard.path()
    }

    /// Final length of the output file.
    #[must_use]
    pub const fn file_len(&self) -> u64 {
        self.file_len
    }

    /// Width of each digest record.
    #[must_use]
    pub const fn digest_len(&self) -> usize {
        self.digest_len
    }
}
