//! Strictly sequential block reader over the input.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::error::SignatureError;

/// Reads consecutive chunks from the start of an input.
///
/// Each call to [`read_next_chunk`](Self::read_next_chunk) continues where the
/// previous one stopped; there is no seeking.
#[derive(Debug)]
pub struct SequentialReader<R = File> {
    inner: R,
    position: u64,
}

impl SequentialReader<File> {
    /// Opens `path` and returns the reader with the file's size.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::OpenInput`] when the file cannot be opened,
    /// its metadata cannot be read, or it is not a regular file.
    pub fn open(path: &Path) -> Result<(Self, u64), SignatureError> {
        let open_error = |source| SignatureError::OpenInput {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(open_error)?;
        let metadata = file.metadata().map_err(open_error)?;
        if !metadata.is_file() {
            return Err(open_error(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a regular file",
            )));
        }

        Ok((Self::from_reader(file), metadata.len()))
    }
}

impl<R: Read> SequentialReader<R> {
    /// Wraps an already opened source positioned at its start.
    pub const fn from_reader(inner: R) -> Self {
        Self { inner, position: 0 }
    }

    /// Fills `buf` completely with the next bytes of the input.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::ShortRead`] when the input ends before `buf`
    /// is full and [`SignatureError::ReadInput`] for any other I/O failure.
    /// Interrupted reads are retried.
    pub fn read_next_chunk(&mut self, buf: &mut [u8]) -> Result<(), SignatureError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => {
                    return Err(SignatureError::ShortRead {
                        expected: buf.len(),
                        actual: filled,
                    });
                }
                Ok(n) => filled += n,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => return Err(SignatureError::ReadInput(error)),
            }
        }
        self.position += filled as u64;
        Ok(())
    }

    /// Bytes consumed so far.
    #[must_use]
    pub const fn position(&self) -> u64 {
        self.position
    }

    /// Returns the wrapped source.
    pub fn into_inner(self) -> R {
        self.inner
    }
}
