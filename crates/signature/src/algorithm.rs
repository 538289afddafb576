//! Hash function selection and the per-thread hashing seam used by workers.

use core::fmt;
use core::marker::PhantomData;
use core::str::FromStr;

use checksums::strong::{Crc32, Md5, StrongDigest};
use thiserror::Error;

/// Hash functions the signature format can record.
///
/// The discriminant is the identifier stored in the signature header.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[repr(u16)]
pub enum HashFunctionId {
    /// CRC-32 (IEEE), stored as four little-endian bytes.
    #[default]
    Crc32 = 0,
    /// MD5, stored as its sixteen-byte digest.
    Md5 = 1,
}

impl HashFunctionId {
    /// Every supported hash function, in identifier order.
    pub const ALL: [Self; 2] = [Self::Crc32, Self::Md5];

    /// Identifier written to the signature header.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Canonical upper-case name accepted on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Crc32 => "CRC32",
            Self::Md5 => "MD5",
        }
    }

    /// Width of one digest record in bytes.
    #[inline]
    #[must_use]
    pub const fn digest_len(self) -> usize {
        match self {
            Self::Crc32 => <Crc32 as StrongDigest>::DIGEST_LEN,
            Self::Md5 => <Md5 as StrongDigest>::DIGEST_LEN,
        }
    }

    /// Creates a fresh hasher for one worker thread.
    #[must_use]
    pub fn new_hasher(self) -> Box<dyn BlockHasher> {
        match self {
            Self::Crc32 => Box::new(DigestHasher::<Crc32>::new()),
            Self::Md5 => Box::new(DigestHasher::<Md5>::new()),
        }
    }
}

impl fmt::Display for HashFunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u16> for HashFunctionId {
    type Error = UnsupportedAlgorithm;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_u16() == value)
            .ok_or(UnsupportedAlgorithm::Id(value))
    }
}

impl FromStr for HashFunctionId {
    type Err = UnsupportedAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.name() == s)
            .ok_or_else(|| UnsupportedAlgorithm::Name(s.to_owned()))
    }
}

/// Error returned for a hash function that is not supported.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum UnsupportedAlgorithm {
    /// Unknown numeric identifier.
    #[error("unsupported hash function identifier {0}")]
    Id(u16),
    /// Unknown hash function name.
    #[error("unsupported hash function '{0}' (expected CRC32 or MD5)")]
    Name(String),
}

/// Error raised when a digest does not fit the slot reserved for it.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
pub enum DigestError {
    /// The slot width differs from the digest width.
    #[error("digest is {expected} byte(s) wide but the slot holds {actual}")]
    LengthMismatch {
        /// Width produced by the hash function.
        expected: usize,
        /// Width of the slot supplied by the caller.
        actual: usize,
    },
}

/// Hashes whole blocks into caller-provided slots.
///
/// Each hasher thread owns one instance, so implementations may keep scratch
/// state between blocks.
pub trait BlockHasher: Send {
    /// Width of the digests written by [`digest_into`](Self::digest_into).
    fn digest_len(&self) -> usize;

    /// Hashes `block` and writes the digest into `out`.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::LengthMismatch`] when `out` is not exactly
    /// [`digest_len`](Self::digest_len) bytes long.
    fn digest_into(&mut self, block: &[u8], out: &mut [u8]) -> Result<(), DigestError>;
}

/// Source of per-thread hashers plus the metadata recorded in the header.
pub trait DigestAlgorithm: Sync {
    /// Identifier written to the signature header.
    fn wire_id(&self) -> u16;

    /// Width of one digest record in bytes.
    fn digest_len(&self) -> usize;

    /// Creates a hasher for one worker thread.
    fn new_hasher(&self) -> Box<dyn BlockHasher>;
}

impl DigestAlgorithm for HashFunctionId {
    fn wire_id(&self) -> u16 {
        self.as_u16()
    }

    fn digest_len(&self) -> usize {
        Self::digest_len(*self)
    }

    fn new_hasher(&self) -> Box<dyn BlockHasher> {
        Self::new_hasher(*self)
    }
}

/// Adapts a one-shot [`StrongDigest`] to [`BlockHasher`].
struct DigestHasher<D> {
    _digest: PhantomData<fn() -> D>,
}

impl<D> DigestHasher<D> {
    const fn new() -> Self {
        Self {
            _digest: PhantomData,
        }
    }
}

impl<D: StrongDigest> BlockHasher for DigestHasher<D> {
    fn digest_len(&self) -> usize {
        D::DIGEST_LEN
    }

    fn digest_into(&mut self, block: &[u8], out: &mut [u8]) -> Result<(), DigestError> {
        if out.len() != D::DIGEST_LEN {
            return Err(DigestError::LengthMismatch {
                expected: D::DIGEST_LEN,
                actual: out.len(),
            });
        }
        out.copy_from_slice(D::digest(block).as_ref());
        Ok(())
    }
}
