use std::fmt;

use super::StrongDigest;

/// Streaming IEEE CRC-32 hasher.
///
/// The digest is the 32-bit checksum serialised in little-endian order, so the
/// standard check value `0xCBF43926` for `"123456789"` is emitted as
/// `[0x26, 0x39, 0xF4, 0xCB]`.
#[derive(Clone, Default)]
pub struct Crc32 {
    inner: crc32fast::Hasher,
}

impl fmt::Debug for Crc32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crc32").finish_non_exhaustive()
    }
}

impl Crc32 {
    /// Creates a hasher with an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: crc32fast::Hasher::new(),
        }
    }

    /// Feeds additional bytes into the checksum.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Returns the checksum value without byte serialisation.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.inner.clone().finalize()
    }

    /// Finalises the checksum and returns its little-endian bytes.
    #[must_use]
    pub fn finalize(self) -> [u8; 4] {
        self.inner.finalize().to_le_bytes()
    }

    /// Convenience helper that computes the CRC-32 digest for `data` in one shot.
    #[must_use]
    pub fn digest(data: &[u8]) -> [u8; 4] {
        <Self as StrongDigest>::digest(data)
    }
}

impl StrongDigest for Crc32 {
    type Digest = [u8; 4];
    const DIGEST_LEN: usize = 4;

    fn new() -> Self {
        Self::new()
    }

    fn update(&mut self, data: &[u8]) {
        self.update(data);
    }

    fn finalize(self) -> Self::Digest {
        self.finalize()
    }
}
