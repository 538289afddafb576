//! Fixed-width block digests.

mod crc32;
mod md5;

pub use self::crc32::Crc32;
pub use self::md5::Md5;

/// Streaming digest producing a fixed-width output.
///
/// Implementations are cheap to construct so callers can create a fresh
/// hasher per block instead of resetting shared state.
pub trait StrongDigest: Sized {
    /// Finalised digest representation.
    type Digest: AsRef<[u8]> + Copy + Eq + std::fmt::Debug;

    /// Width of the digest in bytes.
    const DIGEST_LEN: usize;

    /// Creates a hasher with an empty state.
    fn new() -> Self;

    /// Feeds additional bytes into the digest state.
    fn update(&mut self, data: &[u8]);

    /// Consumes the hasher and returns the digest.
    fn finalize(self) -> Self::Digest;

    /// Computes the digest of `data` in one shot.
    #[inline]
    #[must_use]
    fn digest(data: &[u8]) -> Self::Digest {
        let mut hasher = Self::new();
        hasher.update(data);
        hasher.finalize()
    }
}
