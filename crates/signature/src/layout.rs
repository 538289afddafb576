//! Partitioning of an input into fixed-size blocks and of the output into
//! header plus digest records.

use core::num::NonZeroU32;

use crate::error::SignatureError;
use crate::header::HEADER_LEN;

/// Block partition of one input file.
///
/// Every block is `block_size` bytes long except the last, which holds the
/// remainder and is never empty.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BlockPlan {
    file_size: u64,
    block_size: NonZeroU32,
    block_count: u64,
    last_block_len: u32,
}

impl BlockPlan {
    /// Plans the blocks for a `file_size`-byte input.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::ZeroBlockSize`] when `block_size` is zero and
    /// [`SignatureError::EmptyInput`] when `file_size` is zero. The block size
    /// is checked first.
    pub fn new(file_size: u64, block_size: u32) -> Result<Self, SignatureError> {
        let block_size = NonZeroU32::new(block_size).ok_or(SignatureError::ZeroBlockSize)?;
        if file_size == 0 {
            return Err(SignatureError::EmptyInput);
        }

        let size = u64::from(block_size.get());
        let block_count = file_size.div_ceil(size);
        let remainder = file_size % size;
        // remainder < block_size, so it fits in u32
        let last_block_len = if remainder == 0 {
            block_size.get()
        } else {
            remainder as u32
        };

        Ok(Self {
            file_size,
            block_size,
            block_count,
            last_block_len,
        })
    }

    /// Returns the input length in bytes.
    #[inline]
    #[must_use]
    pub const fn file_size(self) -> u64 {
        self.file_size
    }

    /// Returns the nominal block length.
    #[inline]
    #[must_use]
    pub const fn block_size(self) -> u32 {
        self.block_size.get()
    }

    /// Returns the number of blocks, always at least one.
    #[inline]
    #[must_use]
    pub const fn block_count(self) -> u64 {
        self.block_count
    }

    /// Returns the length of the final block.
    #[inline]
    #[must_use]
    pub const fn last_block_len(self) -> u32 {
        self.last_block_len
    }

    /// Longest block in the plan, which bounds every buffer.
    #[must_use]
    pub const fn max_block_len(self) -> u32 {
        if self.block_count == 1 {
            self.last_block_len
        } else {
            self.block_size.get()
        }
    }

    /// Length of block `index`, or `None` past the end.
    #[must_use]
    pub const fn block_len(self, index: u64) -> Option<u32> {
        if index >= self.block_count {
            None
        } else if index + 1 == self.block_count {
            Some(self.last_block_len)
        } else {
            Some(self.block_size.get())
        }
    }

    /// Iterates `(index, length)` for every block in input order.
    pub fn blocks(self) -> impl Iterator<Item = (u64, u32)> {
        (0..self.block_count).map(move |index| {
            let len = if index + 1 == self.block_count {
                self.last_block_len
            } else {
                self.block_size.get()
            };
            (index, len)
        })
    }

    /// Total signature length for digests of `digest_len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::OutputTooLarge`] when the length overflows
    /// `u64`.
    pub fn output_len(self, digest_len: usize) -> Result<u64, SignatureError> {
        u64::try_from(digest_len)
            .ok()
            .and_then(|len| len.checked_mul(self.block_count))
            .and_then(|records| records.checked_add(HEADER_LEN as u64))
            .ok_or(SignatureError::OutputTooLarge {
                block_count: self.block_count,
                digest_len,
            })
    }
}

/// Output offset of the digest record for `block`.
///
/// Callers must have validated the layout with [`BlockPlan::output_len`].
#[inline]
#[must_use]
pub const fn digest_offset(block: u64, digest_len: usize) -> u64 {
    HEADER_LEN as u64 + block * digest_len as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_multiple_keeps_full_last_block() {
        let plan = BlockPlan::new(8, 4).expect("valid plan");
        assert_eq!(plan.block_count(), 2);
        assert_eq!(plan.last_block_len(), 4);
    }

    #[test]
    fn remainder_becomes_last_block() {
        let plan = BlockPlan::new(10, 4).expect("valid plan");
        assert_eq!(plan.block_count(), 3);
        assert_eq!(plan.last_block_len(), 2);
        assert_eq!(plan.block_len(0), Some(4));
        assert_eq!(plan.block_len(2), Some(2));
        assert_eq!(plan.block_len(3), None);
        assert_eq!(plan.max_block_len(), 4);
    }

    #[test]
    fn block_larger_than_file_yields_one_short_block() {
        let plan = BlockPlan::new(10, 1024 * 1024).expect("valid plan");
        assert_eq!(plan.block_count(), 1);
        assert_eq!(plan.last_block_len(), 10);
        assert_eq!(plan.max_block_len(), 10);
    }

    #[test]
    fn zero_block_size_checked_before_empty_input() {
        assert!(matches!(
            BlockPlan::new(0, 0),
            Err(SignatureError::ZeroBlockSize)
        ));
        assert!(matches!(
            BlockPlan::new(0, 4),
            Err(SignatureError::EmptyInput)
        ));
    }

    #[test]
    fn blocks_iterator_covers_file() {
        let plan = BlockPlan::new(10, 4).expect("valid plan");
        let blocks: Vec<_> = plan.blocks().collect();
        assert_eq!(blocks, vec![(0, 4), (1, 4), (2, 2)]);
    }

    #[test]
    fn output_len_counts_header_and_records() {
        let plan = BlockPlan::new(10, 4).expect("valid plan");
        assert_eq!(plan.output_len(4).expect("fits"), 44);
        assert_eq!(plan.output_len(16).expect("fits"), 80);
    }

    #[test]
    fn output_len_detects_overflow() {
        let plan = BlockPlan::new(u64::MAX, 1).expect("valid plan");
        assert!(matches!(
            plan.output_len(16),
            Err(SignatureError::OutputTooLarge { .. })
        ));
    }

    #[test]
    fn digest_offsets_follow_header() {
        assert_eq!(digest_offset(0, 4), 32);
        assert_eq!(digest_offset(2, 4), 40);
        assert_eq!(digest_offset(1, 16), 48);
    }
}
