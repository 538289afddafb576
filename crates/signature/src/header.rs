//! Fixed 32-byte header at the start of every signature file.
//!
//! Fields are little-endian and laid out back to back:
//!
//! | offset | width | field                |
//! |-------:|------:|----------------------|
//! | 0      | 4     | file mark `VMFS`     |
//! | 4      | 2     | format version       |
//! | 6      | 2     | hash function id     |
//! | 8      | 8     | original file size   |
//! | 16     | 4     | block size           |
//! | 20     | 12    | reserved, zero       |

use std::io::{self, Write};

use thiserror::Error;

/// Magic number identifying a signature file.
pub const FILE_MARK: u32 = 0x5346_4D56;
/// Current on-disk format version.
pub const FORMAT_VERSION: u16 = 1;
/// Encoded header length in bytes.
pub const HEADER_LEN: usize = 32;

/// Decoded signature header.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SignatureHeader {
    /// Magic number, [`FILE_MARK`] for valid files.
    pub file_mark: u32,
    /// Format version, [`FORMAT_VERSION`] for files written by this crate.
    pub format_version: u16,
    /// Identifier of the hash function used for every record.
    pub hash_function_id: u16,
    /// Length of the input the signature describes.
    pub original_file_size: u64,
    /// Nominal block length.
    pub block_size: u32,
    /// Reserved for future use; written as zero.
    pub reserved: [u32; 3],
}

impl SignatureHeader {
    /// Builds a header for the current format.
    #[must_use]
    pub const fn new(hash_function_id: u16, original_file_size: u64, block_size: u32) -> Self {
        Self {
            file_mark: FILE_MARK,
            format_version: FORMAT_VERSION,
            hash_function_id,
            original_file_size,
            block_size,
            reserved: [0; 3],
        }
    }

    /// Serializes the header field by field.
    #[must_use]
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        let mut cursor = FieldCursor::new(&mut out);
        cursor.put(&self.file_mark.to_le_bytes());
        cursor.put(&self.format_version.to_le_bytes());
        cursor.put(&self.hash_function_id.to_le_bytes());
        cursor.put(&self.original_file_size.to_le_bytes());
        cursor.put(&self.block_size.to_le_bytes());
        for word in self.reserved {
            cursor.put(&word.to_le_bytes());
        }
        debug_assert_eq!(cursor.position, HEADER_LEN);
        out
    }

    /// Writes the encoded header to `writer`.
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.encode())
    }

    /// Parses a header from the first [`HEADER_LEN`] bytes of `bytes`.
    ///
    /// # Errors
    ///
    /// Fails when fewer than [`HEADER_LEN`] bytes are supplied or the file
    /// mark does not match.
    pub fn decode(bytes: &[u8]) -> Result<Self, HeaderError> {
        let Some(bytes) = bytes.first_chunk::<HEADER_LEN>() else {
            return Err(HeaderError::Truncated(bytes.len()));
        };

        let u16_at = |at: usize| u16::from_le_bytes([bytes[at], bytes[at + 1]]);
        let u32_at = |at: usize| {
            u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };
        let u64_at = |at: usize| (u64::from(u32_at(at + 4)) << 32) | u64::from(u32_at(at));

        let file_mark = u32_at(0);
        if file_mark != FILE_MARK {
            return Err(HeaderError::BadFileMark(file_mark));
        }

        Ok(Self {
            file_mark,
            format_version: u16_at(4),
            hash_function_id: u16_at(6),
            original_file_size: u64_at(8),
            block_size: u32_at(16),
            reserved: [u32_at(20), u32_at(24), u32_at(28)],
        })
    }
}

/// Errors produced when parsing a [`SignatureHeader`].
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
pub enum HeaderError {
    /// Fewer than [`HEADER_LEN`] bytes were available.
    #[error("signature header needs {HEADER_LEN} bytes but only {0} were supplied")]
    Truncated(usize),
    /// The magic number did not match [`FILE_MARK`].
    #[error("unexpected file mark {0:#010x}")]
    BadFileMark(u32),
}

struct FieldCursor<'a> {
    out: &'a mut [u8; HEADER_LEN],
    position: usize,
}

impl<'a> FieldCursor<'a> {
    fn new(out: &'a mut [u8; HEADER_LEN]) -> Self {
        Self { out, position: 0 }
    }

    fn put(&mut self, field: &[u8]) {
        let end = self.position + field.len();
        self.out[self.position..end].copy_from_slice(field);
        self.position = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_mark_spells_vmfs() {
        assert_eq!(&FILE_MARK.to_le_bytes(), b"VMFS");
    }

    #[test]
    fn encodes_fields_at_fixed_offsets() {
        let header = SignatureHeader::new(1, 0x0102_0304_0506_0708, 4096);
        let bytes = header.encode();

        assert_eq!(&bytes[0..4], b"VMFS");
        assert_eq!(&bytes[4..6], &[1, 0]);
        assert_eq!(&bytes[6..8], &[1, 0]);
        assert_eq!(
            &bytes[8..16],
            &[0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]
        );
        assert_eq!(&bytes[16..20], &4096_u32.to_le_bytes());
        assert!(bytes[20..].iter().all(|&b| b == 0));
    }

    #[test]
    fn decode_recovers_encoded_header() {
        let header = SignatureHeader::new(0, 10, 4);
        assert_eq!(SignatureHeader::decode(&header.encode()), Ok(header));
    }

    #[test]
    fn decode_ignores_trailing_records() {
        let header = SignatureHeader::new(0, 10, 4);
        let mut bytes = header.encode().to_vec();
        bytes.extend_from_slice(&[0xAA; 12]);
        assert_eq!(SignatureHeader::decode(&bytes), Ok(header));
    }

    #[test]
    fn decode_rejects_short_input() {
        assert_eq!(
            SignatureHeader::decode(&[0u8; 31]),
            Err(HeaderError::Truncated(31))
        );
    }

    #[test]
    fn decode_rejects_foreign_file_mark() {
        let mut bytes = SignatureHeader::new(0, 1, 1).encode();
        bytes[0] = b'X';
        assert!(matches!(
            SignatureHeader::decode(&bytes),
            Err(HeaderError::BadFileMark(_))
        ));
    }

    #[test]
    fn write_to_emits_exact_length() {
        let mut sink = Vec::new();
        SignatureHeader::new(1, 99, 1024)
            .write_to(&mut sink)
            .expect("vec writes succeed");
        assert_eq!(sink.len(), HEADER_LEN);
    }
}
