#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `checksums` provides the digest primitives used by the block signature
//! engine. Each algorithm is exposed as a streaming hasher implementing
//! [`strong::StrongDigest`], with a one-shot helper for the common case of
//! hashing a single in-memory block.
//!
//! # Algorithms
//!
//! - [`strong::Crc32`]: IEEE CRC-32 backed by `crc32fast`, which selects a
//!   carry-less multiplication kernel at runtime when the CPU supports it.
//!   The 4-byte digest is the checksum value in little-endian byte order.
//! - [`strong::Md5`]: RFC 1321 MD5 backed by the RustCrypto `md-5` crate.
//!
//! # Examples
//!
//! ```
//! use checksums::strong::{Crc32, Md5, StrongDigest};
//!
//! let crc = Crc32::digest(b"123456789");
//! assert_eq!(crc, 0xCBF4_3926u32.to_le_bytes());
//!
//! let md5 = Md5::digest(b"abc");
//! assert_eq!(md5.len(), Md5::DIGEST_LEN);
//! ```

pub mod strong;

pub use strong::{Crc32, Md5, StrongDigest};
