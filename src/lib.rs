//! RefPack compression as found in DBPF game archives
//!
//! RefPack is an LZ77 variant with a 5 or 6 byte header and four opcode
//! families that combine up to 3 literal bytes with a backwards copy, plus
//! a literal-only run and a terminal opcode.
//!
//! Compression is exhaustive by default ([CompressionLevel::MAX]) and gives
//! up with [CompressError::NotWorthCompressing] when the result would not be
//! smaller, in which case the caller should store the data uncompressed.
#![no_std]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

#[cfg(feature = "alloc")]
mod compress;
mod decompress;
mod header;
#[cfg(feature = "alloc")]
mod index;
mod level;
#[cfg(feature = "alloc")]
mod matcher;
mod util;

#[cfg(feature = "alloc")]
pub use compress::{compress_to_vec, CompressError, CompressState};
#[cfg(feature = "std")]
pub use decompress::decompress_from_reader;
#[cfg(feature = "alloc")]
pub use decompress::decompress_to_vec;
pub use decompress::{decompress_to_buf, decompressed_len, DecompressError};
pub use header::Header;
pub use level::CompressionLevel;
pub use util::OutputSink;
