//! The magic + length prefix in front of every RefPack stream

use crate::decompress::DecompressError;
use crate::util::InputSource;

const MAGIC: u16 = 0x10fb;
const MAGIC_MASK: u16 = 0x1fff;
const FLAG_LONG: u16 = 0x8000;

/// Lengths above this need the 4 byte length field
const MAX_SHORT_LEN: u32 = 0xff_ffff;

/// Parsed RefPack stream header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Size of the data once decompressed
    pub uncompressed_len: u32,
}

impl Header {
    /// Header for a stream that decompresses to `uncompressed_len` bytes
    pub fn new(uncompressed_len: u32) -> Self {
        Self { uncompressed_len }
    }

    fn is_long(&self) -> bool {
        self.uncompressed_len > MAX_SHORT_LEN
    }

    /// Number of bytes [Header::encode] produces (5 or 6)
    pub fn encoded_len(&self) -> usize {
        if self.is_long() {
            6
        } else {
            5
        }
    }

    /// Serialize the header
    ///
    /// Only the first [Header::encoded_len] bytes are meaningful.
    pub fn encode(&self) -> [u8; 6] {
        let len = self.uncompressed_len.to_be_bytes();
        if self.is_long() {
            [0x90, 0xfb, len[0], len[1], len[2], len[3]]
        } else {
            [0x10, 0xfb, len[1], len[2], len[3], 0]
        }
    }

    /// Parse the header at the start of `inp`
    pub fn parse(mut inp: &[u8]) -> Result<Self, DecompressError> {
        Self::read(&mut inp)
    }

    pub(crate) fn read(inp: &mut impl InputSource) -> Result<Self, DecompressError> {
        let mut magic = [0u8; 2];
        inp.read_into(&mut magic)?;
        let magic = u16::from_be_bytes(magic);

        // also rejects the 0x0100 variant, which the mask covers
        if magic & MAGIC_MASK != MAGIC {
            return Err(DecompressError::InvalidHeader);
        }

        let mut len = [0u8; 4];
        if magic & FLAG_LONG != 0 {
            inp.read_into(&mut len)?;
        } else {
            inp.read_into(&mut len[1..])?;
        }

        let header = Self::new(u32::from_be_bytes(len));
        log::trace!("refpack header declares {} bytes", header.uncompressed_len);
        Ok(header)
    }
}
