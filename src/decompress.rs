use thiserror::Error;

use crate::header::Header;
use crate::util::{BufOutput, InputSource};

#[cfg(feature = "alloc")]
use crate::util::VecOutput;

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

/// One input byte never decodes to more than this (a 4 byte copy of 1028)
#[cfg(feature = "alloc")]
const MAX_EXPANSION: usize = 257;
/// Up-front reservation when reading from a stream of unknown length
#[cfg(feature = "std")]
const READER_RESERVE: usize = 1 << 20;

/// Decompression errors
#[derive(Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DecompressError {
    /// The input does not start with a RefPack header
    ///
    /// Also covers headers with bit 0x0100 set, a variant no encoder emits.
    #[error("input is not refpack compressed")]
    InvalidHeader,
    #[error("input was truncated")]
    InputTruncated,
    /// A copy reaches before the start of the output
    #[error("invalid backreference")]
    InvalidBackreference,
    /// The stream writes more than the header declared
    #[error("stream overruns its declared length")]
    OutputOverrun,
    /// The stream stopped short of the length the header declared
    #[error("stream ended before its declared length")]
    OutputIncomplete,
    #[error("output buffer was insufficient")]
    OutputTooSmall,
    /// Reading the input failed for a reason other than running out
    #[cfg(feature = "std")]
    #[error("i/o error: {0}")]
    Io(std::io::ErrorKind),
}

/// One decoded instruction
///
/// `lits` bytes are taken from the input first, then `copy_len` bytes are
/// copied from `dist` bytes back in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Opcode {
    lits: usize,
    copy_len: usize,
    dist: usize,
    stop: bool,
}

impl Opcode {
    fn read(inp: &mut impl InputSource) -> Result<Self, DecompressError> {
        let prefix = inp.read_u8()? as usize;
        let mut b = [0u8; 3];

        let op = match prefix {
            0x00..=0x7f => {
                // 0oocccpp oooooooo
                inp.read_into(&mut b[..1])?;
                Self {
                    lits: prefix & 0x03,
                    copy_len: ((prefix & 0x1c) >> 2) + 3,
                    dist: (((prefix & 0x60) << 3) | b[0] as usize) + 1,
                    stop: false,
                }
            }
            0x80..=0xbf => {
                // 10cccccc ppoooooo oooooooo
                inp.read_into(&mut b[..2])?;
                Self {
                    lits: (b[0] >> 6) as usize,
                    copy_len: (prefix & 0x3f) + 4,
                    dist: ((((b[0] & 0x3f) as usize) << 8) | b[1] as usize) + 1,
                    stop: false,
                }
            }
            0xc0..=0xdf => {
                // 110cccpp oooooooo oooooooo cccccccc
                inp.read_into(&mut b)?;
                Self {
                    lits: prefix & 0x03,
                    copy_len: (((prefix & 0x0c) << 6) | b[2] as usize) + 5,
                    dist: (((prefix & 0x10) << 12) | ((b[0] as usize) << 8) | b[1] as usize) + 1,
                    stop: false,
                }
            }
            0xe0..=0xfb => Self {
                // 111ppppp
                lits: ((prefix & 0x1f) + 1) * 4,
                copy_len: 0,
                dist: 0,
                stop: false,
            },
            _ => Self {
                // 111111pp
                lits: prefix & 0x03,
                copy_len: 0,
                dist: 0,
                stop: true,
            },
        };

        Ok(op)
    }
}

/// Internal abstraction for the two different types of outputs
///
/// Callers make sure neither operation goes past the declared length.
trait DecodeSink {
    fn pos(&self) -> usize;
    /// Move `len` literal bytes from the input to the output
    fn put_lits(&mut self, inp: &mut impl InputSource, len: usize) -> Result<(), DecompressError>;
    /// Add a backreference to the output
    ///
    /// A `dist` of 1 means the current position minus 1.
    ///
    /// Copy `len` bytes, which as usual for LZ77 may exceed `dist`.
    fn put_backref(&mut self, dist: usize, len: usize) -> Result<(), DecompressError>;
}

impl<'a> DecodeSink for BufOutput<'a> {
    fn pos(&self) -> usize {
        self.pos
    }

    fn put_lits(&mut self, inp: &mut impl InputSource, len: usize) -> Result<(), DecompressError> {
        inp.read_into(&mut self.buf[self.pos..self.pos + len])?;
        self.pos += len;
        Ok(())
    }

    fn put_backref(&mut self, dist: usize, len: usize) -> Result<(), DecompressError> {
        if dist > self.pos {
            return Err(DecompressError::InvalidBackreference);
        }

        // byte by byte, the source may overlap what is being written
        for i in 0..len {
            self.buf[self.pos + i] = self.buf[self.pos - dist + i];
        }
        self.pos += len;

        Ok(())
    }
}

#[cfg(feature = "alloc")]
impl DecodeSink for VecOutput {
    fn pos(&self) -> usize {
        self.vec.len()
    }

    fn put_lits(&mut self, inp: &mut impl InputSource, len: usize) -> Result<(), DecompressError> {
        let pos = self.vec.len();
        self.vec.resize(pos + len, 0);
        inp.read_into(&mut self.vec[pos..])
    }

    fn put_backref(&mut self, dist: usize, len: usize) -> Result<(), DecompressError> {
        let pos = self.vec.len();
        if dist > pos {
            return Err(DecompressError::InvalidBackreference);
        }

        self.vec.resize(pos + len, 0);
        for i in 0..len {
            self.vec[pos + i] = self.vec[pos - dist + i];
        }

        Ok(())
    }
}

fn decompress_impl(
    inp: &mut impl InputSource,
    outp: &mut impl DecodeSink,
    out_len: usize,
) -> Result<(), DecompressError> {
    loop {
        let op = Opcode::read(inp)?;

        if op.lits > 0 {
            if outp.pos() + op.lits > out_len {
                return Err(DecompressError::OutputOverrun);
            }
            outp.put_lits(inp, op.lits)?;
        }

        if op.copy_len > 0 {
            if outp.pos() + op.copy_len > out_len {
                return Err(DecompressError::OutputOverrun);
            }
            outp.put_backref(op.dist, op.copy_len)?;
        }

        if op.stop {
            break;
        }
    }

    if outp.pos() != out_len {
        log::debug!(
            "refpack stream stopped after {} of {} bytes",
            outp.pos(),
            out_len
        );
        return Err(DecompressError::OutputIncomplete);
    }
    Ok(())
}

/// Uncompressed size declared by the header of `inp`
pub fn decompressed_len(inp: &[u8]) -> Result<usize, DecompressError> {
    Ok(Header::parse(inp)?.uncompressed_len as usize)
}

/// Decompress the input into a preallocated buffer
///
/// The buffer must be at least [decompressed_len] bytes. Returns the
/// decompressed size on success, or an error otherwise
pub fn decompress_to_buf(mut inp: &[u8], outp: &mut [u8]) -> Result<usize, DecompressError> {
    let out_len = Header::read(&mut inp)?.uncompressed_len as usize;
    let outp = outp
        .get_mut(..out_len)
        .ok_or(DecompressError::OutputTooSmall)?;

    let mut outp: BufOutput = outp.into();
    decompress_impl(&mut inp, &mut outp, out_len)?;
    Ok(outp.pos)
}

/// `max_reserve` bounds the up-front allocation, the output grows past it
/// as the stream is decoded
#[cfg(feature = "alloc")]
fn decompress_vec_impl(
    inp: &mut impl InputSource,
    max_reserve: usize,
) -> Result<alloc::vec::Vec<u8>, DecompressError> {
    let out_len = Header::read(inp)?.uncompressed_len as usize;
    let reserve = usize::min(out_len, max_reserve);
    let mut ret: VecOutput = alloc::vec::Vec::<u8>::with_capacity(reserve).into();
    decompress_impl(inp, &mut ret, out_len)?;
    Ok(ret.vec)
}

#[cfg(feature = "alloc")]
/// Decompress the input into a [Vec](alloc::vec::Vec)
///
/// Returns the result on success, or an error otherwise
pub fn decompress_to_vec(mut inp: &[u8]) -> Result<alloc::vec::Vec<u8>, DecompressError> {
    // exact for any stream that could be valid
    let max_reserve = inp.len().saturating_mul(MAX_EXPANSION);
    decompress_vec_impl(&mut inp, max_reserve)
}

#[cfg(feature = "std")]
/// Decompress a stream read incrementally from `inp`
///
/// Reads exactly up to the stop opcode; anything after it is left unread.
pub fn decompress_from_reader<R: std::io::Read>(
    inp: R,
) -> Result<std::vec::Vec<u8>, DecompressError> {
    decompress_vec_impl(&mut crate::util::ReadInput(inp), READER_RESERVE)
}
