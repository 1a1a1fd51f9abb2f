use alloc::vec::Vec;

use thiserror::Error;

use crate::header::Header;
use crate::index::HistoryIndex;
use crate::level::CompressionLevel;
use crate::matcher::{find_match, Match};
use crate::util::*;

extern crate alloc;

/// Inputs shorter than this are never compressed
const MIN_INPUT_LEN: usize = 16;
/// Longest literal-only run a single opcode holds
const MAX_LITERAL_RUN: usize = 112;

/// Compression errors
#[derive(Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CompressError {
    /// The input is longer than the 32 bit length field allows
    #[error("input is too large to compress")]
    InputTooLarge,
    /// Compressing would not save anything; store the input as-is instead
    ///
    /// This is an expected outcome rather than a failure. It is returned for
    /// every input shorter than 16 bytes, and for inputs whose repeats all lie
    /// beyond the brute-force reach (64 bytes at [CompressionLevel::MAX]):
    /// the history index only fills in as the cursor moves past copies.
    #[error("input is not worth compressing")]
    NotWorthCompressing,
    /// The output buffer was too small to hold all the output.
    ///
    /// The output that has been written is *not* a valid stream.
    #[error("output buffer was insufficient")]
    OutputTooSmall,
    /// A chosen match no longer held at the position it was emitted for
    #[error("match at {position} re-checked to {found} bytes, expected {expected}")]
    RunLengthMismatch {
        position: usize,
        expected: usize,
        found: usize,
    },
}

trait OutputHelper {
    fn put_buf(&mut self, buf: &[u8]) -> Result<(), CompressError>;
}
impl<'a> OutputHelper for BufOutput<'a> {
    fn put_buf(&mut self, buf: &[u8]) -> Result<(), CompressError> {
        if self.pos + buf.len() > self.buf.len() {
            return Err(CompressError::OutputTooSmall);
        }

        self.buf[self.pos..self.pos + buf.len()].copy_from_slice(buf);
        self.pos += buf.len();
        Ok(())
    }
}

impl OutputHelper for VecOutput {
    fn put_buf(&mut self, buf: &[u8]) -> Result<(), CompressError> {
        self.vec.extend_from_slice(buf);
        Ok(())
    }
}

/// Opcode encoder over some byte output
///
/// Tracks how many opcode bytes (excluding the header) have gone out.
struct RefPackOutput<O> {
    out: O,
    written: usize,
}
impl<O: OutputHelper> RefPackOutput<O> {
    fn new(out: O) -> Self {
        Self { out, written: 0 }
    }

    fn put_op(&mut self, op: &[u8], lits: &[u8]) -> Result<(), CompressError> {
        self.out.put_buf(op)?;
        self.out.put_buf(lits)?;
        self.written += op.len() + lits.len();
        Ok(())
    }
}

impl<O: OutputHelper> OutputSink<CompressError> for RefPackOutput<O> {
    fn put_lits(&mut self, mut lits: &[u8]) -> Result<(), CompressError> {
        debug_assert!(lits.len() % 4 == 0);

        while !lits.is_empty() {
            let n = usize::min(lits.len(), MAX_LITERAL_RUN);
            // 111ppppp
            self.put_op(&[0xe0 | ((n >> 2) - 1) as u8], &lits[..n])?;
            lits = &lits[n..];
        }

        Ok(())
    }

    fn put_backref(
        &mut self,
        mut lits: &[u8],
        dist: usize,
        mut len: usize,
    ) -> Result<(), CompressError> {
        debug_assert!(lits.len() <= 3);
        debug_assert!((1..=MAX_WINDOW).contains(&dist));
        debug_assert!(len >= 3);

        let offset = dist - 1;

        // too long for one opcode, so split it up with the same distance;
        // only the first piece carries the literals
        while len > 0 {
            let this_len = usize::min(len, MAX_COPY_LEN);
            len -= this_len;
            let nlits = lits.len();

            if this_len > 67 || offset > 16383 {
                // 110cccpp oooooooo oooooooo cccccccc
                let c = this_len - 5;
                let op = [
                    (0xc0 | nlits | ((c >> 6) & 0x0c) | ((offset >> 12) & 0x10)) as u8,
                    (offset >> 8) as u8,
                    offset as u8,
                    c as u8,
                ];
                self.put_op(&op, lits)?;
            } else if this_len > 10 || offset > 1023 {
                // 10cccccc ppoooooo oooooooo
                let op = [
                    (0x80 | ((this_len - 4) & 0x3f)) as u8,
                    ((nlits << 6) | ((offset >> 8) & 0x3f)) as u8,
                    offset as u8,
                ];
                self.put_op(&op, lits)?;
            } else {
                // 0oocccpp oooooooo
                let op = [
                    (nlits | ((this_len - 3) << 2) | ((offset >> 3) & 0x60)) as u8,
                    offset as u8,
                ];
                self.put_op(&op, lits)?;
            }

            lits = &[];
        }

        Ok(())
    }

    fn put_stop(&mut self, lits: &[u8]) -> Result<(), CompressError> {
        debug_assert!(lits.len() <= 3);

        // 111111pp
        self.put_op(&[0xfc | lits.len() as u8], lits)
    }
}

/// Holds state for performing compression operations
///
/// Reusing one state across calls avoids reallocating the history index.
/// Nothing else carries over between calls.
pub struct CompressState {
    index: HistoryIndex,
}
impl CompressState {
    /// Allocate a new compression state
    pub fn new() -> Self {
        Self {
            index: HistoryIndex::new(),
        }
    }

    fn compress_impl<O: OutputHelper>(
        &mut self,
        inp: &[u8],
        outp: &mut RefPackOutput<O>,
        level: &CompressionLevel,
    ) -> Result<(), CompressError> {
        let inp_len = u32::try_from(inp.len()).map_err(|_| CompressError::InputTooLarge)?;
        if inp.len() < MIN_INPUT_LEN {
            return Err(CompressError::NotWorthCompressing);
        }

        let header = Header::new(inp_len);
        outp.out.put_buf(&header.encode()[..header.encoded_len()])?;

        self.index.reset();

        let mut pos = 0;
        let mut stopped = false;

        while pos < inp.len() {
            self.index.advance(inp, pos, level);

            if inp.len() - pos < 4 {
                outp.put_stop(&inp[pos..])?;
                pos = inp.len();
                stopped = true;
                continue;
            }

            let found = match find_match(inp, pos, &self.index, level) {
                Some(m) => Some(m),
                None => {
                    // search ahead in steps of 4, everything skipped is literal;
                    // the index is not advanced while searching ahead
                    let mut ahead = pos + 4;
                    let mut found = None;
                    while found.is_none() && ahead + 3 < inp.len() {
                        found = find_match(inp, ahead, &self.index, level).map(|m| Match {
                            lookahead: m.lookahead + (ahead - pos),
                            ..m
                        });
                        ahead += 4;
                    }

                    let skipped = found.map_or(inp.len() - pos, |m| m.lookahead);
                    let whole = skipped & !3;
                    outp.put_lits(&inp[pos..pos + whole])?;
                    pos += whole;

                    found.map(|m| Match {
                        lookahead: m.lookahead - whole,
                        ..m
                    })
                }
            };

            if let Some(m) = found {
                let dst = pos + m.lookahead;

                let recheck = run_length(inp, m.start, dst);
                debug_assert!(recheck >= m.len, "match re-check failed");
                if recheck < m.len {
                    log::error!(
                        "refpack match at {} re-checked to {} bytes, expected {}",
                        dst,
                        recheck,
                        m.len
                    );
                    return Err(CompressError::RunLengthMismatch {
                        position: dst,
                        expected: m.len,
                        found: recheck,
                    });
                }

                outp.put_backref(&inp[pos..dst], dst - m.start, m.len)?;
                pos = dst + m.len;
            }
        }

        // the bare stop opcode below does not count towards the savings
        if outp.written + 6 >= inp.len() {
            log::debug!(
                "refpack: {} bytes would compress to {}, storing instead",
                inp.len(),
                outp.written
            );
            return Err(CompressError::NotWorthCompressing);
        }

        if !stopped {
            outp.put_stop(&[])?;
        }

        log::debug!(
            "refpack: compressed {} bytes to {}",
            inp.len(),
            header.encoded_len() + outp.written
        );

        Ok(())
    }

    /// Compress the input into a preallocated buffer
    ///
    /// Returns the compressed size on success, or an error otherwise
    pub fn compress_to_buf(
        &mut self,
        inp: &[u8],
        outp: &mut [u8],
        level: CompressionLevel,
    ) -> Result<usize, CompressError> {
        let mut outp: RefPackOutput<BufOutput> = RefPackOutput::new(outp.into());
        self.compress_impl(inp, &mut outp, &level)?;
        Ok(outp.out.pos)
    }

    /// Compress the input into a [Vec]
    ///
    /// Returns the result on success, or an error otherwise
    pub fn compress_to_vec(
        &mut self,
        inp: &[u8],
        level: CompressionLevel,
    ) -> Result<Vec<u8>, CompressError> {
        let mut ret: RefPackOutput<VecOutput> = RefPackOutput::new(Vec::<u8>::new().into());
        self.compress_impl(inp, &mut ret, &level)?;
        Ok(ret.out.vec)
    }
}
impl Default for CompressState {
    fn default() -> Self {
        Self::new()
    }
}

/// Compress `inp` into a new [Vec] using a throwaway [CompressState]
pub fn compress_to_vec(inp: &[u8], level: CompressionLevel) -> Result<Vec<u8>, CompressError> {
    CompressState::new().compress_to_vec(inp, level)
}
