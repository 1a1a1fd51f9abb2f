use crate::decompress::DecompressError;

#[cfg(feature = "alloc")]
extern crate alloc;

/// Longest copy a single opcode can describe
#[cfg(feature = "alloc")]
pub(crate) const MAX_COPY_LEN: usize = 1028;
/// Largest backwards distance a copy can reach
#[cfg(feature = "alloc")]
pub(crate) const MAX_WINDOW: usize = 131072;

/// Abstraction over where RefPack opcodes end up (slice vs Vec)
///
/// Each call corresponds to one encoder decision. Implementations are free
/// to split a call into several opcodes if it exceeds what one opcode holds.
pub trait OutputSink<ErrTy> {
    /// Add a literal-only run to the output
    ///
    /// `lits.len()` must be a multiple of 4.
    fn put_lits(&mut self, lits: &[u8]) -> Result<(), ErrTy>;
    /// Add up to 3 literals followed by a backreference
    ///
    /// `dist` is 1-based: a `dist` of 1 means the byte just before the copy.
    ///
    /// Copy `len` bytes, which as usual for LZ77 may exceed `dist`.
    fn put_backref(&mut self, lits: &[u8], dist: usize, len: usize) -> Result<(), ErrTy>;
    /// Add the terminal opcode with up to 3 trailing literals
    fn put_stop(&mut self, lits: &[u8]) -> Result<(), ErrTy>;
}

pub(crate) struct BufOutput<'a> {
    pub pos: usize,
    pub buf: &'a mut [u8],
}
impl<'a> From<&'a mut [u8]> for BufOutput<'a> {
    fn from(buf: &'a mut [u8]) -> Self {
        Self { pos: 0, buf }
    }
}

#[cfg(feature = "alloc")]
pub(crate) struct VecOutput {
    pub vec: alloc::vec::Vec<u8>,
}
#[cfg(feature = "alloc")]
impl From<alloc::vec::Vec<u8>> for VecOutput {
    fn from(vec: alloc::vec::Vec<u8>) -> Self {
        Self { vec }
    }
}

/// Where compressed bytes come from while decoding (slice vs reader)
pub(crate) trait InputSource {
    /// Fill all of `buf`, or fail with `InputTruncated`
    fn read_into(&mut self, buf: &mut [u8]) -> Result<(), DecompressError>;

    fn read_u8(&mut self) -> Result<u8, DecompressError> {
        let mut b = [0u8; 1];
        self.read_into(&mut b)?;
        Ok(b[0])
    }
}
impl InputSource for &[u8] {
    fn read_into(&mut self, buf: &mut [u8]) -> Result<(), DecompressError> {
        if self.len() < buf.len() {
            return Err(DecompressError::InputTruncated);
        }
        let (head, tail) = self.split_at(buf.len());
        buf.copy_from_slice(head);
        *self = tail;
        Ok(())
    }
}

#[cfg(feature = "std")]
pub(crate) struct ReadInput<R>(pub R);
#[cfg(feature = "std")]
impl<R: std::io::Read> InputSource for ReadInput<R> {
    fn read_into(&mut self, buf: &mut [u8]) -> Result<(), DecompressError> {
        self.0.read_exact(buf).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => DecompressError::InputTruncated,
            kind => DecompressError::Io(kind),
        })
    }
}

/// Little-endian 4 byte key at `pos`, as used by the history index
#[cfg(feature = "alloc")]
pub(crate) fn read_key(inp: &[u8], pos: usize) -> u32 {
    let mut key = [0u8; 4];
    key.copy_from_slice(&inp[pos..pos + 4]);
    u32::from_le_bytes(key)
}

/// Length of the run starting at `dst` that repeats the bytes at `src`
///
/// The first byte is assumed to already match. Never reads past the end of
/// `inp` and never returns more than [MAX_COPY_LEN].
#[cfg(feature = "alloc")]
pub(crate) fn run_length(inp: &[u8], src: usize, dst: usize) -> usize {
    debug_assert!(src < dst);
    1 + inp[src + 1..]
        .iter()
        .zip(inp[dst + 1..].iter())
        .take(MAX_COPY_LEN - 1)
        .take_while(|(a, b)| a == b)
        .count()
}
