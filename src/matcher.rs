use crate::index::HistoryIndex;
use crate::level::CompressionLevel;
use crate::util::{read_key, run_length, MAX_COPY_LEN, MAX_WINDOW};

/// The indexed search needs this much input left after the cursor
const INDEX_TAIL: usize = 16;
/// Matches found through the index must be at least this long
const MIN_INDEXED_LEN: usize = 5;

/// A backreference chosen by the match finder
///
/// The copy is `len` bytes from `start` to `pos + lookahead`, where `pos`
/// is the cursor the search ran at. The `lookahead` bytes before the copy
/// are emitted as literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Match {
    pub start: usize,
    pub len: usize,
    pub lookahead: usize,
}

/// Whether a copy of `len` bytes over `dist` is worth an opcode
fn is_worthwhile(len: usize, dist: usize) -> bool {
    len >= 5 || (len >= 4 && dist < 16384) || (len >= 3 && dist < 1024)
}

/// Find the best copy for the bytes at `pos` (or up to 3 bytes after it)
///
/// Longest wins. The brute-force pass breaks ties towards the smallest
/// lookahead; the indexed pass only replaces the result with something
/// strictly longer.
pub(crate) fn find_match(
    inp: &[u8],
    pos: usize,
    index: &HistoryIndex,
    level: &CompressionLevel,
) -> Option<Match> {
    let search = &inp[pos..usize::min(pos + 4, inp.len())];
    let mut best: Option<Match> = None;
    let mut best_len = 3;
    let mut best_lookahead = usize::MAX;

    // offsets are relative to pos; for pos <= 4 the scan starts past pos
    let mut rel = if pos > 4 { -3 } else { pos as isize - 3 };
    let last = -(usize::min(pos, level.brute_force_length()) as isize);

    while rel >= last && best_len < MAX_COPY_LEN {
        let src = (pos as isize + rel) as usize;
        let cur = inp[src];

        for (lookahead, &b) in search.iter().enumerate() {
            if cur != b || rel >= lookahead as isize {
                continue;
            }
            let dst = pos + lookahead;
            let dist = dst - src;
            if dist > MAX_WINDOW {
                continue;
            }

            let len = run_length(inp, src, dst);
            if (len > best_len || (len == best_len && lookahead < best_lookahead))
                && is_worthwhile(len, dist)
            {
                best = Some(Match {
                    start: src,
                    len,
                    lookahead,
                });
                best_len = len;
                best_lookahead = lookahead;
            }
        }

        rel -= 1;
    }

    if !index.is_empty() && inp.len() - pos > INDEX_TAIL && best_len < MAX_COPY_LEN {
        for lookahead in (0..4).rev() {
            let dst = pos + lookahead;
            for &cand in index.candidates(read_key(inp, dst)) {
                if cand + MAX_WINDOW < pos + 8 {
                    continue;
                }

                let len = run_length(inp, cand, dst);
                if len >= MIN_INDEXED_LEN && len > best_len {
                    best = Some(Match {
                        start: cand,
                        len,
                        lookahead,
                    });
                    best_len = len;
                }
            }
        }
    }

    best
}
