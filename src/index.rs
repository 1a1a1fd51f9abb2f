use alloc::collections::{BTreeMap, VecDeque};
use alloc::vec::Vec;

use crate::level::CompressionLevel;
use crate::util::read_key;

extern crate alloc;

/// Sampling stops this close to the end of the input
const SAMPLE_TAIL: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Candidate {
    key: u32,
    pos: usize,
}

/// Index of 4 byte keys to earlier positions holding them
///
/// Sampled positions first wait in the pretracking queue, then become
/// searchable while in the tracking queue, then drop out of the index. Only
/// a sliding window of positions some distance behind the cursor is ever
/// searchable.
pub(crate) struct HistoryIndex {
    pretracking: VecDeque<Candidate>,
    tracking: VecDeque<Candidate>,
    positions: BTreeMap<u32, Vec<usize>>,
    last_sampled: usize,
}

impl HistoryIndex {
    pub fn new() -> Self {
        Self {
            pretracking: VecDeque::new(),
            tracking: VecDeque::new(),
            positions: BTreeMap::new(),
            last_sampled: 0,
        }
    }

    /// Forget everything, keeping the queue allocations
    pub fn reset(&mut self) {
        self.pretracking.clear();
        self.tracking.clear();
        self.positions.clear();
        self.last_sampled = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Indexed positions whose 4 bytes equal `key`, in index order
    pub fn candidates(&self, key: u32) -> &[usize] {
        self.positions.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sample positions behind `cursor` and age the queues accordingly
    pub fn advance(&mut self, inp: &[u8], cursor: usize, level: &CompressionLevel) {
        while cursor > self.last_sampled + level.block_interval()
            && inp.len() - cursor > SAMPLE_TAIL
        {
            if self.pretracking.len() >= level.prequeue_length() {
                if let Some(aged) = self.pretracking.pop_front() {
                    self.tracking.push_back(aged);
                    self.insert(aged, level.same_val_to_track());

                    if self.tracking.len() > level.queue_length() {
                        if let Some(expired) = self.tracking.pop_front() {
                            self.remove(expired);
                        }
                    }
                }
            }

            self.pretracking.push_back(Candidate {
                key: read_key(inp, self.last_sampled),
                pos: self.last_sampled,
            });
            self.last_sampled += level.block_interval();
        }
    }

    fn insert(&mut self, c: Candidate, same_val_to_track: usize) {
        let list = self.positions.entry(c.key).or_default();
        if list.len() >= same_val_to_track {
            // numerically smallest position loses its slot, wherever it is
            if let Some(slot) = list.iter_mut().min() {
                *slot = c.pos;
            }
        } else {
            list.push(c.pos);
        }
    }

    fn remove(&mut self, c: Candidate) {
        if let Some(list) = self.positions.get_mut(&c.key) {
            if let Some(i) = list.iter().position(|&p| p == c.pos) {
                list.remove(i);
            }
            if list.is_empty() {
                self.positions.remove(&c.key);
            }
        }
    }
}
