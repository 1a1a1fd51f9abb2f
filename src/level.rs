/// Positions further back than this are never indexed
const INDEX_WINDOW: usize = 131000;

/// Compression level
///
/// Tunes how thoroughly the compressor searches for matches. Every field is
/// in bytes except `prequeue_length` and `queue_length`, which count sampled
/// positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionLevel {
    block_interval: usize,
    search_length: usize,
    prequeue_length: usize,
    queue_length: usize,
    same_val_to_track: usize,
    brute_force_length: usize,
}

const fn at_least_one(v: usize) -> usize {
    if v == 0 {
        1
    } else {
        v
    }
}

impl CompressionLevel {
    /// Exhaustive search: every position is indexed, 10 candidates per key,
    /// and the previous 64 bytes are always brute-forced
    pub const MAX: Self = Self::derived(1, 1, 10, 64);

    /// Build a level with every parameter given explicitly
    pub const fn new(
        block_interval: usize,
        search_length: usize,
        prequeue_length: usize,
        queue_length: usize,
        same_val_to_track: usize,
        brute_force_length: usize,
    ) -> Self {
        Self {
            block_interval: at_least_one(block_interval),
            search_length,
            prequeue_length: at_least_one(prequeue_length),
            queue_length,
            same_val_to_track: at_least_one(same_val_to_track),
            brute_force_length,
        }
    }

    /// Build a level whose queue sizes are derived from `search_length`
    ///
    /// The queues together span (roughly) the whole copy window.
    pub const fn derived(
        block_interval: usize,
        search_length: usize,
        same_val_to_track: usize,
        brute_force_length: usize,
    ) -> Self {
        let block_interval = at_least_one(block_interval);
        let prequeue_length = search_length / block_interval;
        let queue_length = (INDEX_WINDOW / block_interval).saturating_sub(prequeue_length);
        Self::new(
            block_interval,
            search_length,
            prequeue_length,
            queue_length,
            same_val_to_track,
            brute_force_length,
        )
    }

    /// Sampling stride for the history index
    pub const fn block_interval(&self) -> usize {
        self.block_interval
    }
    pub const fn search_length(&self) -> usize {
        self.search_length
    }
    /// Sampled positions waiting before they become searchable
    pub const fn prequeue_length(&self) -> usize {
        self.prequeue_length
    }
    /// Sampled positions kept searchable
    pub const fn queue_length(&self) -> usize {
        self.queue_length
    }
    /// Candidate positions remembered per 4 byte key
    pub const fn same_val_to_track(&self) -> usize {
        self.same_val_to_track
    }
    /// How far back every position is tried unconditionally
    pub const fn brute_force_length(&self) -> usize {
        self.brute_force_length
    }
}
impl Default for CompressionLevel {
    fn default() -> Self {
        Self::MAX
    }
}
