/// Chunked keep/drop decisions for one pass attempt.
///
/// A pass enumerates its reducible features in a fixed traversal order and
/// asks the oracle about each one exactly once. Skipping a feature or asking
/// twice desynchronizes every later answer, so passes consult the oracle
/// even for features they end up not touching.

/// A contiguous, inclusive index range over enumerated features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub begin: usize,
    pub end: usize,
}

impl Chunk {
    pub fn contains(self, index: usize) -> bool {
        self.begin <= index && index <= self.end
    }
}

/// Answers "keep or drop?" once per enumerated feature, in order.
///
/// Constructed fresh per pass attempt from a sorted, non-overlapping list of
/// chunks to keep; holds a monotone cursor instead of rescanning the list.
#[derive(Debug)]
pub struct Oracle {
    chunks: Vec<Chunk>,
    cursor: usize,
    index: usize,
}

impl Oracle {
    pub fn new(chunks_to_keep: Vec<Chunk>) -> Self {
        debug_assert!(
            chunks_to_keep
                .windows(2)
                .all(|pair| pair[0].end < pair[1].begin),
            "chunks must be sorted and non-overlapping"
        );
        Self {
            chunks: chunks_to_keep,
            cursor: 0,
            index: 0,
        }
    }

    /// Decide the fate of the next enumerated feature.
    pub fn should_keep(&mut self) -> bool {
        let index = self.index;
        self.index += 1;
        while self.chunks.get(self.cursor).is_some_and(|c| c.end < index) {
            self.cursor += 1;
        }
        self.chunks.get(self.cursor).is_some_and(|c| c.contains(index))
    }

    /// How many features have been enumerated so far. The driver checks this
    /// against the pre-counted feature total after every mutation.
    pub fn calls(&self) -> usize {
        self.index
    }
}

/// Split `[0, count)` into `chunk_count` equal-ish contiguous chunks.
/// Requires `0 < chunk_count <= count`; earlier chunks take the remainder.
pub fn partition(count: usize, chunk_count: usize) -> Vec<Chunk> {
    let base = count / chunk_count;
    let remainder = count % chunk_count;
    let mut chunks = Vec::with_capacity(chunk_count);
    let mut begin = 0;
    for i in 0..chunk_count {
        let size = base + usize::from(i < remainder);
        chunks.push(Chunk {
            begin,
            end: begin + size - 1,
        });
        begin += size;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_indices_inside_chunks() {
        let mut oracle = Oracle::new(vec![Chunk { begin: 1, end: 2 }, Chunk { begin: 5, end: 5 }]);
        let verdicts: Vec<bool> = (0..7).map(|_| oracle.should_keep()).collect();
        assert_eq!(
            verdicts,
            vec![false, true, true, false, false, true, false]
        );
        assert_eq!(oracle.calls(), 7);
    }

    #[test]
    fn empty_keep_set_drops_everything() {
        let mut oracle = Oracle::new(Vec::new());
        assert!(!oracle.should_keep());
        assert!(!oracle.should_keep());
        assert_eq!(oracle.calls(), 2);
    }

    #[test]
    fn partition_covers_the_range_exactly() {
        for count in 1..40 {
            for chunk_count in 1..=count {
                let chunks = partition(count, chunk_count);
                assert_eq!(chunks.len(), chunk_count);
                assert_eq!(chunks[0].begin, 0);
                assert_eq!(chunks[chunk_count - 1].end, count - 1);
                for pair in chunks.windows(2) {
                    assert_eq!(pair[0].end + 1, pair[1].begin);
                }
            }
        }
    }

    #[test]
    fn partition_spreads_remainder_over_leading_chunks() {
        let chunks = partition(10, 3);
        assert_eq!(
            chunks,
            vec![
                Chunk { begin: 0, end: 3 },
                Chunk { begin: 4, end: 6 },
                Chunk { begin: 7, end: 9 },
            ]
        );
    }
}
