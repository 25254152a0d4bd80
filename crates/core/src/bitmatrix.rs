//! Compact per-cell boolean markers

/// A `rows x cols` grid of flags packed 64 per word.
///
/// Used to remember which cells were already taken by a pit pool in the
/// current round, and to deduplicate incremental scans.
#[derive(Debug, Clone)]
pub struct BitMatrix {
    rows: usize,
    cols: usize,
    words: Vec<u64>,
}

impl BitMatrix {
    /// Create an all-clear matrix
    pub fn new(rows: usize, cols: usize) -> Self {
        let bits = rows * cols;
        Self {
            rows,
            cols,
            words: vec![0; bits.div_ceil(64)],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    fn locate(&self, row: usize, col: usize) -> (usize, u64) {
        debug_assert!(row < self.rows && col < self.cols);
        let bit = row * self.cols + col;
        (bit / 64, 1u64 << (bit % 64))
    }

    /// Set the flag of (row, col)
    #[inline]
    pub fn mark(&mut self, row: usize, col: usize) {
        let (word, mask) = self.locate(row, col);
        self.words[word] |= mask;
    }

    /// Set the flag of (row, col), returning whether it was clear before.
    #[inline]
    pub fn mark_new(&mut self, row: usize, col: usize) -> bool {
        let (word, mask) = self.locate(row, col);
        let fresh = self.words[word] & mask == 0;
        self.words[word] |= mask;
        fresh
    }

    #[inline]
    pub fn is_marked(&self, row: usize, col: usize) -> bool {
        let (word, mask) = self.locate(row, col);
        self.words[word] & mask != 0
    }

    /// Number of marked cells
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}
