/// Random access to the symbols of an index.
pub trait SymbolAccess {
    /// The number of symbols.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gets the symbol at position `i`.
    ///
    /// Positions past the end return 0.
    fn at(&self, i: u64) -> u8;

    /// Gets the symbol at position `i < len` and its rank at `i`, i.e. `(at(i), rank(i, at(i)))`.
    ///
    /// This needs a single scan of the block holding `i`.
    fn access_rank(&self, i: u64) -> (u8, u64);
}

/// Counting symbol occurrences in prefixes of an index.
pub trait SymbolRank {
    /// Counts the occurrences of `symbol` in positions `[0, i)`.
    ///
    /// For `i` at or past the end this is the total number of occurrences. Symbols that do not
    /// occur at all have rank 0 everywhere.
    ///
    /// # Arguments
    ///
    /// * `i` - The exclusive end of the prefix.
    /// * `symbol` - The symbol to count.
    ///
    /// # Examples
    ///
    /// ```
    /// use bbwt::{alphabet::AcgtAlphabet, config::BuildConfig, traits::SymbolRank};
    /// use bbwt::{runs_of, AcgtRlbwt};
    ///
    /// let config = BuildConfig::default();
    /// let index = AcgtRlbwt::from_runs(AcgtAlphabet, config, runs_of(b"AAACCA")).unwrap();
    ///
    /// assert_eq!(3, index.rank(3, b'A'));
    /// assert_eq!(4, index.rank(6, b'A'));
    /// assert_eq!(4, index.rank(100, b'A'));
    /// assert_eq!(0, index.rank(6, b'G'));
    /// ```
    fn rank(&self, i: u64, symbol: u8) -> u64;
}

/// Finding the position of the `k`-th occurrence of a symbol.
pub trait SymbolSelect {
    /// Returns the position of the `k`-th occurrence of `symbol`, counting from 1.
    ///
    /// Returns `None` if `k` is 0 or `symbol` occurs fewer than `k` times.
    fn select(&self, k: u64, symbol: u8) -> Option<u64>;
}

/// Pattern counting on a Burrows-Wheeler transform.
pub trait BackwardSearch: SymbolAccess + SymbolRank {
    /// The exclusive prefix sums of the symbol counts, indexed by byte value.
    ///
    /// `char_counts()[c]` is the number of symbols smaller than `c` and the last entry is the
    /// length of the index.
    fn char_counts(&self) -> &[u64; 257];

    /// Counts the occurrences of `pattern` in the text whose BWT this index holds.
    ///
    /// The search interval is narrowed right to left and the search stops as soon as it becomes
    /// empty. The empty pattern occurs once per position.
    fn count(&self, pattern: &[u8]) -> u64 {
        let Some((&last, rest)) = pattern.split_last() else {
            return self.len();
        };
        let counts = self.char_counts();
        let mut start = counts[last as usize];
        let mut end = counts[last as usize + 1];
        for &c in rest.iter().rev() {
            if start >= end {
                return 0;
            }
            start = counts[c as usize] + self.rank(start, c);
            end = counts[c as usize] + self.rank(end, c);
        }
        end.saturating_sub(start)
    }

    /// The last-to-first mapping of position `i < len`.
    fn lf(&self, i: u64) -> u64 {
        let (symbol, rank) = self.access_rank(i);
        self.char_counts()[symbol as usize] + rank
    }
}
