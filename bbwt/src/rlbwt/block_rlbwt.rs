use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use byteorder::{ReadBytesExt, LE};
use log::debug;

use super::{read_char_counts, read_header, BlockRlbwtBuilder, IntervalSymbol, Variant};
use crate::alphabet::Alphabet;
use crate::block::BlockCodec;
use crate::config::BuildConfig;
use crate::counter::{CounterLayout, FixedCounter};
use crate::error::{Error, Result};
use crate::super_block::SuperBlock;
use crate::traits::{BackwardSearch, SymbolAccess, SymbolRank, SymbolSelect};

/// An RLBWT split into blocks of a fixed number of symbols.
///
/// Blocks are grouped into super-blocks. A rank query reads one global counter snapshot for the
/// super-block, one block scope snapshot for the block and scans the runs of a single block.
///
/// # Generic Arguments
///
/// * `A` - The alphabet mapping symbols to codes.
/// * `C` - The run-length codec of the blocks.
/// * `L` - The layout of the counter snapshots.
///
/// # Examples
///
/// ```
/// use bbwt::{alphabet::AcgtAlphabet, config::BuildConfig, runs_of, AcgtRlbwt};
/// use bbwt::traits::{BackwardSearch, SymbolAccess, SymbolRank, SymbolSelect};
///
/// let config = BuildConfig::default();
/// let index = AcgtRlbwt::from_runs(AcgtAlphabet, config, runs_of(b"AAACCA")).unwrap();
///
/// assert_eq!(6, index.len());
/// assert_eq!(b'A', index.at(5));
/// assert_eq!(4, index.rank(6, b'A'));
/// assert_eq!(Some(3), index.select(1, b'C'));
/// assert_eq!(2, index.count(b"C"));
/// ```
#[derive(Debug, Clone)]
pub struct BlockRlbwt<A, C, L = FixedCounter> {
    alphabet: A,
    codec: C,
    block_layout: L,
    global_layout: L,
    block_cap: u32,
    super_block_cap: u64,
    size: u64,
    super_blocks: Vec<SuperBlock>,
    /// Global counter snapshots in front of every super-block and one past the last.
    global_counters: Box<[u8]>,
    char_counts: Box<[u64; 257]>,
}

impl<A: Alphabet, C: BlockCodec, L: CounterLayout> BlockRlbwt<A, C, L> {
    /// Builds an index in memory.
    ///
    /// # Arguments
    ///
    /// * `alphabet` - The alphabet of the runs.
    /// * `config` - Block sizes and counter bounds.
    /// * `runs` - The `(symbol, length)` runs of the BWT, in order.
    pub fn from_runs(
        alphabet: A,
        config: BuildConfig,
        runs: impl IntoIterator<Item = (u8, u64)>,
    ) -> Result<Self> {
        let mut root = Vec::new();
        let mut data = Vec::new();
        let mut builder =
            BlockRlbwtBuilder::<A, C, L, _>::new(alphabet, config, &mut root, &mut data)?;
        for (symbol, length) in runs {
            builder.append(symbol, length)?;
        }
        builder.finalize()?;
        Self::read_from(&mut &root[..], &mut &data[..])
    }

    /// Loads the index with root file `path` and its data file next to it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut root = BufReader::new(File::open(path)?);
        let mut data = BufReader::new(File::open(super::data_path(path))?);
        Self::read_from(&mut root, &mut data)
    }

    /// Reads an index written by a [`BlockRlbwtBuilder`].
    pub fn read_from<R1: Read, R2: Read>(root: &mut R1, data: &mut R2) -> Result<Self> {
        read_header(root, Variant::Block)?;
        let alphabet = A::load_statics(root)?;
        let codec = C::load_statics(root)?;
        if codec.width() != alphabet.width() {
            return Err(Error::format(format!(
                "codec for {} bit codes cannot hold a {} bit alphabet",
                codec.width(),
                alphabet.width()
            )));
        }
        let block_layout = L::load_statics(root)?;
        let global_layout = L::load_statics(root)?;
        if block_layout.codes() != alphabet.size() || global_layout.codes() != alphabet.size() {
            return Err(Error::format("counter layout does not match the alphabet"));
        }

        let config = BuildConfig::default()
            .with_block_cap(root.read_u32::<LE>()?)
            .with_super_block_cap(root.read_u64::<LE>()?);
        config
            .validate_blocks()
            .map_err(|e| Error::format(e.to_string()))?;
        let (block_cap, super_block_cap) = (config.block_cap, config.super_block_cap);

        let data_bytes = root.read_u64::<LE>()?;
        let size = root.read_u64::<LE>()?;
        let super_block_count = root.read_u64::<LE>()?;
        if super_block_count != size.div_ceil(super_block_cap) {
            return Err(Error::format(format!(
                "{super_block_count} super-blocks cannot hold {size} symbols"
            )));
        }

        let snapshot_bytes = (super_block_count as usize + 1) * global_layout.size();
        let mut global_counters = vec![0; snapshot_bytes].into_boxed_slice();
        root.read_exact(&mut global_counters)?;
        let char_counts = read_char_counts(root, size)?;

        let mut super_blocks = Vec::with_capacity(super_block_count as usize);
        let mut read = 0u64;
        for k in 0..super_block_count {
            let len = (size - k * super_block_cap).min(super_block_cap);
            let super_block = SuperBlock::read_from(data, block_cap, len, block_layout.size())?;
            read += 16 + super_block.bytes() as u64;
            super_blocks.push(super_block);
        }
        if read != data_bytes {
            return Err(Error::format(format!(
                "data file holds {read} bytes of super-blocks, expected {data_bytes}"
            )));
        }

        debug!(
            "loaded block rlbwt: {size} symbols, {super_block_count} super-blocks, {data_bytes} data bytes"
        );
        Ok(Self {
            alphabet,
            codec,
            block_layout,
            global_layout,
            block_cap,
            super_block_cap,
            size,
            super_blocks,
            global_counters,
            char_counts,
        })
    }

    pub fn alphabet(&self) -> &A {
        &self.alphabet
    }

    pub fn block_cap(&self) -> u32 {
        self.block_cap
    }

    pub fn super_block_cap(&self) -> u64 {
        self.super_block_cap
    }

    /// The number of symbols.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Heap bytes used by the index.
    pub fn bytes(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.super_blocks.iter().map(SuperBlock::bytes).sum::<usize>()
            + self.global_counters.len()
            + 257 * std::mem::size_of::<u64>()
    }

    /// The global counter snapshot in front of super-block `k`.
    #[inline]
    fn global_counter(&self, k: usize) -> &[u8] {
        let size = self.global_layout.size();
        &self.global_counters[k * size..(k + 1) * size]
    }

    /// Total occurrences of `symbol`.
    #[inline]
    fn total(&self, symbol: u8) -> u64 {
        self.char_counts[symbol as usize + 1] - self.char_counts[symbol as usize]
    }

    #[inline]
    fn locate(&self, i: u64) -> (usize, u64) {
        ((i / self.super_block_cap) as usize, i % self.super_block_cap)
    }

    /// Like `locate`, but a position on a super-block boundary maps to the end of the previous one.
    #[inline]
    fn locate_end(&self, i: u64) -> (usize, u64) {
        if i > 0 && i % self.super_block_cap == 0 {
            ((i / self.super_block_cap - 1) as usize, self.super_block_cap)
        } else {
            self.locate(i)
        }
    }

    fn add_global_counter(&self, k: usize, counts: &mut [u64]) {
        let counter = self.global_counter(k);
        for (code, count) in counts.iter_mut().enumerate() {
            *count += self.global_layout.get(counter, code as u8);
        }
    }

    /// Every symbol occurring in `[start, end)` together with its ranks at `start` and `end`.
    ///
    /// Symbols are reported in code order. Bounds past the end of the index are clamped.
    ///
    /// # Examples
    ///
    /// ```
    /// use bbwt::{alphabet::AcgtAlphabet, config::BuildConfig, rlbwt::IntervalSymbol};
    /// use bbwt::{runs_of, AcgtRlbwt};
    ///
    /// let config = BuildConfig::default();
    /// let index = AcgtRlbwt::from_runs(AcgtAlphabet, config, runs_of(b"AAACCA")).unwrap();
    ///
    /// assert_eq!(
    ///     vec![
    ///         IntervalSymbol { symbol: b'A', start_rank: 2, end_rank: 3 },
    ///         IntervalSymbol { symbol: b'C', start_rank: 0, end_rank: 1 },
    ///     ],
    ///     index.interval_symbols(2, 4)
    /// );
    /// ```
    pub fn interval_symbols(&self, start: u64, end: u64) -> Vec<IntervalSymbol> {
        let end = end.min(self.size);
        if start >= end {
            return Vec::new();
        }
        let codes = self.alphabet.size();
        let mut s_counts = vec![0; codes];
        let mut e_counts = vec![0; codes];

        let (s_sb, s_loc) = self.locate_end(start);
        let (e_sb, e_loc) = self.locate_end(end);
        let layout = &self.block_layout;
        if s_sb == e_sb {
            self.add_global_counter(s_sb, &mut s_counts);
            self.add_global_counter(s_sb, &mut e_counts);
            self.super_blocks[s_sb].interval_statistics(
                &self.codec,
                layout,
                s_loc,
                e_loc,
                &mut s_counts,
                &mut e_counts,
            );
        } else {
            let mut ignored = vec![0; codes];
            self.add_global_counter(s_sb, &mut s_counts);
            self.super_blocks[s_sb].interval_statistics(
                &self.codec,
                layout,
                s_loc,
                s_loc,
                &mut s_counts,
                &mut ignored,
            );
            self.add_global_counter(e_sb, &mut e_counts);
            self.super_blocks[e_sb].interval_statistics(
                &self.codec,
                layout,
                e_loc,
                e_loc,
                &mut ignored,
                &mut e_counts,
            );
        }

        s_counts
            .into_iter()
            .zip(e_counts)
            .enumerate()
            .filter(|&(_, (s, e))| e > s)
            .map(|(code, (start_rank, end_rank))| IntervalSymbol {
                symbol: self.alphabet.revert(code as u8),
                start_rank,
                end_rank,
            })
            .collect()
    }
}

impl<A: Alphabet, C: BlockCodec, L: CounterLayout> SymbolAccess for BlockRlbwt<A, C, L> {
    fn len(&self) -> u64 {
        self.size
    }

    #[inline]
    fn at(&self, i: u64) -> u8 {
        if i >= self.size {
            return 0;
        }
        let (sb, local) = self.locate(i);
        self.alphabet
            .revert(self.super_blocks[sb].at(&self.codec, local))
    }

    fn access_rank(&self, i: u64) -> (u8, u64) {
        if i >= self.size {
            return (0, self.rank(i, 0));
        }
        let (sb, local) = self.locate(i);
        let (code, rank) =
            self.super_blocks[sb].access_rank(&self.codec, &self.block_layout, local);
        let before = self.global_layout.get(self.global_counter(sb), code);
        (self.alphabet.revert(code), before + rank)
    }
}

impl<A: Alphabet, C: BlockCodec, L: CounterLayout> SymbolRank for BlockRlbwt<A, C, L> {
    #[inline]
    fn rank(&self, i: u64, symbol: u8) -> u64 {
        let total = self.total(symbol);
        if total == 0 {
            return 0;
        }
        if i >= self.size {
            return total;
        }
        let code = self.alphabet.convert(symbol);
        let (sb, local) = self.locate(i);
        self.global_layout.get(self.global_counter(sb), code)
            + self.super_blocks[sb].rank(&self.codec, &self.block_layout, code, local)
    }
}

impl<A: Alphabet, C: BlockCodec, L: CounterLayout> SymbolSelect for BlockRlbwt<A, C, L> {
    fn select(&self, k: u64, symbol: u8) -> Option<u64> {
        if k == 0 || k > self.total(symbol) {
            return None;
        }
        let code = self.alphabet.convert(symbol);
        // first snapshot with at least k occurrences before it, snapshot 0 has none
        let (mut lo, mut hi) = (1, self.super_blocks.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.global_layout.get(self.global_counter(mid), code) < k {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        let sb = lo - 1;
        let before = self.global_layout.get(self.global_counter(sb), code);
        let local = self.super_blocks[sb].select(&self.codec, &self.block_layout, code, k - before);
        Some(sb as u64 * self.super_block_cap + local)
    }
}

impl<A: Alphabet, C: BlockCodec, L: CounterLayout> BackwardSearch for BlockRlbwt<A, C, L> {
    fn char_counts(&self) -> &[u64; 257] {
        &self.char_counts
    }
}
