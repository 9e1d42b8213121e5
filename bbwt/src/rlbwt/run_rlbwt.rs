use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use byteorder::{ReadBytesExt, LE};
use log::debug;

use super::{read_char_counts, read_header, IntervalSymbol, RunRlbwtBuilder, Variant};
use crate::alphabet::Alphabet;
use crate::b_heap::{BHeap, Shortcut};
use crate::block::{BlockCodec, MAX_BLOCK_LEN};
use crate::config::BuildConfig;
use crate::counter::{CounterLayout, FixedCounter};
use crate::error::{Error, Result};
use crate::traits::{BackwardSearch, SymbolAccess, SymbolRank, SymbolSelect};

/// Precomputed search tree hints for fixed windows of positions.
#[derive(Debug, Clone)]
struct SkipTable {
    stride: u64,
    hints: Vec<Shortcut>,
}

/// An RLBWT split into blocks of a fixed number of runs.
///
/// Block lengths vary, so a [`BHeap`] maps positions to blocks. Every block is preceded by a
/// global counter snapshot, which makes rank one tree descent and one block scan.
///
/// # Generic Arguments
///
/// * `A` - The alphabet mapping symbols to codes.
/// * `C` - The run-length codec of the blocks.
/// * `L` - The layout of the counter snapshots.
/// * `B` - The fan-out of the block search tree.
///
/// # Examples
///
/// ```
/// use bbwt::{alphabet::ByteAlphabet, config::BuildConfig, rlbwt::VbyteRunRlbwt, runs_of};
/// use bbwt::traits::{SymbolAccess, SymbolRank};
///
/// let config = BuildConfig::default().with_runs_per_block(2);
/// let index = VbyteRunRlbwt::from_runs(ByteAlphabet, config, runs_of(b"aaaabbbcca")).unwrap();
///
/// assert_eq!(b'c', index.at(8));
/// assert_eq!(4, index.rank(7, b'a'));
/// ```
#[derive(Debug, Clone)]
pub struct RunRlbwt<A, C, L = FixedCounter, const B: usize = 64> {
    alphabet: A,
    codec: C,
    layout: L,
    runs_per_block: u32,
    size: u64,
    /// Counter snapshots and blocks, alternating, starting with an empty snapshot.
    data: Box<[u8]>,
    heap: BHeap<B>,
    skip: Option<SkipTable>,
    char_counts: Box<[u64; 257]>,
}

impl<A: Alphabet, C: BlockCodec, L: CounterLayout, const B: usize> RunRlbwt<A, C, L, B> {
    /// Builds an index in memory.
    ///
    /// # Arguments
    ///
    /// * `alphabet` - The alphabet of the runs.
    /// * `config` - Runs per block and counter bounds.
    /// * `runs` - The `(symbol, length)` runs of the BWT, in order.
    pub fn from_runs(
        alphabet: A,
        config: BuildConfig,
        runs: impl IntoIterator<Item = (u8, u64)>,
    ) -> Result<Self> {
        let mut root = Vec::new();
        let mut data = Vec::new();
        let mut builder =
            RunRlbwtBuilder::<A, C, L, _, B>::new(alphabet, config, &mut root, &mut data)?;
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

    /// Reads an index written by a [`RunRlbwtBuilder`].
    pub fn read_from<R1: Read, R2: Read>(root: &mut R1, data: &mut R2) -> Result<Self> {
        read_header(root, Variant::Run)?;
        let alphabet = A::load_statics(root)?;
        let codec = C::load_statics(root)?;
        if codec.width() != alphabet.width() {
            return Err(Error::format(format!(
                "codec for {} bit codes cannot hold a {} bit alphabet",
                codec.width(),
                alphabet.width()
            )));
        }
        let layout = L::load_statics(root)?;
        if layout.codes() != alphabet.size() {
            return Err(Error::format("counter layout does not match the alphabet"));
        }

        let runs_per_block = root.read_u32::<LE>()?;
        BuildConfig::default()
            .with_runs_per_block(runs_per_block)
            .validate_runs()
            .map_err(|e| Error::format(e.to_string()))?;
        let data_bytes = root.read_u64::<LE>()?;
        let size = root.read_u64::<LE>()?;
        let block_count = root.read_u64::<LE>()?;
        let heap = BHeap::<B>::read_from(root)?;
        let char_counts = read_char_counts(root, size)?;

        if heap.len() as u64 != block_count || (block_count == 0) != (size == 0) {
            return Err(Error::format(format!(
                "search tree of {} blocks for {block_count} blocks of {size} symbols",
                heap.len()
            )));
        }
        let data_bytes = usize::try_from(data_bytes)
            .map_err(|_| Error::format("data file does not fit in memory"))?;
        let mut blob = vec![0; data_bytes].into_boxed_slice();
        data.read_exact(&mut blob)?;
        Self::check_blocks(&heap, size, layout.size(), data_bytes)?;

        debug!("loaded run rlbwt: {size} symbols, {block_count} blocks, {data_bytes} data bytes");
        Ok(Self {
            alphabet,
            codec,
            layout,
            runs_per_block,
            size,
            data: blob,
            heap,
            skip: None,
            char_counts,
        })
    }

    /// Checks that block starts increase from 0 and every block is addressable.
    fn check_blocks(
        heap: &BHeap<B>,
        size: u64,
        counter_size: usize,
        data_bytes: usize,
    ) -> Result<()> {
        let mut previous = None;
        for k in 0..heap.len() {
            let (start, offset) = heap.item(k);
            let ok = match previous {
                None => start == 0,
                Some((p, _)) => p < start && start - p <= MAX_BLOCK_LEN as u64,
            } && start < size
                && offset >= counter_size as u64
                && offset < data_bytes as u64;
            if !ok {
                return Err(Error::format(format!("corrupt entry {k} in the block search tree")));
            }
            previous = Some((start, offset));
        }
        if let Some((last, _)) = previous {
            if size - last > MAX_BLOCK_LEN as u64 {
                return Err(Error::format("last block is too long"));
            }
        }
        Ok(())
    }

    /// Precomputes search tree hints for every window of `stride` positions.
    ///
    /// Lookups then start below the root of the tree. A stride of 0 removes the table.
    #[must_use]
    pub fn with_skip_table(mut self, stride: u64) -> Self {
        self.skip = (stride > 0 && self.size > 0).then(|| {
            let hints = (0..self.size.div_ceil(stride))
                .map(|w| {
                    let first = w * stride;
                    let last = (first + stride).min(self.size) - 1;
                    self.heap.short_cut(first, last)
                })
                .collect();
            SkipTable { stride, hints }
        });
        self
    }

    pub fn alphabet(&self) -> &A {
        &self.alphabet
    }

    pub fn runs_per_block(&self) -> u32 {
        self.runs_per_block
    }

    pub fn block_count(&self) -> usize {
        self.heap.len()
    }

    /// The number of symbols.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Heap bytes used by the index.
    pub fn bytes(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.data.len()
            + self.heap.bytes()
            + self
                .skip
                .as_ref()
                .map_or(0, |s| s.hints.len() * std::mem::size_of::<Shortcut>())
            + 257 * std::mem::size_of::<u64>()
    }

    /// First position and data offset of the block holding `i <= size`.
    ///
    /// Position `size` maps to the last block.
    #[inline]
    fn locate(&self, i: u64) -> (u64, usize) {
        let (start, offset) = match &self.skip {
            Some(skip) if i < self.size => {
                self.heap.find_from(i, skip.hints[(i / skip.stride) as usize])
            }
            _ => self.heap.find(i),
        };
        (start, offset as usize)
    }

    #[inline]
    fn counter(&self, offset: usize) -> &[u8] {
        &self.data[offset - self.layout.size()..offset]
    }

    #[inline]
    fn total(&self, symbol: u8) -> u64 {
        self.char_counts[symbol as usize + 1] - self.char_counts[symbol as usize]
    }

    /// Adds the counter snapshot in front of the block at `offset` to `counts`.
    fn add_counter(&self, offset: usize, counts: &mut [u64]) {
        let counter = self.counter(offset);
        for (code, count) in counts.iter_mut().enumerate() {
            *count += self.layout.get(counter, code as u8);
        }
    }

    /// Every symbol occurring in `[start, end)` together with its ranks at `start` and `end`.
    ///
    /// Symbols are reported in code order. Bounds past the end of the index are clamped.
    pub fn interval_symbols(&self, start: u64, end: u64) -> Vec<IntervalSymbol> {
        let end = end.min(self.size);
        if start >= end {
            return Vec::new();
        }
        let codes = self.alphabet.size();
        let mut s_counts = vec![0; codes];
        let mut e_counts = vec![0; codes];

        let (s_first, s_offset) = self.locate(start);
        let (e_first, e_offset) = self.locate(end);
        let (s_loc, e_loc) = ((start - s_first) as u32, (end - e_first) as u32);
        if s_offset == e_offset {
            self.add_counter(s_offset, &mut s_counts);
            self.add_counter(s_offset, &mut e_counts);
            self.codec.interval_statistics(
                &self.data[s_offset..],
                s_loc,
                e_loc,
                &mut s_counts,
                &mut e_counts,
            );
        } else {
            let mut ignored = vec![0; codes];
            self.add_counter(s_offset, &mut s_counts);
            self.codec.interval_statistics(
                &self.data[s_offset..],
                s_loc,
                s_loc,
                &mut s_counts,
                &mut ignored,
            );
            self.add_counter(e_offset, &mut e_counts);
            self.codec.interval_statistics(
                &self.data[e_offset..],
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

impl<A: Alphabet, C: BlockCodec, L: CounterLayout, const B: usize> SymbolAccess
    for RunRlbwt<A, C, L, B>
{
    fn len(&self) -> u64 {
        self.size
    }

    #[inline]
    fn at(&self, i: u64) -> u8 {
        if i >= self.size {
            return 0;
        }
        let (start, offset) = self.locate(i);
        let code = self.codec.at(&self.data[offset..], (i - start) as u32);
        self.alphabet.revert(code)
    }

    fn access_rank(&self, i: u64) -> (u8, u64) {
        if i >= self.size {
            return (0, self.rank(i, 0));
        }
        let (start, offset) = self.locate(i);
        let (code, rank) = self
            .codec
            .access_rank(&self.data[offset..], (i - start) as u32);
        let before = self.layout.get(self.counter(offset), code);
        (self.alphabet.revert(code), before + rank as u64)
    }
}

impl<A: Alphabet, C: BlockCodec, L: CounterLayout, const B: usize> SymbolRank
    for RunRlbwt<A, C, L, B>
{
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
        let (start, offset) = self.locate(i);
        self.layout.get(self.counter(offset), code)
            + self
                .codec
                .rank(&self.data[offset..], code, (i - start) as u32) as u64
    }
}

impl<A: Alphabet, C: BlockCodec, L: CounterLayout, const B: usize> SymbolSelect
    for RunRlbwt<A, C, L, B>
{
    fn select(&self, k: u64, symbol: u8) -> Option<u64> {
        if k == 0 || k > self.total(symbol) {
            return None;
        }
        // smallest position whose prefix including it holds k occurrences
        let (mut lo, mut hi) = (0, self.size - 1);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.rank(mid + 1, symbol) < k {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Some(lo)
    }
}

impl<A: Alphabet, C: BlockCodec, L: CounterLayout, const B: usize> BackwardSearch
    for RunRlbwt<A, C, L, B>
{
    fn char_counts(&self) -> &[u64; 257] {
        &self.char_counts
    }
}

#[cfg(test)]
mod test {
    use paste::paste;
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    use super::RunRlbwt;
    use crate::alphabet::{AcgtAlphabet, ByteAlphabet, CorpusStats};
    use crate::block::{DynamicBlock, OneByteBlock, TwoByteBlock, VbyteBlock, MAX_BLOCK_LEN};
    use crate::config::BuildConfig;
    use crate::counter::{FixedCounter, PackedCounter};
    use crate::error::Error;
    use crate::rlbwt::test::{check_lf_cycle, check_queries, naive_bwt, naive_count};
    use crate::rlbwt::{IntervalSymbol, VbyteRunRlbwt};
    use crate::runs_of;
    use crate::traits::{BackwardSearch, SymbolAccess, SymbolRank, SymbolSelect};

    fn random_bwt(rng: &mut SmallRng, symbols: &[u8], len: usize, max_run: usize) -> Vec<u8> {
        let mut bwt = Vec::new();
        while bwt.len() < len {
            let symbol = symbols[rng.gen_range(0..symbols.len())];
            bwt.extend(std::iter::repeat(symbol).take(rng.gen_range(1..=max_run)));
        }
        bwt
    }

    #[test]
    fn aaacca() {
        let config = BuildConfig::default();
        let index = VbyteRunRlbwt::from_runs(AcgtAlphabet, config, runs_of(b"AAACCA")).unwrap();
        assert_eq!(4, index.rank(6, b'A'));
        assert_eq!(3, index.rank(3, b'A'));
        assert_eq!(b'A', index.at(5));
        assert_eq!(Some(3), index.select(1, b'C'));
        assert_eq!(Some(1), index.select(2, b'A'));
        assert_eq!(1, index.block_count());
    }

    #[test]
    fn empty_index() {
        let index = VbyteRunRlbwt::from_runs(AcgtAlphabet, BuildConfig::default(), []).unwrap();
        assert!(index.is_empty());
        assert_eq!(0, index.block_count());
        assert_eq!(0, index.at(3));
        assert_eq!(0, index.rank(3, b'A'));
        assert_eq!(None, index.select(1, b'A'));
        assert!(index.interval_symbols(0, 3).is_empty());
        assert!(index.with_skip_table(8).is_empty());
    }

    #[test]
    fn splits_runs_longer_than_a_block() {
        let len = MAX_BLOCK_LEN as u64 + 10;
        let index = RunRlbwt::<AcgtAlphabet, VbyteBlock>::from_runs(
            AcgtAlphabet,
            BuildConfig::default(),
            [(b'A', len), (b'C', 3)],
        )
        .unwrap();
        assert_eq!(2, index.block_count());
        assert_eq!(b'A', index.at(len - 1));
        assert_eq!(b'C', index.at(len));
        assert_eq!(len, index.rank(len + 2, b'A'));
        assert_eq!(Some(len - 1), index.select(len, b'A'));
        assert_eq!(Some(len + 1), index.select(2, b'C'));
    }

    #[test]
    fn skip_table_gives_same_answers() {
        let mut rng = SmallRng::seed_from_u64(21);
        let bwt = random_bwt(&mut rng, b"ACGT", 3000, 6);
        let config = BuildConfig::default().with_runs_per_block(4);
        let plain = RunRlbwt::<AcgtAlphabet, OneByteBlock, FixedCounter, 4>::from_runs(
            AcgtAlphabet,
            config,
            runs_of(&bwt),
        )
        .unwrap();
        for stride in [1, 7, 64, 5000] {
            let skipping = plain.clone().with_skip_table(stride);
            check_queries(&skipping, &bwt);
        }
        check_queries(&plain.with_skip_table(0), &bwt);
    }

    #[test]
    fn interval_symbols_test() {
        let mut rng = SmallRng::seed_from_u64(22);
        let bwt = random_bwt(&mut rng, b"ACGTN", 400, 5);
        let config = BuildConfig::default().with_runs_per_block(3);
        let index =
            RunRlbwt::<AcgtAlphabet, TwoByteBlock>::from_runs(AcgtAlphabet, config, runs_of(&bwt))
                .unwrap();
        for _ in 0..300 {
            let start = rng.gen_range(0..=bwt.len() as u64);
            let end = rng.gen_range(start..=bwt.len() as u64 + 2);
            let expected: Vec<_> = b"NACGT"
                .iter()
                .map(|&symbol| IntervalSymbol {
                    symbol,
                    start_rank: index.rank(start, symbol),
                    end_rank: index.rank(end, symbol),
                })
                .filter(|s| s.end_rank > s.start_rank)
                .collect();
            assert_eq!(expected, index.interval_symbols(start, end), "[{start}, {end})");
        }
    }

    #[test]
    fn count_and_lf_on_real_bwt() {
        let mut rng = SmallRng::seed_from_u64(23);
        let text: Vec<u8> = (0..400).map(|_| b"ab"[rng.gen_range(0..2)]).collect();
        let bwt = naive_bwt(&text);
        let config = BuildConfig::default().with_runs_per_block(5);
        type Codec = DynamicBlock<VbyteBlock, OneByteBlock>;
        type Index = RunRlbwt<ByteAlphabet, Codec, FixedCounter, 2>;
        let index = Index::from_runs(ByteAlphabet, config, runs_of(&bwt))
            .unwrap()
            .with_skip_table(32);

        check_queries(&index, &bwt);
        check_lf_cycle(&index, &text);
        for len in 1..8 {
            for start in (0..text.len() - len).step_by(13) {
                let pattern = &text[start..start + len];
                assert_eq!(naive_count(&text, pattern), index.count(pattern), "{pattern:?}");
            }
        }
    }

    macro_rules! counter_tests {
        ($($name:ident: $layout:ty),*) => {
            $(
                paste! {
                    #[test]
                    fn [<$name _counters>]() {
                        let mut rng = SmallRng::seed_from_u64(24);
                        let bwt = random_bwt(&mut rng, b"ACGTN", 900, 30);
                        let stats = CorpusStats::from_runs(runs_of(&bwt), 1 << 32).unwrap();
                        let config = BuildConfig::default()
                            .with_runs_per_block(7)
                            .with_bounds(stats.bounds(&AcgtAlphabet));
                        type Index = RunRlbwt<AcgtAlphabet, VbyteBlock, $layout>;
                        let index = Index::from_runs(AcgtAlphabet, config, runs_of(&bwt)).unwrap();
                        check_queries(&index, &bwt);
                    }
                }
            )*
        };
    }

    counter_tests!(fixed: FixedCounter, packed: PackedCounter);

    #[test]
    fn corrupt_files_are_rejected() {
        let (mut root, mut data) = (Vec::new(), Vec::new());
        let mut builder = crate::rlbwt::RunRlbwtBuilder::<_, VbyteBlock, FixedCounter, _>::new(
            AcgtAlphabet,
            BuildConfig::default().with_runs_per_block(2),
            &mut root,
            &mut data,
        )
        .unwrap();
        for (symbol, length) in runs_of(b"AACCCGTTA") {
            builder.append(symbol, length).unwrap();
        }
        builder.finalize().unwrap();

        type Index = VbyteRunRlbwt<AcgtAlphabet>;
        assert!(Index::read_from(&mut &root[..], &mut &data[..]).is_ok());
        assert!(Index::read_from(&mut &root[..], &mut &data[..data.len() - 1]).is_err());
        type NarrowIndex = RunRlbwt<AcgtAlphabet, VbyteBlock, FixedCounter, 8>;
        assert!(matches!(
            NarrowIndex::read_from(&mut &root[..], &mut &data[..]),
            Err(Error::InvalidFormat(_))
        ));
        assert!(matches!(
            crate::rlbwt::AcgtRlbwt::read_from(&mut &root[..], &mut &data[..]),
            Err(Error::InvalidFormat(_))
        ));
    }
}
