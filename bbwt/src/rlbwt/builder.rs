use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use byteorder::{WriteBytesExt, LE};
use log::{info, trace};

use super::{char_counts, data_path, write_char_counts, write_header, Variant};
use crate::alphabet::Alphabet;
use crate::b_heap::BHeap;
use crate::block::{BlockCodec, MAX_BLOCK_LEN};
use crate::config::BuildConfig;
use crate::counter::{AlphabetCounter, CounterLayout, CounterScope};
use crate::error::{Error, Result};
use crate::super_block::SuperBlockBuilder;

/// What a builder wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    /// The number of symbols.
    pub size: u64,
    /// The number of runs appended, before splitting at block boundaries.
    pub runs: u64,
    pub blocks: u64,
    /// Blocks holding more than `4 * log2(capacity)` runs.
    pub dense_blocks: u64,
    /// Zero for run indexed RLBWTs.
    pub super_blocks: u64,
    pub data_bytes: u64,
}

/// Run state shared by both builders.
#[derive(Debug)]
struct Intake {
    /// Raw totals per input byte.
    totals: Box<[u64; 256]>,
    /// Codes appended to the current block.
    pending: Vec<u64>,
    block_len: u32,
    block_runs: u32,
    summary: BuildSummary,
}

impl Intake {
    fn new(codes: usize) -> Self {
        Self {
            totals: Box::new([0; 256]),
            pending: vec![0; codes],
            block_len: 0,
            block_runs: 0,
            summary: BuildSummary::default(),
        }
    }

    fn check<A: Alphabet>(alphabet: &A, symbol: u8, length: u64) -> Result<u8> {
        if length == 0 {
            return Err(Error::EmptyRun);
        }
        if !alphabet.contains(symbol) {
            return Err(Error::UnknownSymbol(symbol));
        }
        Ok(alphabet.convert(symbol))
    }

    /// Appends a piece of a run to the current block.
    fn push<C: BlockCodec>(&mut self, codec: &C, scratch: &mut C::Scratch, code: u8, length: u32) {
        codec.append(code, length, scratch);
        self.pending[code as usize] += length as u64;
        self.block_len += length;
        self.block_runs += 1;
        self.summary.size += length as u64;
    }

    /// Adds the counts of the committed block to `counters` and starts the next block.
    fn close_block<L: CounterLayout>(
        &mut self,
        counters: &mut [&mut AlphabetCounter<L>],
        dense_runs: u32,
    ) {
        for (code, count) in self.pending.iter_mut().enumerate() {
            if *count > 0 {
                for counter in counters.iter_mut() {
                    counter.add(code as u8, *count);
                }
                *count = 0;
            }
        }
        if self.block_runs > dense_runs {
            self.summary.dense_blocks += 1;
        }
        self.summary.blocks += 1;
        self.block_len = 0;
        self.block_runs = 0;
    }
}

/// Writes a [`BlockRlbwt`](super::BlockRlbwt) in a single pass over the runs of a BWT.
///
/// The root and the data file are written to `W`. Runs are cut at block boundaries and every
/// block is committed as soon as it is full, so the builder only ever holds one super-block in
/// memory.
///
/// # Examples
///
/// ```
/// use bbwt::{alphabet::AcgtAlphabet, block::OneByteBlock, config::BuildConfig};
/// use bbwt::{counter::FixedCounter, rlbwt::BlockRlbwtBuilder, traits::SymbolRank, AcgtRlbwt};
///
/// let (mut root, mut data) = (Vec::new(), Vec::new());
/// let config = BuildConfig::default().with_block_cap(4);
/// type Builder<'a> = BlockRlbwtBuilder<AcgtAlphabet, OneByteBlock, FixedCounter, &'a mut Vec<u8>>;
/// let mut builder = Builder::new(AcgtAlphabet, config, &mut root, &mut data)?;
/// builder.append(b'A', 10)?;
/// builder.append(b'C', 2)?;
/// let summary = builder.finalize()?;
/// assert_eq!(12, summary.size);
/// assert_eq!(3, summary.blocks);
///
/// let index = AcgtRlbwt::read_from(&mut &root[..], &mut &data[..])?;
/// assert_eq!(10, index.rank(11, b'A'));
/// # Ok::<(), bbwt::Error>(())
/// ```
#[derive(Debug)]
pub struct BlockRlbwtBuilder<A, C: BlockCodec, L, W> {
    alphabet: A,
    codec: C,
    block_cap: u32,
    super_block_cap: u64,
    dense_runs: u32,
    block_counter: AlphabetCounter<L>,
    global_counter: AlphabetCounter<L>,
    /// Global snapshots taken after every super-block, starting with an empty one.
    snapshots: Vec<u8>,
    scratch: C::Scratch,
    super_block: SuperBlockBuilder,
    intake: Intake,
    root: W,
    data: W,
}

impl<A: Alphabet, C: BlockCodec, L: CounterLayout> BlockRlbwtBuilder<A, C, L, BufWriter<File>> {
    /// Creates the root file at `path` and the data file next to it.
    pub fn create(alphabet: A, config: BuildConfig, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let root = BufWriter::new(File::create(path)?);
        let data = BufWriter::new(File::create(data_path(path))?);
        Self::new(alphabet, config, root, data)
    }
}

impl<A: Alphabet, C: BlockCodec, L: CounterLayout, W: Write> BlockRlbwtBuilder<A, C, L, W> {
    pub fn new(alphabet: A, config: BuildConfig, root: W, data: W) -> Result<Self> {
        config.validate_blocks()?;
        let codec = C::for_width(alphabet.width())?;
        let bounds = config.resolve_bounds(alphabet.size())?;
        let block_layout = Arc::new(L::for_scope(&bounds.block, CounterScope::Block)?);
        let global_layout = Arc::new(L::for_scope(&bounds.global, CounterScope::Global)?);
        let global_counter = AlphabetCounter::new(global_layout);

        Ok(Self {
            codec,
            block_cap: config.block_cap,
            super_block_cap: config.super_block_cap,
            dense_runs: 4 * config.block_cap.trailing_zeros(),
            block_counter: AlphabetCounter::new(block_layout),
            snapshots: global_counter.as_bytes().to_vec(),
            global_counter,
            scratch: C::Scratch::default(),
            super_block: SuperBlockBuilder::default(),
            intake: Intake::new(alphabet.size()),
            alphabet,
            root,
            data,
        })
    }

    /// Appends `length` copies of `symbol`.
    pub fn append(&mut self, symbol: u8, length: u64) -> Result<()> {
        let code = Intake::check(&self.alphabet, symbol, length)?;
        self.intake.totals[symbol as usize] += length;
        self.intake.summary.runs += 1;

        let mut rest = length;
        while rest > 0 {
            let room = self.block_cap - self.intake.block_len;
            let take = rest.min(room as u64) as u32;
            self.intake.push(&self.codec, &mut self.scratch, code, take);
            rest -= take as u64;
            if self.intake.block_len == self.block_cap {
                self.commit_block()?;
            }
        }
        Ok(())
    }

    fn commit_block(&mut self) -> Result<()> {
        let bytes = self
            .super_block
            .push_block(self.block_counter.as_bytes(), &self.codec, &self.scratch);
        trace!(
            "block {}: {} symbols in {} runs, {bytes} bytes",
            self.intake.summary.blocks,
            self.intake.block_len,
            self.intake.block_runs
        );
        self.codec.reset(&mut self.scratch);

        // the block counter of a full super-block is never read again
        if self.intake.summary.size % self.super_block_cap == 0 {
            self.intake
                .close_block(&mut [&mut self.global_counter], self.dense_runs);
            self.flush_super_block()?;
        } else {
            self.intake.close_block(
                &mut [&mut self.global_counter, &mut self.block_counter],
                self.dense_runs,
            );
        }
        Ok(())
    }

    fn flush_super_block(&mut self) -> Result<()> {
        let blocks = self.super_block.block_count();
        let written = self.super_block.write_to(&mut self.data)?;
        self.intake.summary.data_bytes += written;
        self.intake.summary.super_blocks += 1;
        self.snapshots
            .extend_from_slice(self.global_counter.as_bytes());
        self.block_counter.clear();
        info!(
            "super-block {} flushed: {blocks} blocks, {written} bytes",
            self.intake.summary.super_blocks - 1
        );
        Ok(())
    }

    /// Commits the last block and super-block and writes the root file.
    pub fn finalize(mut self) -> Result<BuildSummary> {
        if self.intake.block_len > 0 {
            self.commit_block()?;
        }
        if !self.super_block.is_empty() {
            self.flush_super_block()?;
        }

        let summary = self.intake.summary;
        let root = &mut self.root;
        write_header(root, Variant::Block)?;
        self.alphabet.write_statics(root)?;
        self.codec.write_statics(root)?;
        self.block_counter.layout().write_statics(root)?;
        self.global_counter.layout().write_statics(root)?;
        root.write_u32::<LE>(self.block_cap)?;
        root.write_u64::<LE>(self.super_block_cap)?;
        root.write_u64::<LE>(summary.data_bytes)?;
        root.write_u64::<LE>(summary.size)?;
        root.write_u64::<LE>(summary.super_blocks)?;
        root.write_all(&self.snapshots)?;
        write_char_counts(root, &char_counts(&self.intake.totals))?;
        root.flush()?;
        self.data.flush()?;

        info!(
            "wrote block rlbwt root: {} symbols in {} runs, {} blocks ({} dense), {} super-blocks, {} data bytes",
            summary.size,
            summary.runs,
            summary.blocks,
            summary.dense_blocks,
            summary.super_blocks,
            summary.data_bytes
        );
        Ok(summary)
    }
}

/// Writes a [`RunRlbwt`](super::RunRlbwt) in a single pass over the runs of a BWT.
///
/// Blocks close after `runs_per_block` runs. Runs longer than a block can address are split.
#[derive(Debug)]
pub struct RunRlbwtBuilder<A, C: BlockCodec, L, W, const B: usize = 64> {
    alphabet: A,
    codec: C,
    runs_per_block: u32,
    counter: AlphabetCounter<L>,
    scratch: C::Scratch,
    /// Committed block bytes, reused between blocks.
    block: Vec<u8>,
    /// `(first position, data offset)` of every block.
    items: Vec<(u64, u64)>,
    block_start: u64,
    intake: Intake,
    root: W,
    data: W,
}

impl<A: Alphabet, C: BlockCodec, L: CounterLayout, const B: usize>
    RunRlbwtBuilder<A, C, L, BufWriter<File>, B>
{
    /// Creates the root file at `path` and the data file next to it.
    pub fn create(alphabet: A, config: BuildConfig, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let root = BufWriter::new(File::create(path)?);
        let data = BufWriter::new(File::create(data_path(path))?);
        Self::new(alphabet, config, root, data)
    }
}

impl<A: Alphabet, C: BlockCodec, L: CounterLayout, W: Write, const B: usize>
    RunRlbwtBuilder<A, C, L, W, B>
{
    pub fn new(alphabet: A, config: BuildConfig, root: W, data: W) -> Result<Self> {
        config.validate_runs()?;
        let codec = C::for_width(alphabet.width())?;
        let bounds = config.resolve_bounds(alphabet.size())?;
        let layout = L::for_scope(&bounds.global, CounterScope::Global)?;

        Ok(Self {
            codec,
            runs_per_block: config.runs_per_block,
            counter: AlphabetCounter::new(Arc::new(layout)),
            scratch: C::Scratch::default(),
            block: Vec::new(),
            items: Vec::new(),
            block_start: 0,
            intake: Intake::new(alphabet.size()),
            alphabet,
            root,
            data,
        })
    }

    /// Appends `length` copies of `symbol`.
    pub fn append(&mut self, symbol: u8, length: u64) -> Result<()> {
        let code = Intake::check(&self.alphabet, symbol, length)?;
        self.intake.totals[symbol as usize] += length;
        self.intake.summary.runs += 1;

        let mut rest = length;
        while rest > 0 {
            let room = MAX_BLOCK_LEN - self.intake.block_len;
            let take = rest.min(room as u64) as u32;
            self.intake.push(&self.codec, &mut self.scratch, code, take);
            rest -= take as u64;
            if self.intake.block_runs == self.runs_per_block
                || self.intake.block_len == MAX_BLOCK_LEN
            {
                self.commit_block()?;
            }
        }
        Ok(())
    }

    fn commit_block(&mut self) -> Result<()> {
        let counter = self.counter.as_bytes();
        self.data.write_all(counter)?;
        let offset = self.intake.summary.data_bytes + counter.len() as u64;
        self.items.push((self.block_start, offset));

        self.block.clear();
        let bytes = self.codec.commit(&self.scratch, &mut self.block);
        self.data.write_all(&self.block)?;
        self.codec.reset(&mut self.scratch);
        trace!(
            "block {}: {} symbols in {} runs, {bytes} bytes at {offset}",
            self.intake.summary.blocks,
            self.intake.block_len,
            self.intake.block_runs
        );

        self.intake.summary.data_bytes = offset + bytes as u64;
        self.block_start += self.intake.block_len as u64;
        let dense_runs = 4 * self.intake.block_len.ilog2();
        self.intake.close_block(&mut [&mut self.counter], dense_runs);
        Ok(())
    }

    /// Commits the last block and writes the root file with the block search tree.
    pub fn finalize(mut self) -> Result<BuildSummary> {
        if self.intake.block_runs > 0 {
            self.commit_block()?;
        }
        let heap = BHeap::<B>::new(&self.items);

        let summary = self.intake.summary;
        let root = &mut self.root;
        write_header(root, Variant::Run)?;
        self.alphabet.write_statics(root)?;
        self.codec.write_statics(root)?;
        self.counter.layout().write_statics(root)?;
        root.write_u32::<LE>(self.runs_per_block)?;
        root.write_u64::<LE>(summary.data_bytes)?;
        root.write_u64::<LE>(summary.size)?;
        root.write_u64::<LE>(summary.blocks)?;
        heap.write_to(root)?;
        write_char_counts(root, &char_counts(&self.intake.totals))?;
        root.flush()?;
        self.data.flush()?;

        info!(
            "wrote run rlbwt root: {} symbols in {} runs, {} blocks ({} dense), search tree of {} levels, {} data bytes",
            summary.size,
            summary.runs,
            summary.blocks,
            summary.dense_blocks,
            heap.levels(),
            summary.data_bytes
        );
        Ok(summary)
    }
}
