//! Groups of blocks sharing one byte blob.
//!
//! Every block is preceded by a block scope counter snapshot holding the cumulative counts of all
//! earlier blocks of the same super-block, so a rank query needs one counter read and one block
//! scan.

use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, LE};

use crate::block::BlockCodec;
use crate::counter::CounterLayout;
use crate::error::{Error, Result};
use crate::util::{read_blob, read_u64s, write_blob, write_u64s};

/// A loaded super-block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperBlock {
    /// Start of every block's runs in `data`, just past its counter snapshot.
    offsets: Vec<u64>,
    data: Box<[u8]>,
    block_cap: u32,
    len: u64,
}

impl SuperBlock {
    /// Reads a super-block written by [`SuperBlockBuilder::write_to`].
    ///
    /// # Arguments
    ///
    /// * `reader` - The data file, positioned at the super-block.
    /// * `block_cap` - The logical capacity of a block.
    /// * `len` - The number of symbols in this super-block.
    /// * `counter_size` - The size of a block scope counter snapshot.
    pub fn read_from<R: Read>(
        reader: &mut R,
        block_cap: u32,
        len: u64,
        counter_size: usize,
    ) -> Result<Self> {
        let count = reader.read_u64::<LE>()?;
        let expected = len.div_ceil(block_cap as u64);
        if count != expected {
            return Err(Error::format(format!(
                "super-block of {len} symbols has {count} blocks, expected {expected}"
            )));
        }
        let offsets = read_u64s(reader, count as usize)?;
        let data = read_blob(reader)?;
        if offsets
            .iter()
            .any(|&o| o < counter_size as u64 || o >= data.len() as u64)
        {
            return Err(Error::format("block offset outside of its super-block"));
        }
        Ok(Self {
            offsets,
            data,
            block_cap,
            len,
        })
    }

    /// The number of symbols.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn block_count(&self) -> usize {
        self.offsets.len()
    }

    /// Heap bytes owned by this super-block.
    pub fn bytes(&self) -> usize {
        self.offsets.len() * std::mem::size_of::<u64>() + self.data.len()
    }

    /// The encoded runs of block `k`, followed by whatever comes after it.
    #[inline]
    pub fn block(&self, k: usize) -> &[u8] {
        &self.data[self.offsets[k] as usize..]
    }

    /// The counter snapshot in front of block `k`.
    #[inline]
    pub fn block_counter(&self, k: usize, counter_size: usize) -> &[u8] {
        let offset = self.offsets[k] as usize;
        &self.data[offset - counter_size..offset]
    }

    /// Block and in-block offset of position `i < len`.
    #[inline]
    fn locate(&self, i: u64) -> (usize, u32) {
        let cap = self.block_cap as u64;
        ((i / cap) as usize, (i % cap) as u32)
    }

    /// Like `locate`, but a position on a block boundary maps to the end of the previous block.
    #[inline]
    fn locate_end(&self, i: u64) -> (usize, u32) {
        let cap = self.block_cap as u64;
        if i > 0 && i % cap == 0 {
            ((i / cap - 1) as usize, self.block_cap)
        } else {
            self.locate(i)
        }
    }

    /// The code at position `i < len`.
    #[inline]
    pub fn at<C: BlockCodec>(&self, codec: &C, i: u64) -> u8 {
        let (block, location) = self.locate(i);
        codec.at(self.block(block), location)
    }

    /// Occurrences of `code` in `[0, i)`, for `i < len`.
    #[inline]
    pub fn rank<C: BlockCodec, L: CounterLayout>(
        &self,
        codec: &C,
        layout: &L,
        code: u8,
        i: u64,
    ) -> u64 {
        let (block, location) = self.locate(i);
        let before = layout.get(self.block_counter(block, layout.size()), code);
        before + codec.rank(self.block(block), code, location) as u64
    }

    /// The code at position `i < len` and its rank at `i`.
    #[inline]
    pub fn access_rank<C: BlockCodec, L: CounterLayout>(
        &self,
        codec: &C,
        layout: &L,
        i: u64,
    ) -> (u8, u64) {
        let (block, location) = self.locate(i);
        let (code, rank) = codec.access_rank(self.block(block), location);
        let before = layout.get(self.block_counter(block, layout.size()), code);
        (code, before + rank as u64)
    }

    /// Position of the `k`-th occurrence of `code`, `k` between 1 and the super-block's count.
    pub fn select<C: BlockCodec, L: CounterLayout>(
        &self,
        codec: &C,
        layout: &L,
        code: u8,
        k: u64,
    ) -> u64 {
        let size = layout.size();
        // first block with at least k occurrences before it, block 0 has none
        let (mut lo, mut hi) = (1, self.block_count());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if layout.get(self.block_counter(mid, size), code) < k {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        let block = lo - 1;
        let before = layout.get(self.block_counter(block, size), code);
        let location = codec.select(self.block(block), code, (k - before) as u32);
        block as u64 * self.block_cap as u64 + location as u64
    }

    /// Adds the ranks of every code at `start` to `s_counts` and at `end` to `e_counts`.
    ///
    /// Requires `start <= end <= len`.
    pub fn interval_statistics<C: BlockCodec, L: CounterLayout>(
        &self,
        codec: &C,
        layout: &L,
        start: u64,
        end: u64,
        s_counts: &mut [u64],
        e_counts: &mut [u64],
    ) {
        let (s_block, s_loc) = self.locate_end(start);
        let (e_block, e_loc) = self.locate_end(end);

        if s_block == e_block {
            self.add_block_counter(layout, s_block, s_counts);
            self.add_block_counter(layout, s_block, e_counts);
            codec.interval_statistics(self.block(s_block), s_loc, e_loc, s_counts, e_counts);
            return;
        }

        let mut ignored = vec![0; s_counts.len()];
        self.add_block_counter(layout, s_block, s_counts);
        codec.interval_statistics(self.block(s_block), s_loc, s_loc, s_counts, &mut ignored);
        self.add_block_counter(layout, e_block, e_counts);
        codec.interval_statistics(self.block(e_block), 0, e_loc, &mut ignored, e_counts);
    }

    fn add_block_counter<L: CounterLayout>(&self, layout: &L, block: usize, counts: &mut [u64]) {
        let counter = self.block_counter(block, layout.size());
        for (code, count) in counts.iter_mut().enumerate() {
            *count += layout.get(counter, code as u8);
        }
    }
}

/// Collects the blocks of a super-block under construction.
#[derive(Debug, Default)]
pub struct SuperBlockBuilder {
    offsets: Vec<u64>,
    data: Vec<u8>,
}

impl SuperBlockBuilder {
    /// Appends a block behind its counter snapshot.
    pub fn push_block<C: BlockCodec>(
        &mut self,
        counter: &[u8],
        codec: &C,
        scratch: &C::Scratch,
    ) -> usize {
        self.data.extend_from_slice(counter);
        self.offsets.push(self.data.len() as u64);
        codec.commit(scratch, &mut self.data)
    }

    pub fn block_count(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Writes the super-block and clears the builder for the next one.
    pub fn write_to<W: Write>(&mut self, writer: &mut W) -> Result<u64> {
        writer.write_u64::<LE>(self.offsets.len() as u64)?;
        write_u64s(writer, &self.offsets)?;
        write_blob(writer, &self.data)?;
        let written = 16 + 8 * self.offsets.len() as u64 + self.data.len() as u64;
        self.offsets.clear();
        self.data.clear();
        Ok(written)
    }
}
