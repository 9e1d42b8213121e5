//! Run-length encoded blocks.
//!
//! A block is a short byte string of `(code, length)` runs. All codecs answer queries by a
//! linear scan over the runs, which is fast as long as blocks stay small. Positions and counts
//! inside a block are `u32`.

use std::fmt::Debug;
use std::io::{Read, Write};

mod dynamic;
mod one_byte;
#[cfg(all(feature = "simd", target_arch = "x86_64", target_feature = "avx2"))]
mod simd;
mod two_byte;
mod vbyte;

pub use dynamic::{DynamicBlock, DynamicScratch};
pub use one_byte::OneByteBlock;
pub use two_byte::TwoByteBlock;
pub use vbyte::VbyteBlock;

use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};

/// The largest number of symbols a block may hold.
pub const MAX_BLOCK_LEN: u32 = u32::MAX >> 1;

/// A run-length codec for blocks of codes of a fixed bit width.
///
/// Codecs are built once per index from the alphabet width. Encoding goes through a
/// [`BlockCodec::Scratch`] arena that is reset between blocks, decoding works on the committed
/// bytes.
///
/// Queries take the block's bytes and trust them: garbage input may produce wrong answers or a
/// panic from slice indexing, but nothing worse.
pub trait BlockCodec: Clone + Debug + Send + Sync + Sized {
    /// Encoding state of the block under construction.
    type Scratch: Default + Debug;

    /// Creates the codec for codes of `width` bits.
    fn for_width(width: u32) -> Result<Self>;

    /// The code width this codec was built for.
    fn width(&self) -> u32;

    /// Appends a run to the block under construction and returns its encoded size so far.
    ///
    /// `length` has to be positive, the caller keeps the block below its capacity.
    fn append(&self, code: u8, length: u32, scratch: &mut Self::Scratch) -> usize;

    /// Number of bytes [`BlockCodec::commit`] would write.
    fn encoded_len(&self, scratch: &Self::Scratch) -> usize;

    /// Writes the finished block to `out` and returns the number of bytes written.
    fn commit(&self, scratch: &Self::Scratch, out: &mut Vec<u8>) -> usize;

    /// Clears the scratch arena, keeping its allocations.
    fn reset(&self, scratch: &mut Self::Scratch);

    /// Offset of the first run inside `block`.
    #[inline]
    fn first_run(&self, _block: &[u8]) -> usize {
        0
    }

    /// Decodes the run starting at `*pos` and advances `pos` past it.
    fn decode_run(&self, block: &[u8], pos: &mut usize) -> (u8, u32);

    /// The code at `location`, which has to be smaller than the block length.
    #[inline]
    fn at(&self, block: &[u8], mut location: u32) -> u8 {
        let mut pos = self.first_run(block);
        loop {
            let (current, length) = self.decode_run(block, &mut pos);
            if location < length {
                return current;
            }
            location -= length;
        }
    }

    /// The number of occurrences of `code` in `[0, location)`, `location` at most the block length.
    #[inline]
    fn rank(&self, block: &[u8], code: u8, mut location: u32) -> u32 {
        let mut pos = self.first_run(block);
        let mut res = 0;
        loop {
            let (current, length) = self.decode_run(block, &mut pos);
            if location <= length {
                return res + if current == code { location } else { 0 };
            }
            location -= length;
            res += if current == code { length } else { 0 };
        }
    }

    /// The code at `location` together with its rank at `location`, in a single scan.
    fn access_rank(&self, block: &[u8], mut location: u32) -> (u8, u32) {
        let mut counts = [0u32; 256];
        let mut pos = self.first_run(block);
        loop {
            let (current, length) = self.decode_run(block, &mut pos);
            if location < length {
                return (current, counts[current as usize] + location);
            }
            location -= length;
            counts[current as usize] += length;
        }
    }

    /// The position of the `k`-th occurrence of `code`, counting from 1.
    ///
    /// `k` has to be between 1 and the number of occurrences of `code` in the block.
    fn select(&self, block: &[u8], code: u8, mut k: u32) -> u32 {
        debug_assert!(k > 0);
        let mut pos = self.first_run(block);
        let mut res = 0;
        loop {
            let (current, length) = self.decode_run(block, &mut pos);
            if current == code {
                if length >= k {
                    return res + k - 1;
                }
                k -= length;
            }
            res += length;
        }
    }

    /// Adds the rank of every code at `start` to `s_counts` and at `end` to `e_counts`.
    ///
    /// Requires `start <= end <= len` where `len` is the block length.
    fn interval_statistics(
        &self,
        block: &[u8],
        start: u32,
        end: u32,
        s_counts: &mut [u64],
        e_counts: &mut [u64],
    ) {
        debug_assert!(start <= end);
        let mut pos = self.first_run(block);
        let mut offset = 0u32;
        loop {
            let (current, length) = self.decode_run(block, &mut pos);
            let c = current as usize;
            s_counts[c] += start.saturating_sub(offset).min(length) as u64;
            e_counts[c] += end.saturating_sub(offset).min(length) as u64;
            offset += length;
            if offset >= end {
                return;
            }
        }
    }

    /// Iterates over the runs of a block holding `len` symbols.
    fn runs<'a>(&'a self, block: &'a [u8], len: u32) -> Runs<'a, Self> {
        Runs {
            codec: self,
            block,
            pos: self.first_run(block),
            remaining: len,
        }
    }

    fn write_statics<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.width() as u8)?;
        Ok(())
    }

    fn load_statics<R: Read>(reader: &mut R) -> Result<Self> {
        let width = reader.read_u8()? as u32;
        Self::for_width(width).map_err(|e| Error::format(e.to_string()))
    }
}

/// Iterator over the decoded runs of a block, see [`BlockCodec::runs`].
#[derive(Debug)]
pub struct Runs<'a, C> {
    codec: &'a C,
    block: &'a [u8],
    pos: usize,
    remaining: u32,
}

impl<C: BlockCodec> Iterator for Runs<'_, C> {
    type Item = (u8, u32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let (code, length) = self.codec.decode_run(self.block, &mut self.pos);
        self.remaining = self.remaining.saturating_sub(length);
        Some((code, length))
    }
}

fn check_width(width: u32, max: u32) -> Result<()> {
    if width == 0 || width > max {
        return Err(Error::config(format!(
            "codes of {width} bits are not supported, expected 1 to {max}"
        )));
    }
    Ok(())
}
