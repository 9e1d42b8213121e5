//! Mappings from input bytes to the dense codes stored in blocks and counters.

use std::fmt::Debug;
use std::io::{Read, Write};

mod custom;
mod genomics;
mod stats;

pub use custom::CustomAlphabet;
pub use genomics::GenomicsAlphabet;
pub use stats::CorpusStats;

use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};
use crate::util::{bit_width, expect_tag};

const BYTE_TAG: u8 = 0;
const DELTA_TAG: u8 = 1;
const ACGT_TAG: u8 = 2;
const GENOMICS_TAG: u8 = 3;
const CUSTOM_TAG: u8 = 4;

/// A bijection between the symbols of an input and codes in `0..size()`.
///
/// Codes need [`Alphabet::width`] bits each, which decides how many bits of a run-length byte
/// are left for the length.
pub trait Alphabet: Clone + Debug + Send + Sync + Sized {
    /// Bits needed for one code, between 1 and 8.
    fn width(&self) -> u32;

    /// Number of distinct codes.
    fn size(&self) -> usize;

    /// Maps an input symbol to its code. Symbols outside the alphabet map to code 0.
    fn convert(&self, symbol: u8) -> u8;

    /// Maps a code back to its input symbol.
    fn revert(&self, code: u8) -> u8;

    /// Whether `symbol` is one of the symbols this alphabet represents.
    fn contains(&self, symbol: u8) -> bool;

    /// Writes whatever is needed to restore this alphabet with [`Alphabet::load_statics`].
    fn write_statics<W: Write>(&self, writer: &mut W) -> Result<()>;

    /// Restores an alphabet written by [`Alphabet::write_statics`].
    fn load_statics<R: Read>(reader: &mut R) -> Result<Self>;
}

/// The identity mapping over all 256 byte values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteAlphabet;

impl Alphabet for ByteAlphabet {
    fn width(&self) -> u32 {
        8
    }

    fn size(&self) -> usize {
        256
    }

    #[inline]
    fn convert(&self, symbol: u8) -> u8 {
        symbol
    }

    #[inline]
    fn revert(&self, code: u8) -> u8 {
        code
    }

    fn contains(&self, _symbol: u8) -> bool {
        true
    }

    fn write_statics<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(BYTE_TAG)?;
        Ok(())
    }

    fn load_statics<R: Read>(reader: &mut R) -> Result<Self> {
        expect_tag(reader, BYTE_TAG, "byte alphabet")?;
        Ok(Self)
    }
}

/// Maps the contiguous byte range `smallest..=largest` onto `0..=largest - smallest`.
///
/// # Examples
///
/// ```
/// use bbwt::alphabet::{Alphabet, DeltaAlphabet};
///
/// let lower = DeltaAlphabet::new(b'a', b'z').unwrap();
/// assert_eq!(5, lower.width());
/// assert_eq!(2, lower.convert(b'c'));
/// assert_eq!(b'c', lower.revert(2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaAlphabet {
    smallest: u8,
    largest: u8,
}

impl DeltaAlphabet {
    pub fn new(smallest: u8, largest: u8) -> Result<Self> {
        if largest < smallest {
            return Err(Error::config(format!(
                "empty symbol range {smallest:#04x}..={largest:#04x}"
            )));
        }
        Ok(Self { smallest, largest })
    }
}

impl Alphabet for DeltaAlphabet {
    fn width(&self) -> u32 {
        bit_width((self.largest - self.smallest) as u64)
    }

    fn size(&self) -> usize {
        (self.largest - self.smallest) as usize + 1
    }

    #[inline]
    fn convert(&self, symbol: u8) -> u8 {
        if self.contains(symbol) {
            symbol - self.smallest
        } else {
            0
        }
    }

    #[inline]
    fn revert(&self, code: u8) -> u8 {
        code.wrapping_add(self.smallest)
    }

    fn contains(&self, symbol: u8) -> bool {
        (self.smallest..=self.largest).contains(&symbol)
    }

    fn write_statics<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(DELTA_TAG)?;
        writer.write_u8(self.smallest)?;
        writer.write_u8(self.largest)?;
        Ok(())
    }

    fn load_statics<R: Read>(reader: &mut R) -> Result<Self> {
        expect_tag(reader, DELTA_TAG, "delta alphabet")?;
        let smallest = reader.read_u8()?;
        let largest = reader.read_u8()?;
        Self::new(smallest, largest).map_err(|_| Error::format("corrupt delta alphabet range"))
    }
}

/// Nucleotides. `A`, `C`, `G` and `T` get codes 1 to 4, `N` is code 0.
///
/// Any other byte also converts to 0 and thus reverts to `N`, but builders reject them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcgtAlphabet;

impl Alphabet for AcgtAlphabet {
    fn width(&self) -> u32 {
        3
    }

    fn size(&self) -> usize {
        5
    }

    #[inline]
    fn convert(&self, symbol: u8) -> u8 {
        match symbol {
            b'A' => 1,
            b'C' => 2,
            b'G' => 3,
            b'T' => 4,
            _ => 0,
        }
    }

    #[inline]
    fn revert(&self, code: u8) -> u8 {
        match code {
            1 => b'A',
            2 => b'C',
            3 => b'G',
            4 => b'T',
            _ => b'N',
        }
    }

    fn contains(&self, symbol: u8) -> bool {
        matches!(symbol, b'A' | b'C' | b'G' | b'T' | b'N')
    }

    fn write_statics<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(ACGT_TAG)?;
        Ok(())
    }

    fn load_statics<R: Read>(reader: &mut R) -> Result<Self> {
        expect_tag(reader, ACGT_TAG, "acgt alphabet")?;
        Ok(Self)
    }
}
