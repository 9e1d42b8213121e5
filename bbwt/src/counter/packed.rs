use std::io::{Read, Write};

use byteorder::{ByteOrder, ReadBytesExt, WriteBytesExt, BE, LE};

use super::{CounterLayout, CounterScope};
use crate::error::{Error, Result};
use crate::util::{bit_width, expect_tag};

const PACKED_TAG: u8 = 1;

/// Where one code's bits live: a word wide big endian load at `start`, shifted and masked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Field {
    start: usize,
    shift: u32,
    mask: u64,
}

/// Bit packed counts, every code gets exactly as many bits as its maximum needs.
///
/// Fields are written back to back, most significant bit first. Each field is read with a single
/// unaligned big endian word load (32 bits in block scope, 64 in global scope). A field that would
/// straddle the word starting at its first byte is moved to the next byte boundary instead.
///
/// # Examples
///
/// ```
/// use bbwt::counter::{CounterLayout, CounterScope, PackedCounter};
///
/// // 2 + 10 + 7 bits
/// let layout = PackedCounter::for_scope(&[3, 1000, 70], CounterScope::Block).unwrap();
/// assert_eq!(4, layout.size());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedCounter {
    scope: CounterScope,
    bits: Vec<u8>,
    fields: Vec<Field>,
    size: usize,
}

impl PackedCounter {
    fn from_bits(bits: Vec<u8>, scope: CounterScope) -> Result<Self> {
        let word = scope.word_bytes();
        let word_bits = 8 * word as u64;
        let mut fields = Vec::with_capacity(bits.len());
        let mut used = 0u64;

        for (code, &b) in bits.iter().enumerate() {
            let b = b as u64;
            if b == 0 || b > word_bits {
                return Err(Error::config(format!(
                    "code {code} needs {b} bits but {scope:?} scope words have {word_bits}"
                )));
            }
            if used % 8 + b > word_bits {
                used = used.next_multiple_of(8);
            }
            let end = used + b;
            let end_byte = ((end - 1) / 8) as usize;
            let start = (end_byte + 1).saturating_sub(word);
            let shift = ((start + word) as u64 * 8 - end) as u32;
            fields.push(Field {
                start,
                shift,
                mask: u64::MAX >> (64 - b),
            });
            used = end;
        }

        let size = (used.div_ceil(8) as usize).max(word);
        Ok(Self {
            scope,
            bits,
            fields,
            size,
        })
    }

    #[inline]
    fn load(&self, bytes: &[u8], start: usize) -> u64 {
        let word = self.scope.word_bytes();
        BE::read_uint(&bytes[start..start + word], word)
    }

    #[inline]
    fn store(&self, bytes: &mut [u8], start: usize, value: u64) {
        let word = self.scope.word_bytes();
        BE::write_uint(&mut bytes[start..start + word], value, word);
    }
}

impl CounterLayout for PackedCounter {
    fn for_scope(maxima: &[u64], scope: CounterScope) -> Result<Self> {
        let bits = maxima.iter().map(|&m| bit_width(m) as u8).collect();
        Self::from_bits(bits, scope)
    }

    fn codes(&self) -> usize {
        self.fields.len()
    }

    fn size(&self) -> usize {
        self.size
    }

    #[inline]
    fn get(&self, bytes: &[u8], code: u8) -> u64 {
        let field = self.fields[code as usize];
        (self.load(bytes, field.start) >> field.shift) & field.mask
    }

    #[inline]
    fn set(&self, bytes: &mut [u8], code: u8, value: u64) {
        let field = self.fields[code as usize];
        debug_assert!(value <= field.mask, "{value} overflows the field of code {code}");
        let word = self.load(bytes, field.start) & !(field.mask << field.shift);
        self.store(bytes, field.start, word | ((value & field.mask) << field.shift));
    }

    fn write_statics<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(PACKED_TAG)?;
        self.scope.write(writer)?;
        writer.write_u16::<LE>(self.bits.len() as u16)?;
        writer.write_all(&self.bits)?;
        Ok(())
    }

    fn load_statics<R: Read>(reader: &mut R) -> Result<Self> {
        expect_tag(reader, PACKED_TAG, "packed counter")?;
        let scope = CounterScope::read(reader)?;
        let codes = reader.read_u16::<LE>()? as usize;
        if codes > 256 {
            return Err(Error::format(format!("counter over {codes} codes")));
        }
        let mut bits = vec![0; codes];
        reader.read_exact(&mut bits)?;
        Self::from_bits(bits, scope).map_err(|e| Error::format(e.to_string()))
    }
}
