use std::io::{Read, Write};

use byteorder::{ByteOrder, ReadBytesExt, WriteBytesExt, LE};

use super::{CounterLayout, CounterScope};
use crate::error::{Error, Result};

const FIXED_TAG: u8 = 0;

/// One little endian word per code, 4 bytes in block scope and 8 bytes in global scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedCounter {
    codes: usize,
    scope: CounterScope,
}

impl FixedCounter {
    #[inline]
    fn slot(&self) -> usize {
        self.scope.word_bytes()
    }
}

impl CounterLayout for FixedCounter {
    fn for_scope(maxima: &[u64], scope: CounterScope) -> Result<Self> {
        let limit = u64::MAX >> (64 - 8 * scope.word_bytes());
        if let Some(max) = maxima.iter().find(|&&m| m > limit) {
            return Err(Error::config(format!(
                "count {max} does not fit a {scope:?} scope counter"
            )));
        }
        Ok(Self {
            codes: maxima.len(),
            scope,
        })
    }

    fn codes(&self) -> usize {
        self.codes
    }

    fn size(&self) -> usize {
        self.codes * self.slot()
    }

    #[inline]
    fn get(&self, bytes: &[u8], code: u8) -> u64 {
        let slot = self.slot();
        let offset = code as usize * slot;
        LE::read_uint(&bytes[offset..offset + slot], slot)
    }

    #[inline]
    fn set(&self, bytes: &mut [u8], code: u8, value: u64) {
        let slot = self.slot();
        let offset = code as usize * slot;
        LE::write_uint(&mut bytes[offset..offset + slot], value, slot);
    }

    fn write_statics<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(FIXED_TAG)?;
        self.scope.write(writer)?;
        writer.write_u16::<LE>(self.codes as u16)?;
        Ok(())
    }

    fn load_statics<R: Read>(reader: &mut R) -> Result<Self> {
        crate::util::expect_tag(reader, FIXED_TAG, "fixed counter")?;
        let scope = CounterScope::read(reader)?;
        let codes = reader.read_u16::<LE>()? as usize;
        if codes > 256 {
            return Err(Error::format(format!("counter over {codes} codes")));
        }
        Ok(Self { codes, scope })
    }
}
