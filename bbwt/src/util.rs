use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use itertools::Itertools;

use crate::error::{Error, Result};

/// Number of bits needed to represent `value`, at least 1.
#[inline]
pub(crate) const fn bit_width(value: u64) -> u32 {
    if value == 0 {
        1
    } else {
        u64::BITS - value.leading_zeros()
    }
}

/// Splits a byte string into its maximal runs.
///
/// # Arguments
///
/// * `text` - The text to split, usually a BWT.
///
/// # Examples
///
/// ```
/// use bbwt::runs_of;
///
/// let runs: Vec<_> = runs_of(b"AAACCA").collect();
/// assert_eq!(vec![(b'A', 3), (b'C', 2), (b'A', 1)], runs);
/// ```
pub fn runs_of(text: &[u8]) -> impl Iterator<Item = (u8, u64)> + '_ {
    text.iter()
        .dedup_with_count()
        .map(|(len, &symbol)| (symbol, len as u64))
}

pub(crate) fn write_u64s<W: Write>(writer: &mut W, values: &[u64]) -> Result<()> {
    for &v in values {
        writer.write_u64::<LE>(v)?;
    }
    Ok(())
}

pub(crate) fn read_u64s<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u64>> {
    let mut values = vec![0; len];
    reader.read_u64_into::<LE>(&mut values)?;
    Ok(values)
}

/// Reads a length prefixed byte blob.
pub(crate) fn read_blob<R: Read>(reader: &mut R) -> Result<Box<[u8]>> {
    let len = reader.read_u64::<LE>()?;
    let len = usize::try_from(len).map_err(|_| Error::format("blob length overflows usize"))?;
    let mut blob = vec![0; len];
    reader.read_exact(&mut blob)?;
    Ok(blob.into_boxed_slice())
}

pub(crate) fn write_blob<W: Write>(writer: &mut W, blob: &[u8]) -> Result<()> {
    writer.write_u64::<LE>(blob.len() as u64)?;
    writer.write_all(blob)?;
    Ok(())
}

/// Reads one tag byte and fails if it differs from `expected`.
pub(crate) fn expect_tag<R: Read>(reader: &mut R, expected: u8, what: &str) -> Result<()> {
    let tag = reader.read_u8()?;
    if tag != expected {
        return Err(Error::format(format!(
            "expected {what} tag {expected}, found {tag}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use test_case::test_case;

    use super::{bit_width, read_blob, runs_of, write_blob};

    #[test_case(0, 1)]
    #[test_case(1, 1)]
    #[test_case(2, 2)]
    #[test_case(255, 8)]
    #[test_case(256, 9)]
    #[test_case(u64::MAX, 64)]
    fn bit_width_test(value: u64, bits: u32) {
        assert_eq!(bits, bit_width(value));
    }

    #[test]
    fn runs_of_test() {
        assert_eq!(0, runs_of(b"").count());
        let runs: Vec<_> = runs_of(b"abbcccca").collect();
        assert_eq!(vec![(b'a', 1), (b'b', 2), (b'c', 4), (b'a', 1)], runs);
    }

    #[test]
    fn blob_test() {
        let mut out = Vec::new();
        write_blob(&mut out, b"hello").unwrap();
        write_blob(&mut out, b"").unwrap();
        let mut reader = &out[..];
        assert_eq!(b"hello", &*read_blob(&mut reader).unwrap());
        assert!(read_blob(&mut reader).unwrap().is_empty());
        assert!(read_blob(&mut reader).is_err());
    }
}
