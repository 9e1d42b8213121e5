use std::io::{Read, Write};

use byteorder::WriteBytesExt;

use super::{Alphabet, GENOMICS_TAG};
use crate::error::Result;
use crate::util::expect_tag;

const ONE: u8 = 0b0000_0001;
const MASK: u8 = 0b0001_1111;

/// Upper case letters, line breaks and the `-`, `*` and `_` markers found in sequence files.
///
/// The mapping is pure bit twiddling: `\n` is code 0, `A` to `Z` are 1 to 26 and `-`, `*` and
/// `_` are 29, 30 and 31. Every other byte maps to code 0.
///
/// # Examples
///
/// ```
/// use bbwt::alphabet::{Alphabet, GenomicsAlphabet};
///
/// assert_eq!(0, GenomicsAlphabet.convert(b'\n'));
/// assert_eq!(3, GenomicsAlphabet.convert(b'C'));
/// assert_eq!(b'*', GenomicsAlphabet.revert(30));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenomicsAlphabet;

impl Alphabet for GenomicsAlphabet {
    fn width(&self) -> u32 {
        5
    }

    fn size(&self) -> usize {
        32
    }

    #[inline]
    fn convert(&self, symbol: u8) -> u8 {
        let mut c = symbol;
        // punctuation lives in 0x20..0x40, lift it next to the letters
        let v = (!c >> 6) & (c >> 5) & ONE;
        c |= (v << 4) | (v << 2);
        let keep = ((c >> 6) | (c >> 5)) & ONE & self.contains(symbol) as u8;
        c & 0u8.wrapping_sub(keep) & MASK
    }

    #[inline]
    fn revert(&self, code: u8) -> u8 {
        let mut c = code;
        let is_zero = (c == 0) as u8;
        let marker = (c.count_ones() == 4) as u8 & ((c & ONE) ^ ((c >> 1) & ONE));
        let is_cap = marker ^ ONE;
        let is_star = (c >> 1) & marker;
        c |= is_cap << 6;
        c |= marker << 5;
        c ^= marker << 4;
        c ^= is_star << 2;
        (c & 0u8.wrapping_sub(is_zero ^ ONE)) | (b'\n' & 0u8.wrapping_sub(is_zero))
    }

    fn contains(&self, symbol: u8) -> bool {
        matches!(symbol, b'\n' | b'A'..=b'Z' | b'-' | b'*' | b'_')
    }

    fn write_statics<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(GENOMICS_TAG)?;
        Ok(())
    }

    fn load_statics<R: Read>(reader: &mut R) -> Result<Self> {
        expect_tag(reader, GENOMICS_TAG, "genomics alphabet")?;
        Ok(Self)
    }
}

#[cfg(test)]
mod test {
    use test_case::test_case;

    use super::GenomicsAlphabet;
    use crate::alphabet::Alphabet;

    #[test_case(b'\n', 0)]
    #[test_case(b'A', 1)]
    #[test_case(b'N', 14)]
    #[test_case(b'Z', 26)]
    #[test_case(b'-', 29)]
    #[test_case(b'*', 30)]
    #[test_case(b'_', 31)]
    fn mapping_test(symbol: u8, code: u8) {
        assert_eq!(code, GenomicsAlphabet.convert(symbol));
        assert_eq!(symbol, GenomicsAlphabet.revert(code));
    }

    #[test]
    fn all_symbols_round_trip() {
        let mut seen = [false; 32];
        for symbol in (0..=u8::MAX).filter(|&s| GenomicsAlphabet.contains(s)) {
            let code = GenomicsAlphabet.convert(symbol);
            assert!(!seen[code as usize], "code {code} assigned twice");
            seen[code as usize] = true;
            assert_eq!(symbol, GenomicsAlphabet.revert(code));
        }
        assert_eq!(30, seen.iter().filter(|&&s| s).count());
    }

    #[test_case(b'a'; "lower case")]
    #[test_case(b'0'; "digit")]
    #[test_case(b'@'; "at sign")]
    #[test_case(b' '; "space")]
    #[test_case(0xc1; "high byte")]
    fn unknown_symbols_map_to_zero(symbol: u8) {
        assert!(!GenomicsAlphabet.contains(symbol));
        assert_eq!(0, GenomicsAlphabet.convert(symbol));
    }
}
