use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use itertools::Itertools;

use super::{Alphabet, CorpusStats, CUSTOM_TAG};
use crate::error::{Error, Result};
use crate::util::{bit_width, expect_tag};

/// A table driven alphabet over exactly the symbols of a corpus.
///
/// Codes are handed out in order of ascending frequency, ties broken by byte value.
///
/// # Examples
///
/// ```
/// use bbwt::{alphabet::{Alphabet, CorpusStats, CustomAlphabet}, runs_of};
///
/// let stats = CorpusStats::from_runs(runs_of(b"banana"), 1 << 32).unwrap();
/// let alphabet = CustomAlphabet::from_stats(&stats).unwrap();
///
/// assert_eq!(3, alphabet.size());
/// assert_eq!(2, alphabet.width());
/// assert_eq!(0, alphabet.convert(b'b'));
/// assert_eq!(2, alphabet.convert(b'a'));
/// assert!(!alphabet.contains(b'x'));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct CustomAlphabet {
    width: u32,
    size: usize,
    c_map: Box<[u8; 256]>,
    r_map: Box<[u8; 256]>,
}

impl std::fmt::Debug for CustomAlphabet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomAlphabet")
            .field("width", &self.width)
            .field("symbols", &&self.r_map[..self.size])
            .finish()
    }
}

impl CustomAlphabet {
    /// Builds the alphabet of all symbols that occur in `stats`.
    pub fn from_stats(stats: &CorpusStats) -> Result<Self> {
        let symbols = stats
            .symbols()
            .sorted_by_key(|&s| (stats.total(s), s))
            .collect_vec();
        Self::from_symbols(&symbols)
    }

    /// Builds an alphabet assigning code `i` to `symbols[i]`.
    pub fn from_symbols(symbols: &[u8]) -> Result<Self> {
        if symbols.is_empty() {
            return Err(Error::config("alphabet without symbols"));
        }
        let mut c_map = Box::new([0; 256]);
        let mut r_map = Box::new([0; 256]);
        let mut seen = [false; 256];
        for (code, &symbol) in symbols.iter().enumerate() {
            if std::mem::replace(&mut seen[symbol as usize], true) {
                return Err(Error::config(format!(
                    "symbol {symbol:#04x} appears twice in the alphabet"
                )));
            }
            c_map[symbol as usize] = code as u8;
            r_map[code] = symbol;
        }
        Ok(Self {
            width: bit_width(symbols.len() as u64 - 1),
            size: symbols.len(),
            c_map,
            r_map,
        })
    }
}

impl Alphabet for CustomAlphabet {
    fn width(&self) -> u32 {
        self.width
    }

    fn size(&self) -> usize {
        self.size
    }

    #[inline]
    fn convert(&self, symbol: u8) -> u8 {
        self.c_map[symbol as usize]
    }

    #[inline]
    fn revert(&self, code: u8) -> u8 {
        self.r_map[code as usize]
    }

    fn contains(&self, symbol: u8) -> bool {
        let code = self.c_map[symbol as usize];
        (code as usize) < self.size && self.r_map[code as usize] == symbol
    }

    fn write_statics<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(CUSTOM_TAG)?;
        writer.write_u16::<LE>(self.size as u16)?;
        writer.write_all(&self.r_map[..self.size])?;
        Ok(())
    }

    fn load_statics<R: Read>(reader: &mut R) -> Result<Self> {
        expect_tag(reader, CUSTOM_TAG, "custom alphabet")?;
        let size = reader.read_u16::<LE>()? as usize;
        if size == 0 || size > 256 {
            return Err(Error::format(format!("custom alphabet of size {size}")));
        }
        let mut symbols = vec![0; size];
        reader.read_exact(&mut symbols)?;
        Self::from_symbols(&symbols).map_err(|e| Error::format(e.to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::CustomAlphabet;
    use crate::alphabet::{Alphabet, CorpusStats};
    use crate::runs_of;

    #[test]
    fn frequency_order() {
        let stats = CorpusStats::from_runs(runs_of(b"TTTTAACCCGGGGGNN"), 1 << 32).unwrap();
        let alphabet = CustomAlphabet::from_stats(&stats).unwrap();
        // A and N tie at two
        let order: Vec<_> = (0..alphabet.size() as u8).map(|c| alphabet.revert(c)).collect();
        assert_eq!(b"ANCTG".to_vec(), order);
        assert_eq!(3, alphabet.width());
    }

    #[test]
    fn single_symbol() {
        let alphabet = CustomAlphabet::from_symbols(b"x").unwrap();
        assert_eq!(1, alphabet.width());
        assert!(alphabet.contains(b'x'));
        assert!(!alphabet.contains(0));
    }

    #[test]
    fn full_byte_range() {
        let symbols: Vec<u8> = (0..=u8::MAX).rev().collect();
        let alphabet = CustomAlphabet::from_symbols(&symbols).unwrap();
        assert_eq!(8, alphabet.width());
        assert!((0..=u8::MAX).all(|s| alphabet.contains(s)));
        assert_eq!(0, alphabet.convert(255));
    }

    #[test]
    fn invalid_symbols() {
        assert!(CustomAlphabet::from_symbols(b"").is_err());
        assert!(CustomAlphabet::from_symbols(b"abca").is_err());
    }

    #[test]
    fn statics_round_trip() {
        let alphabet = CustomAlphabet::from_symbols(b"zyx\n").unwrap();
        let mut out = Vec::new();
        alphabet.write_statics(&mut out).unwrap();
        assert_eq!(alphabet, CustomAlphabet::load_statics(&mut &out[..]).unwrap());
    }
}
