//! Run-length encoded BWT indexes and their builders.
//!
//! An index lives in two files. The root file holds the alphabet, codec and counter layouts and
//! the top-level lookup structure, the data file holds the encoded blocks. Both are written by a
//! builder in a single pass over the runs of the BWT.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{ReadBytesExt, WriteBytesExt};

mod block_rlbwt;
mod builder;
mod run_rlbwt;

pub use block_rlbwt::BlockRlbwt;
pub use builder::{BlockRlbwtBuilder, BuildSummary, RunRlbwtBuilder};
pub use run_rlbwt::RunRlbwt;

use crate::alphabet::{AcgtAlphabet, GenomicsAlphabet};
use crate::block::{DynamicBlock, OneByteBlock, TwoByteBlock, VbyteBlock};
use crate::error::{Error, Result};
use crate::util::{read_u64s, write_u64s};

/// Nucleotide BWTs with one byte runs.
pub type AcgtRlbwt = BlockRlbwt<AcgtAlphabet, OneByteBlock>;

/// Protein and other upper case BWTs, picking the smaller of one and two byte runs per block.
pub type GenomicsRlbwt = BlockRlbwt<GenomicsAlphabet, DynamicBlock<TwoByteBlock, OneByteBlock>>;

/// Block indexed RLBWT that picks the smaller of variable byte and one byte runs per block.
pub type DynRlbwt<A> = BlockRlbwt<A, DynamicBlock<VbyteBlock, OneByteBlock>>;

/// Run indexed RLBWT with variable byte runs.
pub type VbyteRunRlbwt<A> = RunRlbwt<A, VbyteBlock>;

const MAGIC: &[u8; 4] = b"BBWT";
const VERSION: u8 = 1;

/// Which index a root file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum Variant {
    Block = 0,
    Run = 1,
}

/// The ranks of one symbol at both ends of an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntervalSymbol {
    pub symbol: u8,
    /// Occurrences of `symbol` before the interval.
    pub start_rank: u64,
    /// Occurrences of `symbol` before the end of the interval.
    pub end_rank: u64,
}

/// The data file belonging to the root file at `path`, `dir/name_data.ext` for `dir/name.ext`.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use bbwt::rlbwt::data_path;
///
/// assert_eq!(Path::new("idx/chr1_data.bbwt"), data_path("idx/chr1.bbwt"));
/// assert_eq!(Path::new("chr1_data"), data_path("chr1"));
/// ```
pub fn data_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let mut name = path.file_stem().unwrap_or_default().to_os_string();
    name.push("_data");
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    path.with_file_name(name)
}

fn write_header<W: Write>(writer: &mut W, variant: Variant) -> Result<()> {
    writer.write_all(MAGIC)?;
    writer.write_u8(VERSION)?;
    writer.write_u8(variant as u8)?;
    Ok(())
}

fn read_header<R: Read>(reader: &mut R, variant: Variant) -> Result<()> {
    let mut magic = [0; 4];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(Error::format("not a bbwt root file"));
    }
    let version = reader.read_u8()?;
    if version != VERSION {
        return Err(Error::format(format!(
            "format version {version} is not supported, expected {VERSION}"
        )));
    }
    let tag = reader.read_u8()?;
    if tag != variant as u8 {
        return Err(Error::format(format!(
            "root file holds index variant {tag}, expected {}",
            variant as u8
        )));
    }
    Ok(())
}

/// Exclusive prefix sums over the per byte totals.
fn char_counts(totals: &[u64; 256]) -> Box<[u64; 257]> {
    let mut counts = Box::new([0; 257]);
    for (c, &total) in totals.iter().enumerate() {
        counts[c + 1] = counts[c] + total;
    }
    counts
}

fn write_char_counts<W: Write>(writer: &mut W, counts: &[u64; 257]) -> Result<()> {
    write_u64s(writer, counts)
}

fn read_char_counts<R: Read>(reader: &mut R, size: u64) -> Result<Box<[u64; 257]>> {
    let values = read_u64s(reader, 257)?;
    if values[0] != 0 || values[256] != size || values.windows(2).any(|w| w[0] > w[1]) {
        return Err(Error::format("symbol counts do not add up to the index size"));
    }
    let mut counts = Box::new([0; 257]);
    counts.copy_from_slice(&values);
    Ok(counts)
}

#[cfg(test)]
pub(crate) mod test {
    use std::collections::HashSet;

    use super::{
        char_counts, data_path, read_char_counts, read_header, write_char_counts, write_header,
        Variant,
    };
    use crate::traits::{BackwardSearch, SymbolAccess, SymbolRank, SymbolSelect};

    /// The BWT of `text` followed by a 0 sentinel, by sorting all rotations.
    pub(crate) fn naive_bwt(text: &[u8]) -> Vec<u8> {
        let mut t = text.to_vec();
        t.push(0);
        let n = t.len();
        let mut rotations: Vec<usize> = (0..n).collect();
        rotations.sort_by(|&a, &b| t[a..].iter().chain(&t[..a]).cmp(t[b..].iter().chain(&t[..b])));
        rotations.into_iter().map(|r| t[(r + n - 1) % n]).collect()
    }

    pub(crate) fn naive_count(text: &[u8], pattern: &[u8]) -> u64 {
        if pattern.is_empty() {
            return text.len() as u64 + 1;
        }
        text.windows(pattern.len()).filter(|w| *w == pattern).count() as u64
    }

    /// Compares every query of `index` against the plain string `bwt`.
    pub(crate) fn check_queries<I>(index: &I, bwt: &[u8])
    where
        I: SymbolAccess + SymbolRank + SymbolSelect,
    {
        assert_eq!(bwt.len() as u64, index.len());
        let mut ranks = [0u64; 256];
        for (i, &c) in bwt.iter().enumerate() {
            let i = i as u64;
            assert_eq!(c, index.at(i), "at({i})");
            assert_eq!((c, ranks[c as usize]), index.access_rank(i), "access_rank({i})");
            assert_eq!(ranks[c as usize], index.rank(i, c), "rank({i}, {c})");
            ranks[c as usize] += 1;
            let k = ranks[c as usize];
            assert_eq!(Some(i), index.select(k, c), "select({k}, {c})");
        }
        for c in 0..=u8::MAX {
            let total = ranks[c as usize];
            assert_eq!(total, index.rank(index.len(), c));
            assert_eq!(total, index.rank(index.len() + 10, c));
            assert_eq!(None, index.select(total + 1, c));
            assert_eq!(None, index.select(0, c));
        }
        assert_eq!(0, index.at(index.len()));
    }

    /// Walks the LF mapping from row 0 and checks it spells `text` backwards and visits every row.
    pub(crate) fn check_lf_cycle<I: BackwardSearch>(index: &I, text: &[u8]) {
        let mut seen = HashSet::new();
        let mut spelled = Vec::new();
        let mut i = 0;
        for _ in 0..index.len() {
            assert!(seen.insert(i), "row {i} visited twice");
            spelled.push(index.at(i));
            i = index.lf(i);
        }
        assert_eq!(0, i);
        assert_eq!(Some(&0), spelled.last());
        spelled.pop();
        spelled.reverse();
        assert_eq!(text, &spelled[..]);
    }

    #[test]
    fn naive_bwt_test() {
        assert_eq!(b"annb\0aa".to_vec(), naive_bwt(b"banana"));
    }

    #[test]
    fn data_path_test() {
        assert_eq!(std::path::Path::new("/tmp/x_data.idx"), data_path("/tmp/x.idx"));
        assert_eq!(std::path::Path::new("a.b_data.c"), data_path("a.b.c"));
    }

    #[test]
    fn header_test() {
        let mut out = Vec::new();
        write_header(&mut out, Variant::Run).unwrap();
        assert!(read_header(&mut &out[..], Variant::Run).is_ok());
        assert!(read_header(&mut &out[..], Variant::Block).is_err());

        out[4] = 99;
        assert!(read_header(&mut &out[..], Variant::Run).is_err());
        assert!(read_header(&mut &b"BWT!\x01\x01"[..], Variant::Run).is_err());
    }

    #[test]
    fn char_counts_test() {
        let mut totals = [0; 256];
        totals[b'A' as usize] = 4;
        totals[b'C' as usize] = 2;
        let counts = char_counts(&totals);
        assert_eq!(0, counts[b'A' as usize]);
        assert_eq!(4, counts[b'A' as usize + 1]);
        assert_eq!(4, counts[b'C' as usize]);
        assert_eq!(6, counts[256]);

        let mut out = Vec::new();
        write_char_counts(&mut out, &counts).unwrap();
        assert_eq!(counts, read_char_counts(&mut &out[..], 6).unwrap());
        assert!(read_char_counts(&mut &out[..], 7).is_err());
    }
}
