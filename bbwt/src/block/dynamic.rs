use super::BlockCodec;
use crate::error::Result;

const FIRST: u8 = 0;
const SECOND: u8 = 1;

/// Encodes every block with both `A` and `B` and keeps the smaller one.
///
/// The committed block starts with one byte telling which codec won. Ties go to `A`.
///
/// # Examples
///
/// ```
/// use bbwt::block::{BlockCodec, DynamicBlock, OneByteBlock, TwoByteBlock};
///
/// let codec = DynamicBlock::<TwoByteBlock, OneByteBlock>::for_width(2).unwrap();
/// let mut scratch = Default::default();
/// codec.append(1, 5000, &mut scratch);
///
/// let mut block = Vec::new();
/// // one two byte word beats 79 single bytes
/// assert_eq!(3, codec.commit(&scratch, &mut block));
/// assert_eq!(1, codec.at(&block, 4999));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicBlock<A, B> {
    first: A,
    second: B,
}

/// Scratch space of a [`DynamicBlock`], one arena per candidate codec.
#[derive(Debug, Default)]
pub struct DynamicScratch<SA, SB> {
    first: SA,
    second: SB,
}

impl<A: BlockCodec, B: BlockCodec> DynamicBlock<A, B> {
    /// Whether `block` was encoded by `B`.
    #[inline]
    pub fn uses_second(block: &[u8]) -> bool {
        block[0] == SECOND
    }

    fn pick(&self, scratch: &DynamicScratch<A::Scratch, B::Scratch>) -> (u8, usize) {
        let a = self.first.encoded_len(&scratch.first);
        let b = self.second.encoded_len(&scratch.second);
        if b < a {
            (SECOND, b)
        } else {
            (FIRST, a)
        }
    }
}

impl<A: BlockCodec, B: BlockCodec> BlockCodec for DynamicBlock<A, B> {
    type Scratch = DynamicScratch<A::Scratch, B::Scratch>;

    fn for_width(width: u32) -> Result<Self> {
        Ok(Self {
            first: A::for_width(width)?,
            second: B::for_width(width)?,
        })
    }

    fn width(&self) -> u32 {
        self.first.width()
    }

    fn append(&self, code: u8, length: u32, scratch: &mut Self::Scratch) -> usize {
        let a = self.first.append(code, length, &mut scratch.first);
        let b = self.second.append(code, length, &mut scratch.second);
        1 + a.min(b)
    }

    fn encoded_len(&self, scratch: &Self::Scratch) -> usize {
        1 + self.pick(scratch).1
    }

    fn commit(&self, scratch: &Self::Scratch, out: &mut Vec<u8>) -> usize {
        let (tag, _) = self.pick(scratch);
        out.push(tag);
        1 + if tag == SECOND {
            self.second.commit(&scratch.second, out)
        } else {
            self.first.commit(&scratch.first, out)
        }
    }

    fn reset(&self, scratch: &mut Self::Scratch) {
        self.first.reset(&mut scratch.first);
        self.second.reset(&mut scratch.second);
    }

    #[inline]
    fn first_run(&self, block: &[u8]) -> usize {
        1 + if Self::uses_second(block) {
            self.second.first_run(&block[1..])
        } else {
            self.first.first_run(&block[1..])
        }
    }

    #[inline]
    fn decode_run(&self, block: &[u8], pos: &mut usize) -> (u8, u32) {
        let mut inner = *pos - 1;
        let run = if Self::uses_second(block) {
            self.second.decode_run(&block[1..], &mut inner)
        } else {
            self.first.decode_run(&block[1..], &mut inner)
        };
        *pos = inner + 1;
        run
    }

    #[inline]
    fn at(&self, block: &[u8], location: u32) -> u8 {
        if Self::uses_second(block) {
            self.second.at(&block[1..], location)
        } else {
            self.first.at(&block[1..], location)
        }
    }

    #[inline]
    fn rank(&self, block: &[u8], code: u8, location: u32) -> u32 {
        if Self::uses_second(block) {
            self.second.rank(&block[1..], code, location)
        } else {
            self.first.rank(&block[1..], code, location)
        }
    }

    fn access_rank(&self, block: &[u8], location: u32) -> (u8, u32) {
        if Self::uses_second(block) {
            self.second.access_rank(&block[1..], location)
        } else {
            self.first.access_rank(&block[1..], location)
        }
    }

    fn select(&self, block: &[u8], code: u8, k: u32) -> u32 {
        if Self::uses_second(block) {
            self.second.select(&block[1..], code, k)
        } else {
            self.first.select(&block[1..], code, k)
        }
    }
}

#[cfg(test)]
mod test {
    use super::DynamicBlock;
    use crate::block::{test::encode, BlockCodec, OneByteBlock, TwoByteBlock, VbyteBlock};

    type Dyn = DynamicBlock<TwoByteBlock, OneByteBlock>;

    #[test]
    fn picks_smaller_encoding() {
        let codec = Dyn::for_width(4).unwrap();
        let short = encode(&codec, &[(1, 1), (2, 3), (1, 2)]);
        assert!(Dyn::uses_second(&short));
        assert_eq!(4, short.len());

        let long = encode(&codec, &[(1, 400), (2, 3)]);
        assert!(!Dyn::uses_second(&long));
        assert_eq!(5, long.len());
    }

    #[test]
    fn ties_go_to_first() {
        let codec = DynamicBlock::<VbyteBlock, OneByteBlock>::for_width(4).unwrap();
        let block = encode(&codec, &[(3, 2), (5, 8)]);
        assert!(!DynamicBlock::<VbyteBlock, OneByteBlock>::uses_second(&block));
    }

    #[test]
    fn nested() {
        type Nested = DynamicBlock<DynamicBlock<TwoByteBlock, VbyteBlock>, OneByteBlock>;
        let codec = Nested::for_width(2).unwrap();
        let runs = [(1, 1000), (0, 1), (3, 90)];
        let block = encode(&codec, &runs);
        assert_eq!(runs.to_vec(), codec.runs(&block, 1091).collect::<Vec<_>>());
        assert_eq!(3, codec.at(&block, 1001));
        assert_eq!(1000, codec.select(&block, 0, 1));
    }
}
