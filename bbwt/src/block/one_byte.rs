use super::{check_width, BlockCodec};
use crate::error::Result;

/// One byte per run: the code in the high `width` bits and `length - 1` in the rest.
///
/// Runs longer than the low bits can express are stored as several full bytes. With the `simd`
/// feature on an AVX2 machine `at` and `rank` skip over 32 runs at a time.
///
/// # Examples
///
/// ```
/// use bbwt::block::{BlockCodec, OneByteBlock};
///
/// let codec = OneByteBlock::for_width(3).unwrap();
/// let mut scratch = Vec::new();
/// codec.append(1, 3, &mut scratch);
/// codec.append(2, 40, &mut scratch);
///
/// let mut block = Vec::new();
/// // 40 needs two bytes of 32 and 8
/// assert_eq!(3, codec.commit(&scratch, &mut block));
/// assert_eq!(2, codec.at(&block, 3));
/// assert_eq!(35, codec.rank(&block, 2, 38));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OneByteBlock {
    width: u32,
    shift: u32,
    mask: u8,
}

impl OneByteBlock {
    #[inline]
    fn limit(&self) -> u32 {
        self.mask as u32 + 1
    }

    #[inline]
    fn at_from(&self, block: &[u8], mut pos: usize, mut location: u32) -> u8 {
        loop {
            let (current, length) = self.decode_run(block, &mut pos);
            if location < length {
                return current;
            }
            location -= length;
        }
    }

    #[inline]
    fn rank_from(
        &self,
        block: &[u8],
        mut pos: usize,
        code: u8,
        mut location: u32,
        mut res: u32,
    ) -> u32 {
        loop {
            let (current, length) = self.decode_run(block, &mut pos);
            if location <= length {
                return res + if current == code { location } else { 0 };
            }
            location -= length;
            res += if current == code { length } else { 0 };
        }
    }

    /// Bytes, symbols and matches that can be skipped before the scalar scan.
    #[inline]
    #[allow(unused_variables)]
    fn rank_prefix(&self, block: &[u8], code: u8, location: u32) -> (usize, u32, u32) {
        #[cfg(all(feature = "simd", target_arch = "x86_64", target_feature = "avx2"))]
        {
            super::simd::rank_prefix(block, self.width, code, location)
        }
        #[cfg(not(all(feature = "simd", target_arch = "x86_64", target_feature = "avx2")))]
        {
            (0, 0, 0)
        }
    }

    #[inline]
    #[allow(unused_variables)]
    fn at_prefix(&self, block: &[u8], location: u32) -> (usize, u32) {
        #[cfg(all(feature = "simd", target_arch = "x86_64", target_feature = "avx2"))]
        {
            super::simd::at_prefix(block, self.width, location)
        }
        #[cfg(not(all(feature = "simd", target_arch = "x86_64", target_feature = "avx2")))]
        {
            (0, 0)
        }
    }

    /// `rank` without any vectorized prefix.
    #[cfg(test)]
    pub(super) fn scalar_rank(&self, block: &[u8], code: u8, location: u32) -> u32 {
        self.rank_from(block, 0, code, location, 0)
    }

    /// `at` without any vectorized prefix.
    #[cfg(test)]
    pub(super) fn scalar_at(&self, block: &[u8], location: u32) -> u8 {
        self.at_from(block, 0, location)
    }
}

impl BlockCodec for OneByteBlock {
    type Scratch = Vec<u8>;

    fn for_width(width: u32) -> Result<Self> {
        check_width(width, 8)?;
        let shift = 8 - width;
        Ok(Self {
            width,
            shift,
            mask: ((1u32 << shift) - 1) as u8,
        })
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn append(&self, code: u8, mut length: u32, scratch: &mut Vec<u8>) -> usize {
        debug_assert!(length > 0);
        let head = code << self.shift;
        while length > self.limit() {
            scratch.push(head | self.mask);
            length -= self.limit();
        }
        scratch.push(head | (length - 1) as u8);
        scratch.len()
    }

    fn encoded_len(&self, scratch: &Vec<u8>) -> usize {
        scratch.len()
    }

    fn commit(&self, scratch: &Vec<u8>, out: &mut Vec<u8>) -> usize {
        out.extend_from_slice(scratch);
        scratch.len()
    }

    fn reset(&self, scratch: &mut Vec<u8>) {
        scratch.clear();
    }

    #[inline]
    fn decode_run(&self, block: &[u8], pos: &mut usize) -> (u8, u32) {
        let byte = block[*pos];
        *pos += 1;
        (byte >> self.shift, (byte & self.mask) as u32 + 1)
    }

    #[inline]
    fn at(&self, block: &[u8], location: u32) -> u8 {
        let (pos, skipped) = self.at_prefix(block, location);
        self.at_from(block, pos, location - skipped)
    }

    #[inline]
    fn rank(&self, block: &[u8], code: u8, location: u32) -> u32 {
        let (pos, skipped, res) = self.rank_prefix(block, code, location);
        self.rank_from(block, pos, code, location - skipped, res)
    }
}

#[cfg(test)]
mod test {
    use test_case::test_case;

    use super::OneByteBlock;
    use crate::block::{test::encode, BlockCodec};

    #[test_case(1, 0b0111_1111; "width 1")]
    #[test_case(3, 0b0001_1111; "width 3")]
    #[test_case(7, 0b0000_0001; "width 7")]
    #[test_case(8, 0; "width 8")]
    fn layout(width: u32, mask: u8) {
        let codec = OneByteBlock::for_width(width).unwrap();
        assert_eq!(mask, codec.mask);
        let block = encode(&codec, &[(1, 1)]);
        assert_eq!(vec![1 << (8 - width)], block);
    }

    #[test]
    fn splits_long_runs() {
        let codec = OneByteBlock::for_width(4).unwrap();
        let block = encode(&codec, &[(0b1010, 40)]);
        assert_eq!(vec![0b1010_1111, 0b1010_1111, 0b1010_0111], block);
        assert_eq!(
            vec![(0b1010, 16), (0b1010, 16), (0b1010, 8)],
            codec.runs(&block, 40).collect::<Vec<_>>()
        );
    }

    #[test]
    fn prefix_free_scan() {
        let codec = OneByteBlock::for_width(2).unwrap();
        let runs: Vec<_> = (0..100).map(|i| ((i % 3) as u8, i % 70 + 1)).collect();
        let block = encode(&codec, &runs);
        let len = runs.iter().map(|r| r.1).sum::<u32>();
        for i in (0..len).step_by(17) {
            assert_eq!(codec.scalar_at(&block, i), codec.at(&block, i));
            assert_eq!(codec.scalar_rank(&block, 2, i), codec.rank(&block, 2, i));
        }
    }
}
