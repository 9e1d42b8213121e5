use super::{check_width, BlockCodec};
use crate::error::Result;

/// Like [`OneByteBlock`](super::OneByteBlock) but with little endian 16 bit words, leaving
/// `16 - width` bits for the run length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TwoByteBlock {
    width: u32,
    shift: u32,
    mask: u16,
}

impl BlockCodec for TwoByteBlock {
    type Scratch = Vec<u8>;

    fn for_width(width: u32) -> Result<Self> {
        check_width(width, 8)?;
        let shift = 16 - width;
        Ok(Self {
            width,
            shift,
            mask: ((1u32 << shift) - 1) as u16,
        })
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn append(&self, code: u8, mut length: u32, scratch: &mut Vec<u8>) -> usize {
        debug_assert!(length > 0);
        let head = (code as u16) << self.shift;
        let limit = self.mask as u32 + 1;
        while length > limit {
            scratch.extend_from_slice(&(head | self.mask).to_le_bytes());
            length -= limit;
        }
        scratch.extend_from_slice(&(head | (length - 1) as u16).to_le_bytes());
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
        let word = u16::from_le_bytes([block[*pos], block[*pos + 1]]);
        *pos += 2;
        ((word >> self.shift) as u8, (word & self.mask) as u32 + 1)
    }
}

#[cfg(test)]
mod test {
    use super::TwoByteBlock;
    use crate::block::{test::encode, BlockCodec};

    #[test]
    fn word_layout() {
        let codec = TwoByteBlock::for_width(3).unwrap();
        let block = encode(&codec, &[(0b101, 0x1234), (1, 1 << 13), (2, (1 << 13) + 1)]);
        assert_eq!(
            vec![0x33, 0xb2, 0xff, 0x3f, 0xff, 0x5f, 0x00, 0x40],
            block
        );
        assert_eq!(2, codec.at(&block, 0x1234 + (1 << 14)));
    }
}
