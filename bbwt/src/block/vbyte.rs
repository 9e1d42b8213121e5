use super::{check_width, BlockCodec};
use crate::error::Result;

const CONTINUE: u8 = 0b1000_0000;
const LOW_BITS: u8 = 0b0111_1111;

/// Variable byte runs.
///
/// The first byte holds the code in its high `width` bits. Below it sit a flag bit and the low
/// `7 - width` bits of `length - 1`. If the flag is set, the remaining bits of `length - 1` follow
/// as a little endian base 128 varint. Codes of 8 bits leave no room in the first byte, so their
/// length is always a full varint.
///
/// Short runs take a single byte and long runs never take more than six.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VbyteBlock {
    width: u32,
    shift: u32,
}

impl VbyteBlock {
    /// Bits of `length - 1` stored in the first byte.
    #[inline]
    fn inline_bits(&self) -> u32 {
        self.shift.saturating_sub(1)
    }

    #[inline]
    fn inline_mask(&self) -> u32 {
        (1 << self.inline_bits()) - 1
    }
}

impl BlockCodec for VbyteBlock {
    type Scratch = Vec<u8>;

    fn for_width(width: u32) -> Result<Self> {
        check_width(width, 8)?;
        Ok(Self {
            width,
            shift: 8 - width,
        })
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn append(&self, code: u8, length: u32, scratch: &mut Vec<u8>) -> usize {
        debug_assert!(length > 0);
        let mut rest = length - 1;
        let head = code << self.shift;
        if self.shift == 0 {
            scratch.push(head);
        } else if rest <= self.inline_mask() {
            scratch.push(head | rest as u8);
            return scratch.len();
        } else {
            let flag = 1 << (self.shift - 1);
            scratch.push(head | flag | (rest & self.inline_mask()) as u8);
            rest >>= self.inline_bits();
        }
        while rest > LOW_BITS as u32 {
            scratch.push(CONTINUE | (rest as u8 & LOW_BITS));
            rest >>= 7;
        }
        scratch.push(rest as u8);
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
        let first = block[*pos];
        *pos += 1;
        let code = first >> self.shift;
        let mut offset = 0;
        let mut rest = 0u32;
        if self.shift > 0 {
            rest = first as u32 & self.inline_mask();
            if (first >> (self.shift - 1)) & 1 == 0 {
                return (code, rest + 1);
            }
            offset = self.inline_bits();
        }
        loop {
            let byte = block[*pos];
            *pos += 1;
            rest |= ((byte & LOW_BITS) as u32) << offset;
            if byte & CONTINUE == 0 {
                return (code, rest + 1);
            }
            offset += 7;
        }
    }
}
