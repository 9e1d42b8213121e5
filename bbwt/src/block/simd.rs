//! AVX2 prefix scans over one byte runs.
//!
//! Both functions only consume whole 32 byte chunks whose runs end strictly before the queried
//! location. A chunk reaching past the end of the block always sums to more than the remaining
//! block length, so it is never consumed and no padding is needed behind a block.

use std::arch::x86_64::*;

const CHUNK: usize = 32;

/// Horizontal sum of 32 unsigned bytes.
#[inline]
unsafe fn sum_epu8(v: __m256i) -> u32 {
    let sad = _mm256_sad_epu8(v, _mm256_setzero_si256());
    let low = _mm256_castsi256_si128(sad);
    let high = _mm256_extracti128_si256::<1>(sad);
    let sum = _mm_add_epi64(low, high);
    (_mm_cvtsi128_si64(sum) + _mm_extract_epi64::<1>(sum)) as u32
}

/// The run lengths of a chunk, one per byte.
#[inline]
unsafe fn lengths(v: __m256i, width: u32) -> __m256i {
    let mask = _mm256_set1_epi8(((1u32 << (8 - width)) - 1) as i8);
    _mm256_add_epi8(_mm256_and_si256(v, mask), _mm256_set1_epi8(1))
}

/// Returns `(bytes, symbols)` that [`at`](super::BlockCodec::at) may skip.
pub(super) fn at_prefix(block: &[u8], width: u32, location: u32) -> (usize, u32) {
    let mut skipped = 0u32;
    let mut pos = 0;
    for chunk in block.chunks_exact(CHUNK) {
        let total = unsafe {
            let v = _mm256_loadu_si256(chunk.as_ptr() as *const __m256i);
            sum_epu8(lengths(v, width))
        };
        if skipped + total > location {
            break;
        }
        skipped += total;
        pos += CHUNK;
    }
    (pos, skipped)
}

/// Returns `(bytes, symbols, matches)` that [`rank`](super::BlockCodec::rank) may skip.
pub(super) fn rank_prefix(block: &[u8], width: u32, code: u8, location: u32) -> (usize, u32, u32) {
    let mut skipped = 0u32;
    let mut res = 0u32;
    let mut pos = 0;
    for chunk in block.chunks_exact(CHUNK) {
        let (total, matched) = unsafe {
            let v = _mm256_loadu_si256(chunk.as_ptr() as *const __m256i);
            let lens = lengths(v, width);
            // the shift drags bits of the neighbouring byte in, the code mask drops them again
            let codes = _mm256_srl_epi16(v, _mm_cvtsi32_si128((8 - width) as i32));
            let codes = _mm256_and_si256(codes, _mm256_set1_epi8(((1u32 << width) - 1) as i8));
            let hits = _mm256_cmpeq_epi8(codes, _mm256_set1_epi8(code as i8));
            (sum_epu8(lens), sum_epu8(_mm256_and_si256(lens, hits)))
        };
        if skipped + total >= location {
            break;
        }
        skipped += total;
        res += matched;
        pos += CHUNK;
    }
    (pos, skipped, res)
}
