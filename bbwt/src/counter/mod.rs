//! Cumulative per-symbol counts, embedded in front of blocks and super-blocks.
//!
//! A [`CounterLayout`] describes where the count of every code lives inside a byte snapshot.
//! Snapshots are stored inline in the index blobs and read through the layout, while an
//! [`AlphabetCounter`] owns a snapshot during construction.

use std::fmt::Debug;
use std::io::{Read, Write};
use std::sync::Arc;

mod fixed;
mod packed;

pub use fixed::FixedCounter;
pub use packed::PackedCounter;

use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};

/// The range a counter counts over, which decides its word width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterScope {
    /// Counts inside a super-block, 32 bit words.
    Block,
    /// Counts over the whole index, 64 bit words.
    Global,
}

impl CounterScope {
    /// Width of one counter word in bytes.
    pub const fn word_bytes(self) -> usize {
        match self {
            CounterScope::Block => 4,
            CounterScope::Global => 8,
        }
    }

    fn write<W: Write>(self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.word_bytes() as u8)?;
        Ok(())
    }

    fn read<R: Read>(reader: &mut R) -> Result<Self> {
        match reader.read_u8()? {
            4 => Ok(CounterScope::Block),
            8 => Ok(CounterScope::Global),
            other => Err(Error::format(format!("counter word of {other} bytes"))),
        }
    }
}

/// The physical layout of a counter snapshot.
pub trait CounterLayout: Debug + Send + Sync + Sized {
    /// Derives a layout able to hold `maxima[code]` for every code.
    ///
    /// # Arguments
    ///
    /// * `maxima` - The largest value each code's count reaches.
    /// * `scope` - Whether this counts inside a super-block or globally.
    fn for_scope(maxima: &[u64], scope: CounterScope) -> Result<Self>;

    /// The number of codes counted.
    fn codes(&self) -> usize;

    /// Size of a snapshot in bytes.
    fn size(&self) -> usize;

    /// Reads the count of `code` from a snapshot of [`CounterLayout::size`] bytes.
    fn get(&self, bytes: &[u8], code: u8) -> u64;

    /// Overwrites the count of `code`. `value` has to fit the code's maximum.
    fn set(&self, bytes: &mut [u8], code: u8, value: u64);

    #[inline]
    fn add(&self, bytes: &mut [u8], code: u8, delta: u64) {
        let value = self.get(bytes, code) + delta;
        self.set(bytes, code, value);
    }

    fn write_statics<W: Write>(&self, writer: &mut W) -> Result<()>;

    fn load_statics<R: Read>(reader: &mut R) -> Result<Self>;
}

/// An owned counter snapshot.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use bbwt::counter::{AlphabetCounter, CounterLayout, CounterScope, PackedCounter};
///
/// let layout = PackedCounter::for_scope(&[3, 1000, 70], CounterScope::Block).unwrap();
/// let mut counter = AlphabetCounter::new(Arc::new(layout));
///
/// counter.add(1, 600);
/// counter.add(1, 400);
/// counter.add(0, 2);
///
/// assert_eq!(2, counter.p_sum(0));
/// assert_eq!(1000, counter.p_sum(1));
/// assert_eq!(0, counter.p_sum(2));
/// ```
#[derive(Debug, Clone)]
pub struct AlphabetCounter<L> {
    layout: Arc<L>,
    data: Box<[u8]>,
}

impl<L: CounterLayout> AlphabetCounter<L> {
    /// Creates a counter with every count at zero.
    pub fn new(layout: Arc<L>) -> Self {
        let data = vec![0; layout.size()].into_boxed_slice();
        Self { layout, data }
    }

    #[inline]
    pub fn add(&mut self, code: u8, delta: u64) {
        self.layout.add(&mut self.data, code, delta);
    }

    /// The count of `code`.
    #[inline]
    pub fn p_sum(&self, code: u8) -> u64 {
        self.layout.get(&self.data, code)
    }

    pub fn set(&mut self, code: u8, value: u64) {
        self.layout.set(&mut self.data, code, value);
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn layout(&self) -> &Arc<L> {
        &self.layout
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use paste::paste;

    use super::{AlphabetCounter, CounterLayout, CounterScope, FixedCounter, PackedCounter};

    macro_rules! layout_tests {
        ($($layout:ident),*) => {
            $(
                paste! {
                    #[test]
                    fn [<$layout:snake _independent_codes>]() {
                        let maxima = [1, 255, 256, 70_000, 5, 1 << 20, 0, 12];
                        for scope in [CounterScope::Block, CounterScope::Global] {
                            let layout = $layout::for_scope(&maxima, scope).unwrap();
                            assert_eq!(maxima.len(), layout.codes());
                            let mut counter = AlphabetCounter::new(Arc::new(layout));
                            for (code, &max) in maxima.iter().enumerate() {
                                counter.add(code as u8, max);
                            }
                            for (code, &max) in maxima.iter().enumerate() {
                                let sum = counter.p_sum(code as u8);
                                assert_eq!(max, sum, "code {code} in {scope:?}");
                            }
                            counter.set(3, 17);
                            assert_eq!(17, counter.p_sum(3));
                            assert_eq!(256, counter.p_sum(2));
                            counter.clear();
                            assert!((0..maxima.len() as u8).all(|c| counter.p_sum(c) == 0));
                        }
                    }

                    #[test]
                    fn [<$layout:snake _statics_round_trip>]() {
                        let maxima = [9, 1 << 31, 3];
                        let layout = $layout::for_scope(&maxima, CounterScope::Block).unwrap();
                        let mut out = Vec::new();
                        layout.write_statics(&mut out).unwrap();
                        let loaded = $layout::load_statics(&mut &out[..]).unwrap();
                        assert_eq!(layout, loaded);
                    }

                    #[test]
                    fn [<$layout:snake _global_full_range>]() {
                        let maxima = [u64::MAX, u64::MAX];
                        let layout = $layout::for_scope(&maxima, CounterScope::Global).unwrap();
                        let mut counter = AlphabetCounter::new(Arc::new(layout));
                        counter.add(1, u64::MAX);
                        assert_eq!(0, counter.p_sum(0));
                        assert_eq!(u64::MAX, counter.p_sum(1));
                    }
                }
            )*
        };
    }

    layout_tests!(FixedCounter, PackedCounter);

    #[test]
    fn block_scope_overflow() {
        assert!(FixedCounter::for_scope(&[1 << 32], CounterScope::Block).is_err());
        assert!(PackedCounter::for_scope(&[1 << 32], CounterScope::Block).is_err());
    }
}
