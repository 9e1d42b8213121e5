use super::Alphabet;
use crate::config::CounterBounds;
use crate::error::{Error, Result};

/// Symbol frequencies of a run stream, used to derive alphabets and counter sizes.
///
/// Besides the total count of every byte this records the largest count of every byte inside a
/// single super-block window. Those are the largest values a block scope counter has to hold.
///
/// # Examples
///
/// ```
/// use bbwt::{alphabet::CorpusStats, runs_of};
///
/// let stats = CorpusStats::from_runs(runs_of(b"AAAACCAA"), 4)?;
/// assert_eq!(6, stats.total(b'A'));
/// assert_eq!(4, stats.max_in_super_block(b'A'));
/// assert_eq!(2, stats.max_in_super_block(b'C'));
/// assert_eq!(8, stats.len());
/// # Ok::<(), bbwt::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusStats {
    totals: Box<[u64; 256]>,
    max_sub: Box<[u64; 256]>,
    len: u64,
    super_block_cap: u64,
}

impl CorpusStats {
    /// Collects statistics over `runs`.
    ///
    /// # Arguments
    ///
    /// * `runs` - The `(symbol, length)` runs of the input, in order.
    /// * `super_block_cap` - The logical capacity of a super-block. Must be positive.
    pub fn from_runs(
        runs: impl IntoIterator<Item = (u8, u64)>,
        super_block_cap: u64,
    ) -> Result<Self> {
        if super_block_cap == 0 {
            return Err(Error::config("super-block capacity must be positive"));
        }
        let mut totals = Box::new([0; 256]);
        let mut max_sub = Box::new([0; 256]);
        let mut window = [0u64; 256];
        let mut len = 0u64;

        let fold = |window: &mut [u64; 256], max_sub: &mut [u64; 256]| {
            for (m, w) in max_sub.iter_mut().zip(window.iter_mut()) {
                *m = (*m).max(*w);
                *w = 0;
            }
        };

        for (symbol, mut run) in runs {
            while run > 0 {
                let room = super_block_cap - len % super_block_cap;
                let take = room.min(run);
                window[symbol as usize] += take;
                totals[symbol as usize] += take;
                len += take;
                run -= take;
                if len % super_block_cap == 0 {
                    fold(&mut window, &mut max_sub);
                }
            }
        }
        fold(&mut window, &mut max_sub);

        Ok(Self {
            totals,
            max_sub,
            len,
            super_block_cap,
        })
    }

    /// Total number of symbols.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total(&self, symbol: u8) -> u64 {
        self.totals[symbol as usize]
    }

    pub fn max_in_super_block(&self, symbol: u8) -> u64 {
        self.max_sub[symbol as usize]
    }

    /// The bytes occurring at least once, in increasing byte order.
    pub fn symbols(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=u8::MAX).filter(|&s| self.totals[s as usize] > 0)
    }

    /// Per code maxima for counters over `alphabet`.
    ///
    /// Symbols sharing a code add up. Block scope counters are read before a block, so they
    /// never reach the full super-block capacity.
    pub fn bounds<A: Alphabet>(&self, alphabet: &A) -> CounterBounds {
        let mut block = vec![0; alphabet.size()];
        let mut global = vec![0; alphabet.size()];
        for symbol in self.symbols() {
            let code = alphabet.convert(symbol) as usize;
            block[code] += self.max_sub[symbol as usize];
            global[code] += self.totals[symbol as usize];
        }
        for b in &mut block {
            *b = (*b).min(self.super_block_cap - 1);
        }
        CounterBounds { block, global }
    }
}
