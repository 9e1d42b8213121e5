use static_assertions::const_assert;

use crate::error::{Error, Result};

/// The default logical capacity of a super-block.
pub const SUPER_BLOCK_CAP: u64 = 1 << 32;

/// The default logical capacity of a block in a [`BlockRlbwt`](crate::rlbwt::BlockRlbwt).
pub const DEFAULT_BLOCK_CAP: u32 = 4096;

/// The default number of runs per block in a [`RunRlbwt`](crate::rlbwt::RunRlbwt).
pub const DEFAULT_RUNS_PER_BLOCK: u32 = 64;

/// Blocks are addressed with 32 bit offsets inside their super-block
const MAX_BLOCK_CAP: u32 = u32::MAX >> 1;

const_assert!(SUPER_BLOCK_CAP.is_power_of_two());
const_assert!(DEFAULT_BLOCK_CAP.is_power_of_two());
const_assert!(SUPER_BLOCK_CAP % DEFAULT_BLOCK_CAP as u64 == 0);

/// Upper bounds for the values an alphabet counter has to hold, indexed by symbol code.
///
/// Bit-packed counters size every field to these bounds, so they have to be valid for the
/// corpus that is indexed. Use [`CorpusStats::bounds`](crate::alphabet::CorpusStats::bounds) to
/// compute tight ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterBounds {
    /// Maximum count of each code before any block of a single super-block.
    pub block: Vec<u64>,
    /// Maximum count of each code over the whole input.
    pub global: Vec<u64>,
}

impl CounterBounds {
    /// Bounds that hold for any input.
    ///
    /// # Arguments
    ///
    /// * `codes` - The number of codes of the alphabet.
    /// * `super_block_cap` - The logical capacity of a super-block.
    ///
    /// # Examples
    ///
    /// ```
    /// use bbwt::config::CounterBounds;
    ///
    /// let bounds = CounterBounds::worst_case(4, 1 << 20);
    /// assert_eq!(vec![(1 << 20) - 1; 4], bounds.block);
    /// assert_eq!(vec![u64::MAX; 4], bounds.global);
    /// ```
    pub fn worst_case(codes: usize, super_block_cap: u64) -> Self {
        Self {
            block: vec![super_block_cap.saturating_sub(1); codes],
            global: vec![u64::MAX; codes],
        }
    }

    fn check(&self, codes: usize) -> Result<()> {
        if self.block.len() != codes || self.global.len() != codes {
            return Err(Error::config(format!(
                "counter bounds cover {}/{} codes but the alphabet has {codes}",
                self.block.len(),
                self.global.len()
            )));
        }
        Ok(())
    }
}

/// Parameters for building an index.
///
/// # Examples
///
/// ```
/// use bbwt::config::BuildConfig;
///
/// let config = BuildConfig::default()
///     .with_block_cap(1024)
///     .with_super_block_cap(1 << 16);
///
/// assert!(config.validate_blocks().is_ok());
/// assert!(BuildConfig::default().with_block_cap(1000).validate_blocks().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Logical symbols per block of a block indexed RLBWT. Must be a power of two.
    pub block_cap: u32,
    /// Logical symbols per super-block. A power of two between `block_cap` and `2^32`.
    pub super_block_cap: u64,
    /// Runs per block of a run indexed RLBWT.
    pub runs_per_block: u32,
    /// Counter bounds, worst case bounds are used if this is `None`.
    pub bounds: Option<CounterBounds>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            block_cap: DEFAULT_BLOCK_CAP,
            super_block_cap: SUPER_BLOCK_CAP,
            runs_per_block: DEFAULT_RUNS_PER_BLOCK,
            bounds: None,
        }
    }
}

impl BuildConfig {
    #[must_use]
    pub fn with_block_cap(mut self, block_cap: u32) -> Self {
        self.block_cap = block_cap;
        self
    }

    #[must_use]
    pub fn with_super_block_cap(mut self, super_block_cap: u64) -> Self {
        self.super_block_cap = super_block_cap;
        self
    }

    #[must_use]
    pub fn with_runs_per_block(mut self, runs_per_block: u32) -> Self {
        self.runs_per_block = runs_per_block;
        self
    }

    #[must_use]
    pub fn with_bounds(mut self, bounds: CounterBounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Checks the parameters used by block indexed RLBWTs.
    pub fn validate_blocks(&self) -> Result<()> {
        if !self.block_cap.is_power_of_two() || self.block_cap > MAX_BLOCK_CAP {
            return Err(Error::config(format!(
                "block capacity {} is not a power of two below 2^31",
                self.block_cap
            )));
        }
        if !self.super_block_cap.is_power_of_two()
            || self.super_block_cap > SUPER_BLOCK_CAP
            || self.super_block_cap < self.block_cap as u64
        {
            return Err(Error::config(format!(
                "super-block capacity {} must be a power of two in [{}, 2^32]",
                self.super_block_cap, self.block_cap
            )));
        }
        Ok(())
    }

    /// Checks the parameters used by run indexed RLBWTs.
    pub fn validate_runs(&self) -> Result<()> {
        if self.runs_per_block == 0 {
            return Err(Error::config("blocks must hold at least one run"));
        }
        Ok(())
    }

    /// Returns the configured counter bounds or the worst case for the given alphabet size.
    pub(crate) fn resolve_bounds(&self, codes: usize) -> Result<CounterBounds> {
        match self.bounds {
            Some(ref bounds) => {
                bounds.check(codes)?;
                Ok(bounds.clone())
            }
            None => Ok(CounterBounds::worst_case(codes, self.super_block_cap)),
        }
    }
}

#[cfg(test)]
mod test {
    use test_case::test_case;

    use super::{BuildConfig, CounterBounds};
    use crate::error::Error;

    #[test_case(4, 1 << 32, true; "tiny blocks")]
    #[test_case(4096, 1 << 32, true; "defaults")]
    #[test_case(4096, 4096, true; "one block per super block")]
    #[test_case(3, 1 << 32, false; "block cap not a power of two")]
    #[test_case(0, 1 << 32, false; "zero block cap")]
    #[test_case(4096, 2048, false; "super block smaller than block")]
    #[test_case(4096, 1 << 33, false; "super block too large")]
    #[test_case(1 << 31, 1 << 32, false; "block cap too large")]
    fn validate_blocks_test(block_cap: u32, super_block_cap: u64, ok: bool) {
        let config = BuildConfig::default()
            .with_block_cap(block_cap)
            .with_super_block_cap(super_block_cap);
        assert_eq!(ok, config.validate_blocks().is_ok());
    }

    #[test]
    fn validate_runs_test() {
        assert!(BuildConfig::default().validate_runs().is_ok());
        assert!(matches!(
            BuildConfig::default().with_runs_per_block(0).validate_runs(),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn resolve_bounds_test() {
        let config = BuildConfig::default().with_super_block_cap(1 << 10);
        assert_eq!(
            CounterBounds::worst_case(5, 1 << 10),
            config.resolve_bounds(5).unwrap()
        );

        let config = config.with_bounds(CounterBounds {
            block: vec![1, 2, 3],
            global: vec![4, 5, 6],
        });
        assert_eq!(vec![1, 2, 3], config.resolve_bounds(3).unwrap().block);
        assert!(config.resolve_bounds(4).is_err());
    }
}
