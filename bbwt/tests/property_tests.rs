use std::sync::Arc;

use bbwt::alphabet::{AcgtAlphabet, ByteAlphabet};
use bbwt::b_heap::BHeap;
use bbwt::block::{OneByteBlock, TwoByteBlock, VbyteBlock};
use bbwt::config::BuildConfig;
use bbwt::counter::{AlphabetCounter, CounterLayout, CounterScope, PackedCounter};
use bbwt::traits::{BackwardSearch, SymbolAccess, SymbolRank, SymbolSelect};
use bbwt::{runs_of, BlockRlbwt, DynRlbwt, RunRlbwt};
use proptest::prelude::*;

fn unpack(runs: &[(u8, u64)]) -> Vec<u8> {
    runs.iter()
        .flat_map(|&(c, l)| std::iter::repeat(c).take(l as usize))
        .collect()
}

fn acgt_runs() -> impl Strategy<Value = Vec<(u8, u64)>> {
    prop::collection::vec(
        (prop::sample::select(b"ACGTN".to_vec()), 1..40u64),
        0..120,
    )
}

/// Checks access, rank and select of `index` against the plain string.
fn check_index<I>(index: &I, plain: &[u8]) -> Result<(), TestCaseError>
where
    I: SymbolAccess + SymbolRank + SymbolSelect,
{
    prop_assert_eq!(plain.len() as u64, index.len());
    let mut ranks = [0u64; 256];
    for (i, &c) in plain.iter().enumerate() {
        let i = i as u64;
        prop_assert_eq!(c, index.at(i));
        prop_assert_eq!((c, ranks[c as usize]), index.access_rank(i));
        ranks[c as usize] += 1;
        prop_assert_eq!(ranks[c as usize], index.rank(i + 1, c));
        prop_assert_eq!(Some(i), index.select(ranks[c as usize], c));
    }
    for &c in b"ACGTN" {
        let mut previous = 0;
        for i in (0..=plain.len() as u64).step_by(7) {
            let rank = index.rank(i, c);
            prop_assert!(previous <= rank);
            previous = rank;
        }
        prop_assert_eq!(ranks[c as usize], index.rank(u64::MAX, c));
        prop_assert_eq!(None, index.select(ranks[c as usize] + 1, c));
    }
    Ok(())
}

fn naive_bwt(text: &[u8]) -> Vec<u8> {
    let mut t = text.to_vec();
    t.push(0);
    let n = t.len();
    let mut rotations: Vec<usize> = (0..n).collect();
    rotations.sort_by(|&a, &b| t[a..].iter().chain(&t[..a]).cmp(t[b..].iter().chain(&t[..b])));
    rotations.into_iter().map(|r| t[(r + n - 1) % n]).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn block_rlbwt_matches_plain(
        runs in acgt_runs(),
        block_bits in 2..7u32,
        super_bits in 0..4u32,
    ) {
        let config = BuildConfig::default()
            .with_block_cap(1 << block_bits)
            .with_super_block_cap(1 << (block_bits + super_bits));
        let plain = unpack(&runs);
        type Plain = BlockRlbwt<AcgtAlphabet, OneByteBlock>;
        let index = Plain::from_runs(AcgtAlphabet, config.clone(), runs.clone()).unwrap();
        check_index(&index, &plain)?;
        let index = DynRlbwt::<AcgtAlphabet>::from_runs(AcgtAlphabet, config, runs).unwrap();
        check_index(&index, &plain)?;
    }

    #[test]
    fn run_rlbwt_matches_plain(runs in acgt_runs(), runs_per_block in 1..9u32) {
        let config = BuildConfig::default().with_runs_per_block(runs_per_block);
        let plain = unpack(&runs);
        type Index = RunRlbwt<AcgtAlphabet, TwoByteBlock, PackedCounter, 4>;
        let index = Index::from_runs(AcgtAlphabet, config, runs)
            .unwrap()
            .with_skip_table(16);
        check_index(&index, &plain)?;
    }

    #[test]
    fn count_matches_brute_force(
        text in prop::collection::vec(prop::sample::select(b"abc".to_vec()), 1..80),
        pattern in prop::collection::vec(prop::sample::select(b"abc".to_vec()), 1..5),
    ) {
        let bwt = naive_bwt(&text);
        let expected = text.windows(pattern.len()).filter(|w| *w == &pattern[..]).count() as u64;

        let config = BuildConfig::default().with_block_cap(8).with_super_block_cap(16);
        let index =
            BlockRlbwt::<ByteAlphabet, VbyteBlock>::from_runs(ByteAlphabet, config, runs_of(&bwt))
                .unwrap();
        prop_assert_eq!(expected, index.count(&pattern));

        let config = BuildConfig::default().with_runs_per_block(3);
        let index =
            RunRlbwt::<ByteAlphabet, OneByteBlock>::from_runs(ByteAlphabet, config, runs_of(&bwt))
                .unwrap();
        prop_assert_eq!(expected, index.count(&pattern));
    }

    #[test]
    fn b_heap_finds_largest_smaller_key(
        gaps in prop::collection::vec(1..1000u64, 1..3000),
        queries in prop::collection::vec(any::<u64>(), 50),
    ) {
        let items: Vec<(u64, u64)> = gaps
            .iter()
            .scan(0u64, |key, &gap| {
                let item = *key;
                *key += gap;
                Some(item)
            })
            .enumerate()
            .map(|(i, key)| (key, i as u64))
            .collect();
        let heap = BHeap::<8>::new(&items);
        let last = items[items.len() - 1].0;
        for q in queries {
            let q = q % (last + 100);
            let i = items.partition_point(|&(k, _)| k <= q);
            prop_assert_eq!(items[i - 1], heap.find(q));
        }
    }

    #[test]
    fn packed_counter_holds_its_maxima(
        maxima in prop::collection::vec(0..=u32::MAX as u64, 1..40),
    ) {
        let layout = PackedCounter::for_scope(&maxima, CounterScope::Block).unwrap();
        let mut counter = AlphabetCounter::new(Arc::new(layout));
        for (code, &max) in maxima.iter().enumerate().rev() {
            counter.set(code as u8, max);
        }
        for (code, &max) in maxima.iter().enumerate() {
            prop_assert_eq!(max, counter.p_sum(code as u8));
        }
    }
}
