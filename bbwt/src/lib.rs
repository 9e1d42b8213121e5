#![deny(rustdoc::broken_intra_doc_links)] // error if there are broken intra-doc links
#![deny(rustdoc::invalid_html_tags)] // no broken html in docs
#![deny(rustdoc::invalid_rust_codeblocks)] // code blocks should not be broken

//! Run-length encoded Burrows-Wheeler transform indexes.
//!
//! An index stores the runs of a BWT in small run-length encoded blocks with cumulative symbol
//! counts in front of them. That is enough to answer `rank`, `at` and `select` by scanning a
//! single block, and `count` by backward search.
//!
//! Two layouts are provided. A [`BlockRlbwt`] cuts the BWT into blocks of a fixed number of
//! symbols grouped into super-blocks, a [`RunRlbwt`] cuts it into blocks of a fixed number of
//! runs and finds them through a [`BHeap`](b_heap::BHeap).
//!
//! ```
//! use bbwt::{alphabet::AcgtAlphabet, config::BuildConfig, runs_of, AcgtRlbwt};
//! use bbwt::traits::BackwardSearch;
//!
//! // BWT of "ACAACG" followed by the end marker N
//! let config = BuildConfig::default();
//! let index = AcgtRlbwt::from_runs(AcgtAlphabet, config, runs_of(b"CNAAACG")).unwrap();
//! assert_eq!(2, index.count(b"AC"));
//! ```

pub mod alphabet;
pub mod b_heap;
pub mod block;
pub mod config;
pub mod counter;
mod error;
pub mod rlbwt;
pub mod super_block;
pub mod traits;
mod util;

pub use error::{Error, Result};
pub use rlbwt::{AcgtRlbwt, BlockRlbwt, DynRlbwt, GenomicsRlbwt, RunRlbwt, VbyteRunRlbwt};
pub use util::runs_of;

// block offsets and blob lengths are stored as u64 and used as indices
static_assertions::assert_eq_size!(usize, u64);
static_assertions::assert_impl_all!(AcgtRlbwt: Send, Sync);
static_assertions::assert_impl_all!(VbyteRunRlbwt<alphabet::ByteAlphabet>: Send, Sync);
