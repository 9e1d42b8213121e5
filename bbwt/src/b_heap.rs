//! A static, cache aware search tree mapping positions to blocks.

use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, LE};

use crate::error::{Error, Result};
use crate::util::{read_u64s, write_u64s};

/// A complete `B`-ary search tree over sorted keys, stored level by level in one array.
///
/// Every node holds `B` keys. The children of node `i` are the nodes `i * B + 1` to `i * B + B`,
/// and an inner node's key for a child is the smallest key in the child's subtree. The keys
/// themselves live in the leaves, padded with `u64::MAX`. A lookup therefore touches one node per
/// level, each a handful of cache lines for the default fan-out of 64.
///
/// # Generic Arguments
///
/// * `B` - The fan-out, a power of two between 2 and 1024.
///
/// # Examples
///
/// ```
/// use bbwt::b_heap::BHeap;
///
/// let heap = BHeap::<4>::new(&[(0, 100), (10, 200), (25, 300), (40, 400)]);
/// assert_eq!((25, 300), heap.find(27));
/// assert_eq!((40, 400), heap.find(40));
/// assert_eq!((0, 100), heap.find(9));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BHeap<const B: usize = 64> {
    nodes: Vec<[u64; B]>,
    values: Vec<u64>,
    levels: u32,
}

/// A node to resume a lookup from, see [`BHeap::short_cut`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Shortcut {
    node: usize,
    depth: u32,
    partial: usize,
}

impl<const B: usize> BHeap<B> {
    const FAN_OUT_OK: () = assert!(B.is_power_of_two() && B >= 2 && B <= 1024);

    /// Number of inner levels and inner nodes for `n` keys.
    fn shape(n: usize) -> (u32, usize) {
        let mut nn = n.div_ceil(B);
        let mut levels = 1;
        while nn > B {
            nn = nn.div_ceil(B);
            levels += 1;
        }
        let mut inner = 1;
        let mut level_nodes = 1;
        for _ in 1..levels {
            level_nodes *= B;
            inner += level_nodes;
        }
        (levels, inner)
    }

    /// Builds the tree over `(key, value)` pairs sorted by strictly increasing key.
    pub fn new(items: &[(u64, u64)]) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::FAN_OUT_OK;
        debug_assert!(items.windows(2).all(|w| w[0].0 < w[1].0));

        let (levels, inner) = Self::shape(items.len());
        let mut nodes = vec![[u64::MAX; B]; inner + items.len().div_ceil(B)];
        for (i, &(key, _)) in items.iter().enumerate() {
            nodes[inner + i / B][i % B] = key;
        }
        for i in (0..inner).rev() {
            for k in 0..B {
                let child = i * B + k + 1;
                if child < nodes.len() {
                    nodes[i][k] = nodes[child][0];
                }
            }
        }

        Self {
            nodes,
            values: items.iter().map(|&(_, value)| value).collect(),
            levels,
        }
    }

    /// The number of keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The number of inner levels above the leaves.
    pub fn levels(&self) -> u32 {
        self.levels
    }

    /// Heap bytes owned by this tree.
    pub fn bytes(&self) -> usize {
        self.nodes.len() * B * std::mem::size_of::<u64>()
            + self.values.len() * std::mem::size_of::<u64>()
    }

    /// The `k`-th pair in key order.
    pub fn item(&self, k: usize) -> (u64, u64) {
        let leaves = self.nodes.len() - self.values.len().div_ceil(B);
        (self.nodes[leaves + k / B][k % B], self.values[k])
    }

    /// Index of the last key `<= q` in a node, or 0 if there is none.
    #[inline]
    fn branch(keys: &[u64; B], q: u64) -> usize {
        #[cfg(target_arch = "x86_64")]
        unsafe {
            use std::arch::x86_64::{_mm_prefetch, _MM_HINT_T0};
            // one prefetch per cache line of the node
            for i in (0..B).step_by(64 / std::mem::size_of::<u64>()) {
                _mm_prefetch::<_MM_HINT_T0>(keys.as_ptr().add(i) as *const i8);
            }
        }
        let mut base = 0;
        let mut size = B;
        while size > 1 {
            let half = size / 2;
            base += (keys[base + half] <= q) as usize * half;
            size = half;
        }
        base
    }

    /// Finds the pair with the largest key `<= q`.
    ///
    /// Returns the first pair if `q` is smaller than every key.
    ///
    /// # Panics
    ///
    /// If the tree is empty.
    #[inline]
    pub fn find(&self, q: u64) -> (u64, u64) {
        self.find_from(q, Shortcut::default())
    }

    /// Like [`BHeap::find`] but starts the descent at `hint`.
    ///
    /// The hint has to come from [`BHeap::short_cut`] for a range containing `q`.
    #[inline]
    pub fn find_from(&self, q: u64, hint: Shortcut) -> (u64, u64) {
        let mut node = hint.node;
        let mut partial = hint.partial;
        for _ in hint.depth..self.levels {
            let k = Self::branch(&self.nodes[node], q);
            partial = partial * B + k;
            node = node * B + 1 + k;
        }
        let k = Self::branch(&self.nodes[node], q);
        (self.nodes[node][k], self.values[partial * B + k])
    }

    /// The deepest node every lookup for a key in `[a, b]` passes through.
    pub fn short_cut(&self, a: u64, b: u64) -> Shortcut {
        let mut hint = Shortcut::default();
        for _ in 0..self.levels {
            let keys = &self.nodes[hint.node];
            let k = Self::branch(keys, a);
            if k != Self::branch(keys, b) {
                break;
            }
            hint = Shortcut {
                node: hint.node * B + 1 + k,
                depth: hint.depth + 1,
                partial: hint.partial * B + k,
            };
        }
        hint
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u64::<LE>(B as u64)?;
        writer.write_u64::<LE>(self.levels as u64)?;
        writer.write_u64::<LE>(self.nodes.len() as u64)?;
        writer.write_u64::<LE>(self.values.len() as u64)?;
        for node in &self.nodes {
            write_u64s(writer, node)?;
        }
        write_u64s(writer, &self.values)
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        #[allow(clippy::let_unit_value)]
        let () = Self::FAN_OUT_OK;
        let fan_out = reader.read_u64::<LE>()?;
        if fan_out != B as u64 {
            return Err(Error::format(format!(
                "search tree has fan-out {fan_out}, expected {B}"
            )));
        }
        let levels = reader.read_u64::<LE>()?;
        let node_count = reader.read_u64::<LE>()?;
        let n = reader.read_u64::<LE>()? as usize;

        let (expected_levels, inner) = Self::shape(n);
        if levels != expected_levels as u64 || node_count != (inner + n.div_ceil(B)) as u64 {
            return Err(Error::format(format!(
                "search tree shape ({levels} levels, {node_count} nodes) does not match {n} keys with fan-out {B}"
            )));
        }

        let mut nodes = Vec::with_capacity(node_count as usize);
        for _ in 0..node_count {
            let mut keys = [0; B];
            reader.read_u64_into::<LE>(&mut keys)?;
            nodes.push(keys);
        }
        let values = read_u64s(reader, n)?;
        Ok(Self {
            nodes,
            values,
            levels: expected_levels,
        })
    }
}
