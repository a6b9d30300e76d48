use rustc_hash::FxHashMap;

use crate::tensornetwork::tensor::{Leg, TensorIndex};

pub mod contraction_cost;
pub mod dominance;
pub mod paths;
pub mod replay;

/// A simple, flat contraction path of tensor pairs.
pub type SimplePath = Vec<(TensorIndex, TensorIndex)>;

/// A contraction sequence given by the legs summed over in each step. Each
/// leg set identifies the two tensors it connects, independent of where those
/// tensors sit in a list.
pub type LegPath = Vec<Vec<Leg>>;

/// Accepts a contraction `path` that is in SSA format (inputs are `0..n`, the
/// result of the k-th contraction gets id `n + k`) and returns a contraction
/// path assuming that all contracted tensors replace the left input tensor and
/// no tensor is popped.
///
/// # Examples
/// ```
/// # use tnorder::contractionpath::ssa_replace_ordering;
/// let path = vec![(0, 3), (1, 2), (4, 5)];
/// assert_eq!(ssa_replace_ordering(&path, 4), vec![(0, 3), (1, 2), (0, 1)]);
/// ```
pub fn ssa_replace_ordering(path: &[(TensorIndex, TensorIndex)], n: usize) -> SimplePath {
    let mut hs = FxHashMap::default();
    let mut replace_path = Vec::with_capacity(path.len());
    for (next, (t0, t1)) in (n..).zip(path) {
        let new_t0 = *hs.get(t0).unwrap_or(t0);
        let new_t1 = *hs.get(t1).unwrap_or(t1);

        hs.insert(next, new_t0);
        replace_path.push((new_t0, new_t1));
    }
    replace_path
}
