//! Exhaustive search for the order in which to contract a small tensor network
//! pairwise, minimizing arithmetic cost and memory.
//!
//! Networks are lists of [`Tensor`](tensornetwork::tensor::Tensor)s whose
//! non-negative legs are summed over and whose negative legs stay open. Two
//! searches implement [`FindPath`](contractionpath::paths::FindPath):
//! [`SubsetDp`](contractionpath::paths::subset_dp::SubsetDp) for closed networks
//! with concrete dimensions and
//! [`ParetoSearch`](contractionpath::paths::pareto::ParetoSearch) for open
//! networks and symbolic dimensions.

pub mod codegen;
pub mod contractionpath;
pub mod error;
pub mod io;
pub mod scalar;
pub mod tensornetwork;
mod utils;
