//! Error types for network validation, contraction and search.

use thiserror::Error;

use crate::tensornetwork::tensor::Leg;

/// Problems with the description of a tensor network. Raised before any
/// search starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("tensor {name} has {shape} dimensions but {legs} legs")]
    ShapeLegLengthMismatch {
        name: String,
        shape: usize,
        legs: usize,
    },
    #[error("tensor {name} has leg {leg} twice; traces are not supported")]
    SelfTrace { name: String, leg: Leg },
    #[error("leg {leg} appears {count} times, expected {expected}")]
    LegMultiplicity {
        leg: Leg,
        count: usize,
        expected: usize,
    },
    #[error("open legs must be numbered -1..-{expected} without gaps, found {found:?}")]
    OpenLegNumbering { expected: usize, found: Vec<Leg> },
    #[error("internal legs must be numbered 0..{expected} without gaps, found {found:?}")]
    InternalLegNumbering { expected: usize, found: Vec<Leg> },
    #[error("leg {leg} has dimension {first} in {first_tensor} but {second} in {second_tensor}")]
    DimensionMismatch {
        leg: Leg,
        first_tensor: String,
        first: String,
        second_tensor: String,
        second: String,
    },
    #[error("tensor {name} has invalid dimension '{dimension}': {reason}")]
    InvalidDimension {
        name: String,
        dimension: String,
        reason: String,
    },
}

/// Errors raised while contracting, replaying or searching a network. None of
/// them is recoverable within the failing call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("invalid network: {0}")]
    Validation(#[from] ValidationError),
    #[error("tensors {first} and {second} have no common leg")]
    NoCommonLeg { first: String, second: String },
    #[error("leg {leg} is not shared by tensors {first} and {second}")]
    LegNotShared {
        leg: Leg,
        first: String,
        second: String,
    },
    #[error("leg {leg} is named more than once in one contraction")]
    RepeatedLeg { leg: Leg },
    #[error("tensor index {index} is out of range for {len} live tensors")]
    InvalidTensorIndex { index: usize, len: usize },
    #[error("contraction step {step} names no leg")]
    EmptyStep { step: usize },
    #[error("leg {leg} does not connect two live tensors")]
    LegNotFound { leg: Leg },
    #[error("network is not connected, {components} components remain")]
    Disconnected { components: usize },
    #[error("contraction sequence does not finish the network, {remaining} tensors remain")]
    IncompleteContraction { remaining: usize },
    #[error("the subset search needs concrete dimensions, tensor {name} has shape {shape}")]
    SymbolicShape { name: String, shape: String },
    #[error("{count} internal legs exceed the subset search limit of {max}")]
    TooManyLegs { count: usize, max: usize },
    #[error("network contains no tensors")]
    EmptyNetwork,
}
