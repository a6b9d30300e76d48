//! Arithmetic and memory cost of pairwise contractions.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    error::OrderError,
    scalar::Scalar,
    tensornetwork::tensor::{Leg, Tensor},
};

/// How the memory of a single contraction is estimated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MemoryPolicy {
    /// Both operands and the result are alive at the same time.
    #[default]
    Additive,
    /// Only the biggest of operands and result counts, assuming buffers are
    /// released as soon as possible.
    Peak,
}

/// How the memory snapshots of a contraction sequence are summarized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MemoryAccounting {
    /// The largest snapshot.
    #[default]
    Peak,
    /// The sum of all snapshots.
    Sum,
}

impl MemoryAccounting {
    /// Summarizes memory snapshots. Returns `None` if any snapshot is
    /// undefined, or if a peak is requested over symbolic snapshots that cannot
    /// be ordered.
    ///
    /// # Examples
    /// ```
    /// # use tnorder::contractionpath::contraction_cost::MemoryAccounting;
    /// # use tnorder::scalar::Scalar;
    /// let snapshots = [4u64, 9, 2].map(|size| Some(Scalar::from(size)));
    /// assert_eq!(MemoryAccounting::Peak.summarize(&snapshots), Some(Scalar::from(9u64)));
    /// assert_eq!(MemoryAccounting::Sum.summarize(&snapshots), Some(Scalar::from(15u64)));
    /// assert_eq!(MemoryAccounting::Sum.summarize(&[None, Some(Scalar::one())]), None);
    /// ```
    pub fn summarize(self, snapshots: &[Option<Scalar>]) -> Option<Scalar> {
        let snapshots = snapshots.iter().map(Option::as_ref).collect::<Option<Vec<_>>>()?;
        match self {
            MemoryAccounting::Sum => Some(snapshots.into_iter().sum()),
            MemoryAccounting::Peak => Scalar::peak(snapshots),
        }
    }
}

/// The memory conventions of one search run. Every contraction within a run
/// uses the same model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModel {
    pub memory: MemoryPolicy,
    pub accounting: MemoryAccounting,
}

impl CostModel {
    pub fn new(memory: MemoryPolicy, accounting: MemoryAccounting) -> Self {
        Self { memory, accounting }
    }
}

/// Result of contracting two tensors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contraction {
    /// The new tensor, named `[A-B]`.
    pub tensor: Tensor,
    /// The legs summed over, in the order they appear in the first operand.
    pub legs: Vec<Leg>,
    /// Number of multiply-add operations.
    pub cpu: Scalar,
    /// Memory estimate of the operation under the chosen [`MemoryPolicy`].
    /// `None` if the peak of incomparable symbolic sizes is asked for.
    pub mem: Option<Scalar>,
}

/// Contracts `a` and `b` over `legs`, or over all their common legs if `legs`
/// is empty. Naming a leg twice is an error.
///
/// The result carries the remaining legs of `a` followed by the remaining legs
/// of `b`, in their original order. The cpu cost is the size of the result
/// times the dimensions of the contracted legs.
///
/// # Examples
/// ```
/// # use tnorder::tensornetwork::tensor::Tensor;
/// # use tnorder::contractionpath::contraction_cost::{contract, MemoryPolicy};
/// # use tnorder::scalar::Scalar;
/// let a = Tensor::concrete("A", &[2, 3, 4], &[0, 1, 2]).unwrap();
/// let b = Tensor::concrete("B", &[2, 5, 6], &[0, 3, 4]).unwrap();
/// let c = contract(&a, &b, &[], MemoryPolicy::Additive).unwrap();
/// assert_eq!(c.tensor.name(), "[A-B]");
/// assert_eq!(c.tensor.legs(), &[1, 2, 3, 4]);
/// assert_eq!(c.cpu, Scalar::from(720u64));
/// assert_eq!(c.mem, Some(Scalar::from(24u64 + 60 + 360)));
/// ```
pub fn contract(
    a: &Tensor,
    b: &Tensor,
    legs: &[Leg],
    policy: MemoryPolicy,
) -> Result<Contraction, OrderError> {
    let legs = if legs.is_empty() {
        a.common_legs(b)
    } else {
        legs.to_vec()
    };
    if let Some(&leg) = legs.iter().duplicates().next() {
        return Err(OrderError::RepeatedLeg { leg });
    }
    if legs.is_empty() {
        return Err(OrderError::NoCommonLeg {
            first: a.name().to_string(),
            second: b.name().to_string(),
        });
    }

    let mut loop_size = Scalar::one();
    for &leg in &legs {
        match (a.dimension(leg), b.position(leg)) {
            (Some(dim), Some(_)) => loop_size *= dim,
            _ => {
                return Err(OrderError::LegNotShared {
                    leg,
                    first: a.name().to_string(),
                    second: b.name().to_string(),
                })
            }
        }
    }

    let (result_legs, result_shape): (Vec<_>, Vec<_>) = a
        .remaining_edges(&legs)
        .chain(b.remaining_edges(&legs))
        .map(|(leg, dim)| (leg, dim.clone()))
        .unzip();
    let tensor = Tensor::from_parts(
        format!("[{}-{}]", a.name(), b.name()),
        result_shape,
        result_legs,
    );
    let cpu = tensor.size() * &loop_size;
    let mem = step_memory(a, b, &tensor, policy);

    Ok(Contraction {
        tensor,
        legs,
        cpu,
        mem,
    })
}

/// Memory needed to contract `a` and `b` into `ab`. Undefined for the peak
/// of sizes that cannot be ordered.
fn step_memory(a: &Tensor, b: &Tensor, ab: &Tensor, policy: MemoryPolicy) -> Option<Scalar> {
    let sizes = [a.size(), b.size(), ab.size()];
    match policy {
        MemoryPolicy::Additive => Some(sizes.into_iter().sum()),
        MemoryPolicy::Peak => Scalar::peak(sizes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_explicit_legs() {
        let a = Tensor::concrete("A", &[2, 3, 4], &[0, 1, 2]).unwrap();
        let b = Tensor::concrete("B", &[4, 3, 5], &[2, 1, 3]).unwrap();
        let c = contract(&a, &b, &[2, 1], MemoryPolicy::Peak).unwrap();
        assert_eq!(c.legs, vec![2, 1]);
        assert_eq!(c.tensor.legs(), &[0, 3]);
        assert_eq!(c.tensor.shape(), &[Scalar::from(2u64), Scalar::from(5u64)]);
        assert_eq!(c.cpu, Scalar::from(120u64));
        assert_eq!(c.mem, Some(Scalar::from(60u64)));
    }

    #[test]
    fn test_contract_repeated_leg() {
        let a = Tensor::concrete("A", &[5, 3], &[0, -1]).unwrap();
        let b = Tensor::concrete("B", &[5, 4], &[0, -2]).unwrap();
        assert_eq!(
            contract(&a, &b, &[0], MemoryPolicy::Additive).unwrap().cpu,
            Scalar::from(60u64)
        );
        assert_eq!(
            contract(&a, &b, &[0, 0], MemoryPolicy::Additive),
            Err(OrderError::RepeatedLeg { leg: 0 })
        );
    }

    #[test]
    fn test_contract_no_common_leg() {
        let a = Tensor::concrete("A", &[2], &[0]).unwrap();
        let b = Tensor::concrete("B", &[2], &[1]).unwrap();
        assert_eq!(
            contract(&a, &b, &[], MemoryPolicy::Additive),
            Err(OrderError::NoCommonLeg {
                first: "A".to_string(),
                second: "B".to_string()
            })
        );
    }

    #[test]
    fn test_contract_leg_not_shared() {
        let a = Tensor::concrete("A", &[2, 3], &[0, 1]).unwrap();
        let b = Tensor::concrete("B", &[2, 4], &[0, 2]).unwrap();
        assert!(matches!(
            contract(&a, &b, &[1], MemoryPolicy::Additive),
            Err(OrderError::LegNotShared { leg: 1, .. })
        ));
    }

    #[test]
    fn test_contract_symbolic() {
        let chi = Scalar::symbol("chi").unwrap();
        let d = Scalar::symbol("D").unwrap();
        let a = Tensor::new("A", vec![chi.clone(), d.clone()], vec![0, -1]).unwrap();
        let b = Tensor::new("B", vec![chi.clone(), d.clone()], vec![0, -2]).unwrap();
        let c = contract(&a, &b, &[], MemoryPolicy::Additive).unwrap();
        assert_eq!(c.cpu, "chi*D^2".parse().unwrap());
        assert_eq!(c.mem, Some("2*chi*D + D^2".parse().unwrap()));

        let peak = contract(&a, &b, &[], MemoryPolicy::Peak).unwrap();
        assert_eq!(peak.cpu, c.cpu);
        assert_eq!(peak.mem, None);
        let e = Tensor::new("E", vec![chi.clone(), chi.clone()], vec![0, 1]).unwrap();
        let f = Tensor::new("F", vec![chi.clone(), chi], vec![1, 2]).unwrap();
        assert_eq!(
            contract(&e, &f, &[], MemoryPolicy::Peak).unwrap().mem,
            Some("chi^2".parse().unwrap())
        );
    }

    #[test]
    fn test_cost_model_serde() {
        let model: CostModel = serde_json::from_str(r#"{"memory":"peak"}"#).unwrap();
        assert_eq!(model.memory, MemoryPolicy::Peak);
        assert_eq!(model.accounting, MemoryAccounting::Peak);
    }
}
