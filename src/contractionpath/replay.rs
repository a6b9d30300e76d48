//! Replay of an explicit contraction sequence given as leg sets.

use itertools::Itertools;
use log::debug;

use crate::{
    contractionpath::contraction_cost::CostModel,
    error::OrderError,
    tensornetwork::{
        network::Network,
        tensor::{Leg, Tensor, TensorIndex},
        validation::validate_network,
    },
};

/// Finds the two live tensors carrying `leg`, lower position first.
pub(crate) fn locate(
    network: &Network,
    leg: Leg,
) -> Result<(TensorIndex, TensorIndex), OrderError> {
    network
        .tensors()
        .positions(|tensor| tensor.position(leg).is_some())
        .collect_tuple()
        .ok_or(OrderError::LegNotFound { leg })
}

/// Contracts `tensors` step by step, each step summing over one leg set, and
/// returns the final state.
///
/// The two operands of a step are the live tensors carrying the first leg of
/// the set; the one found first is the left operand. This is the order the
/// search drivers use, so replaying the history of a search result reproduces
/// the result.
///
/// # Examples
/// ```
/// # use tnorder::tensornetwork::tensor::Tensor;
/// # use tnorder::contractionpath::contraction_cost::CostModel;
/// # use tnorder::contractionpath::replay::replay;
/// # use tnorder::scalar::Scalar;
/// let a = Tensor::concrete("A", &[2, 3], &[0, -1]).unwrap();
/// let b = Tensor::concrete("B", &[2, 4, 5], &[0, 1, -2]).unwrap();
/// let c = Tensor::concrete("C", &[4], &[1]).unwrap();
/// let network = replay(&[a, b, c], &[vec![1], vec![0]], CostModel::default()).unwrap();
/// assert_eq!(network.result().unwrap().name(), "[A-[B-C]]");
/// assert_eq!(network.cpu(), &Scalar::from(40u64 + 30));
/// ```
pub fn replay(
    tensors: &[Tensor],
    history: &[Vec<Leg>],
    model: CostModel,
) -> Result<Network, OrderError> {
    validate_network(tensors)?;
    let mut network = Network::new(tensors.to_vec(), model);
    for (step, legs) in history.iter().enumerate() {
        let Some(&leg) = legs.first() else {
            return Err(OrderError::EmptyStep { step });
        };
        let (i, j) = locate(&network, leg)?;
        debug!(step, i, j, legs:?; "Replaying contraction");
        network = network.contract_over(i, j, legs)?;
    }

    if !network.is_terminal() {
        return Err(OrderError::IncompleteContraction {
            remaining: network.len(),
        });
    }
    debug!(cpu:% = network.cpu(), steps = history.len(); "Replayed contraction sequence");
    Ok(network)
}

#[cfg(test)]
mod tests {
    use super::*;

    use num_bigint::BigUint;

    use crate::scalar::Scalar;

    fn ring() -> Vec<Tensor> {
        vec![
            Tensor::concrete("C", &[100, 100], &[1, 0]).unwrap(),
            Tensor::concrete("T1", &[100, 100, 16], &[0, 2, -1]).unwrap(),
            Tensor::concrete("T2", &[100, 100, 16], &[1, -3, 3]).unwrap(),
            Tensor::concrete("E", &[16, 16, 16, 16], &[2, 3, -4, -2]).unwrap(),
        ]
    }

    #[test]
    fn test_replay_ring() {
        let network = replay(&ring(), &[vec![1], vec![0], vec![2, 3]], CostModel::default()).unwrap();
        assert!(network.is_terminal());
        assert_eq!(network.result().unwrap().name(), "[E-[T1-[C-T2]]]");
        assert_eq!(
            network.cpu(),
            &Scalar::from(16_000_000u64 + 256_000_000 + 104_857_600)
        );
        assert_eq!(network.step_cpu().iter().sum::<Scalar>(), *network.cpu());
    }

    #[test]
    fn test_replay_partial_leg_set() {
        // summing E and [T1-[C-T2]] over leg 2 only leaves leg 3 open twice
        let result = replay(&ring(), &[vec![1], vec![0], vec![2]], CostModel::default());
        assert_eq!(
            result.unwrap_err(),
            OrderError::IncompleteContraction { remaining: 1 }
        );
    }

    #[test]
    fn test_replay_incomplete() {
        assert_eq!(
            replay(&ring(), &[vec![1]], CostModel::default()).unwrap_err(),
            OrderError::IncompleteContraction { remaining: 3 }
        );
    }

    #[test]
    fn test_replay_unknown_leg() {
        assert_eq!(
            replay(&ring(), &[vec![7]], CostModel::default()).unwrap_err(),
            OrderError::LegNotFound { leg: 7 }
        );
        assert_eq!(
            replay(&ring(), &[vec![1], vec![1]], CostModel::default()).unwrap_err(),
            OrderError::LegNotFound { leg: 1 }
        );
    }

    #[test]
    fn test_replay_leg_not_shared() {
        assert!(matches!(
            replay(&ring(), &[vec![1, 0]], CostModel::default()),
            Err(OrderError::LegNotShared { leg: 0, .. })
        ));
    }

    #[test]
    fn test_replay_repeated_leg() {
        let tensors = vec![
            Tensor::concrete("A", &[5, 3], &[0, -1]).unwrap(),
            Tensor::concrete("B", &[5, 4], &[0, -2]).unwrap(),
        ];
        let network = replay(&tensors, &[vec![0]], CostModel::default()).unwrap();
        assert_eq!(network.cpu(), &Scalar::from(60u64));
        assert_eq!(
            replay(&tensors, &[vec![0, 0]], CostModel::default()).unwrap_err(),
            OrderError::RepeatedLeg { leg: 0 }
        );
    }

    #[test]
    fn test_replay_large_dimensions() {
        let big = 1u64 << 62;
        let tensors = vec![
            Tensor::concrete("A", &[big, big], &[-1, 0]).unwrap(),
            Tensor::concrete("B", &[big, big, 2], &[0, 1, -2]).unwrap(),
            Tensor::concrete("C", &[big, 3], &[1, -3]).unwrap(),
        ];
        let network = replay(&tensors, &[vec![0], vec![1]], CostModel::default()).unwrap();
        // 2^62 * 2^125 for [A-B], then 2^62 * 6 * 2^62 for the last step
        let expected = (BigUint::from(1u32) << 187u32) + (BigUint::from(3u32) << 125u32);
        assert_eq!(network.cpu(), &Scalar::from(expected));
        assert!(network.cpu() > &Scalar::from(u128::MAX));
    }

    #[test]
    fn test_replay_empty_step() {
        assert_eq!(
            replay(&ring(), &[vec![]], CostModel::default()).unwrap_err(),
            OrderError::EmptyStep { step: 0 }
        );
    }

    #[test]
    fn test_replay_invalid_network() {
        let tensors = vec![Tensor::concrete("A", &[2, 2], &[0, 0]).unwrap()];
        assert!(matches!(
            replay(&tensors, &[], CostModel::default()),
            Err(OrderError::Validation(_))
        ));
    }
}
