use std::{cmp::Ordering, collections::BTreeSet};

use itertools::Itertools;
use log::{debug, info};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use rustc_hash::FxHashMap;

use crate::{
    contractionpath::{contraction_cost::CostModel, paths::FindPath},
    error::OrderError,
    tensornetwork::{
        network::Network,
        tensor::{Leg, Tensor},
        validation::{count_components, internal_legs, validate_normalized},
    },
};

/// Largest number of internal legs the subset search accepts.
pub const MAX_SUBSET_LEGS: usize = 63;

/// Bitmask with bit `l` set for every consumed leg `l`.
fn leg_mask(legs: &BTreeSet<Leg>) -> u64 {
    legs.iter().fold(0, |mask, &leg| mask | (1 << leg))
}

/// Exhaustive search over closed networks, keeping the cheapest state for
/// every set of consumed legs.
///
/// Masks are expanded in order of their number of set bits. A contraction
/// always sets at least one more bit, so every mask has its final state before
/// it is expanded. Per mask the state that is smallest in `(cpu, mem)` is
/// kept; on ties the first one found stays.
///
/// Needs internal legs numbered `0..n` and concrete dimensions.
pub struct SubsetDp<'a> {
    tensors: &'a [Tensor],
    cost_model: CostModel,
    explored: usize,
    best: Vec<Network>,
}

impl<'a> SubsetDp<'a> {
    pub fn new(tensors: &'a [Tensor], cost_model: CostModel) -> Self {
        Self {
            tensors,
            cost_model,
            explored: 0,
            best: Vec::new(),
        }
    }

    /// Number of distinct masks reached by the last search.
    pub fn explored(&self) -> usize {
        self.explored
    }

    fn check_preconditions(&self) -> Result<usize, OrderError> {
        if self.tensors.is_empty() {
            return Err(OrderError::EmptyNetwork);
        }
        validate_normalized(self.tensors)?;
        if let Some(tensor) = self.tensors.iter().find(|tensor| !tensor.is_concrete()) {
            return Err(OrderError::SymbolicShape {
                name: tensor.name().to_string(),
                shape: format!("({})", tensor.shape().iter().join(", ")),
            });
        }
        let count = internal_legs(self.tensors).len();
        if count > MAX_SUBSET_LEGS {
            return Err(OrderError::TooManyLegs {
                count,
                max: MAX_SUBSET_LEGS,
            });
        }
        let components = count_components(self.tensors);
        if components > 1 {
            return Err(OrderError::Disconnected { components });
        }
        Ok(count)
    }
}

impl FindPath for SubsetDp<'_> {
    fn find_path(&mut self) -> Result<(), OrderError> {
        self.best.clear();
        let legs = self.check_preconditions()?;
        let full = if legs == 0 { 0 } else { u64::MAX >> (64 - legs) };

        let mut slots = FxHashMap::default();
        slots.insert(0u64, Network::new(self.tensors.to_vec(), self.cost_model));
        let mut buckets = vec![Vec::new(); legs + 1];
        buckets[0].push(0u64);

        for popcount in 0..=legs {
            let masks = std::mem::take(&mut buckets[popcount]);
            debug!(popcount, masks = masks.len(); "Expanding masks");
            let children = masks
                .par_iter()
                .map(|mask| slots[mask].children().collect::<Result<Vec<_>, _>>())
                .collect::<Result<Vec<_>, _>>()?;

            for child in children.into_iter().flatten() {
                let mask = leg_mask(child.consumed());
                match slots.get(&mask) {
                    None => {
                        buckets[mask.count_ones() as usize].push(mask);
                        slots.insert(mask, child);
                    }
                    Some(existing) => {
                        if child.cost().lexicographic_cmp(&existing.cost()) == Some(Ordering::Less)
                        {
                            slots.insert(mask, child);
                        }
                    }
                }
            }
        }

        self.explored = slots.len();
        let best = slots
            .remove(&full)
            .ok_or_else(|| OrderError::Disconnected {
                components: count_components(self.tensors),
            })?;
        info!(legs, explored = self.explored, cpu:% = best.cpu(); "Subset search finished");
        self.best.push(best);
        Ok(())
    }

    fn get_best_networks(&self) -> &[Network] {
        &self.best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use num_bigint::BigUint;

    use crate::{
        contractionpath::contraction_cost::{MemoryAccounting, MemoryPolicy},
        scalar::Scalar,
    };

    fn ring() -> Vec<Tensor> {
        vec![
            Tensor::concrete("C", &[100, 100], &[1, 0]).unwrap(),
            Tensor::concrete("T1", &[100, 100, 16], &[0, 2, -1]).unwrap(),
            Tensor::concrete("T2", &[100, 100, 16], &[1, -3, 3]).unwrap(),
            Tensor::concrete("E", &[16, 16, 16, 16], &[2, 3, -4, -2]).unwrap(),
        ]
    }

    #[test]
    fn test_ring() {
        let tensors = ring();
        let mut opt = SubsetDp::new(&tensors, CostModel::default());
        opt.find_path().unwrap();

        let best = opt.get_best_network().unwrap();
        let name = best.result().unwrap().name();
        assert!(
            name == "[E-[T1-[C-T2]]]" || name == "[E-[T2-[C-T1]]]",
            "unexpected optimum {name}"
        );
        assert_eq!(
            opt.get_best_flops(),
            Some(Scalar::from(16_000_000u64 + 256_000_000 + 104_857_600))
        );
        assert_eq!(opt.get_best_size(), Some(Scalar::from(3_035_136u64)));
        assert_eq!(opt.get_best_path().unwrap().len(), 3);
        assert_eq!(opt.get_best_replace_path().unwrap().len(), 3);
        assert_eq!(opt.explored(), 12);
    }

    #[test]
    fn test_ring_peak_memory_policy() {
        let tensors = ring();
        let model = CostModel::new(MemoryPolicy::Peak, MemoryAccounting::Peak);
        let mut opt = SubsetDp::new(&tensors, model);
        opt.find_path().unwrap();
        assert_eq!(opt.get_best_size(), Some(Scalar::from(2_625_536u64)));
    }

    #[test]
    fn test_large_dimensions() {
        let big = 1u64 << 62;
        let tensors = vec![
            Tensor::concrete("A", &[big, big], &[-1, 0]).unwrap(),
            Tensor::concrete("B", &[big, big, 2], &[0, 1, -2]).unwrap(),
            Tensor::concrete("C", &[big, 3], &[1, -3]).unwrap(),
        ];
        let mut opt = SubsetDp::new(&tensors, CostModel::default());
        opt.find_path().unwrap();
        assert_eq!(
            opt.get_best_flops(),
            Some(Scalar::from(BigUint::from(3u32) << 126u32))
        );
        assert_eq!(opt.get_best_path().unwrap(), &vec![vec![1], vec![0]]);
    }

    #[test]
    fn test_single_tensor() {
        let tensors = vec![Tensor::concrete("A", &[2, 3], &[-1, -2]).unwrap()];
        let mut opt = SubsetDp::new(&tensors, CostModel::default());
        opt.find_path().unwrap();
        assert_eq!(opt.get_best_flops(), Some(Scalar::zero()));
        assert_eq!(opt.get_best_network().unwrap().result().unwrap().name(), "A");
        assert!(opt.get_best_path().unwrap().is_empty());
    }

    #[test]
    fn test_empty() {
        let mut opt = SubsetDp::new(&[], CostModel::default());
        assert_eq!(opt.find_path(), Err(OrderError::EmptyNetwork));
        assert!(opt.get_best_network().is_none());
    }

    #[test]
    fn test_disconnected() {
        let tensors = vec![
            Tensor::concrete("A", &[2], &[0]).unwrap(),
            Tensor::concrete("B", &[2], &[0]).unwrap(),
            Tensor::concrete("C", &[3], &[1]).unwrap(),
            Tensor::concrete("D", &[3], &[1]).unwrap(),
        ];
        let mut opt = SubsetDp::new(&tensors, CostModel::default());
        assert_eq!(
            opt.find_path(),
            Err(OrderError::Disconnected { components: 2 })
        );
    }

    #[test]
    fn test_rejects_symbolic() {
        let chi = Scalar::symbol("chi").unwrap();
        let tensors = vec![
            Tensor::new("A", vec![chi.clone()], vec![0]).unwrap(),
            Tensor::new("B", vec![chi], vec![0]).unwrap(),
        ];
        let mut opt = SubsetDp::new(&tensors, CostModel::default());
        assert_eq!(
            opt.find_path(),
            Err(OrderError::SymbolicShape {
                name: "A".to_string(),
                shape: "(chi)".to_string()
            })
        );
    }

    #[test]
    fn test_rejects_unnormalized() {
        let tensors = vec![
            Tensor::concrete("A", &[2], &[3]).unwrap(),
            Tensor::concrete("B", &[2], &[3]).unwrap(),
        ];
        let mut opt = SubsetDp::new(&tensors, CostModel::default());
        assert!(matches!(
            opt.find_path(),
            Err(OrderError::Validation(_))
        ));
    }

    #[test]
    fn test_leg_mask() {
        assert_eq!(leg_mask(&BTreeSet::from([0, 2, 5])), 0b100101);
        assert_eq!(leg_mask(&BTreeSet::new()), 0);
    }
}
