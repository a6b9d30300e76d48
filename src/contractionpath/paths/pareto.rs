use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
};

use log::{debug, info, warn};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::{
    contractionpath::{
        dominance::CostPair,
        paths::{FindPath, SearchConfig},
    },
    error::OrderError,
    tensornetwork::{
        network::Network,
        tensor::{Leg, Tensor},
        validation::{count_components, validate_network},
    },
};

/// Frontier states grouped by their consumed legs.
type Frontier = BTreeMap<BTreeSet<Leg>, Vec<(CostPair, Network)>>;

/// Breadth-first search over all contraction sequences, pruning states that
/// are dominated by another state with the same consumed legs.
///
/// Each round contracts one more pair in every frontier state. Children are
/// computed in parallel, then merged into the next frontier one by one. The
/// result is the Pareto set of terminal states, sorted by `(cpu, mem)`.
///
/// With comparison off, or when any dimension is symbolic, nothing is pruned
/// except exact duplicates and every distinct terminal state is reported.
pub struct ParetoSearch<'a> {
    tensors: &'a [Tensor],
    config: SearchConfig,
    compare: bool,
    rounds: usize,
    best: Vec<Network>,
}

impl<'a> ParetoSearch<'a> {
    pub fn new(tensors: &'a [Tensor], config: SearchConfig) -> Self {
        Self {
            tensors,
            config,
            compare: config.compare,
            rounds: 0,
            best: Vec::new(),
        }
    }

    /// Whether dominance pruning was used in the last search.
    pub fn compare_enabled(&self) -> bool {
        self.compare
    }

    /// Number of rounds of the last search.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Adds `child` to the frontier unless an equivalent or better state is
    /// already there, dropping the states it dominates.
    fn merge(&self, frontier: &mut Frontier, child: Network) {
        let cost = child.cost();
        let bucket = frontier.entry(child.consumed().clone()).or_default();
        if self.compare {
            if bucket.iter().any(|(existing, _)| existing.covers(&cost)) {
                return;
            }
            bucket.retain(|(existing, _)| !cost.dominates(existing));
        } else if bucket.iter().any(|(_, existing)| existing.is_duplicate_of(&child)) {
            return;
        }
        bucket.push((cost, child));
    }

    /// Reduces the terminal states to the ones worth reporting.
    fn select(&self, terminal: Vec<Network>) -> Vec<Network> {
        let mut selected: Vec<(CostPair, Network)> = Vec::with_capacity(terminal.len());
        for network in terminal {
            if selected
                .iter()
                .any(|(_, existing)| existing.is_duplicate_of(&network))
            {
                continue;
            }
            selected.push((network.cost(), network));
        }

        if self.compare {
            let costs = selected.iter().map(|(cost, _)| cost.clone()).collect::<Vec<_>>();
            selected.retain(|(cost, _)| !costs.iter().any(|other| other.dominates(cost)));
            selected.sort_by(|(a, x), (b, y)| {
                a.lexicographic_cmp(b)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| result_name(x).cmp(result_name(y)))
            });
        }
        selected.into_iter().map(|(_, network)| network).collect()
    }
}

fn result_name(network: &Network) -> &str {
    network.tensor(0).map_or("", Tensor::name)
}

impl FindPath for ParetoSearch<'_> {
    fn find_path(&mut self) -> Result<(), OrderError> {
        self.best.clear();
        self.rounds = 0;
        validate_network(self.tensors)?;
        if self.tensors.is_empty() {
            return Ok(());
        }
        let components = count_components(self.tensors);
        if components > 1 {
            return Err(OrderError::Disconnected { components });
        }

        let concrete = self.tensors.iter().all(Tensor::is_concrete);
        self.compare = self.config.compare && concrete;
        if self.config.compare && !concrete {
            warn!("Symbolic dimensions found, dominance pruning disabled");
        }

        let initial = Network::new(self.tensors.to_vec(), self.config.cost_model);
        if initial.len() == 1 {
            self.best.push(initial);
            return Ok(());
        }

        let mut frontier = Frontier::new();
        frontier.insert(BTreeSet::new(), vec![(initial.cost(), initial)]);
        let mut terminal = Vec::new();
        while !frontier.is_empty() {
            let states = std::mem::take(&mut frontier)
                .into_values()
                .flatten()
                .map(|(_, network)| network)
                .collect::<Vec<_>>();
            let children = states
                .par_iter()
                .map(|state| state.children().collect::<Result<Vec<_>, _>>())
                .collect::<Result<Vec<_>, _>>()?;

            for child in children.into_iter().flatten() {
                if child.len() == 1 {
                    terminal.push(child);
                } else {
                    self.merge(&mut frontier, child);
                }
            }
            self.rounds += 1;
            debug!(
                round = self.rounds,
                expanded = states.len(),
                frontier = frontier.values().map(Vec::len).sum::<usize>(),
                terminal = terminal.len();
                "Finished search round"
            );
        }

        let found = terminal.len();
        self.best = self.select(terminal);
        info!(
            rounds = self.rounds,
            found,
            kept = self.best.len(),
            compare = self.compare;
            "Pareto search finished"
        );
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
        contractionpath::{
            contraction_cost::{CostModel, MemoryAccounting, MemoryPolicy},
            dominance::Dominance,
        },
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
        let mut opt = ParetoSearch::new(&tensors, SearchConfig::default());
        opt.find_path().unwrap();
        assert!(opt.compare_enabled());
        assert_eq!(opt.rounds(), 3);

        let names = opt
            .get_best_networks()
            .iter()
            .map(|network| network.result().unwrap().name())
            .collect::<Vec<_>>();
        // the mirrored sequence reaches the same state at equal cost and is pruned
        assert_eq!(names.len(), 1);
        assert!(names[0] == "[E-[T1-[C-T2]]]" || names[0] == "[E-[T2-[C-T1]]]");
        assert_eq!(
            opt.get_best_flops(),
            Some(Scalar::from(16_000_000u64 + 256_000_000 + 104_857_600))
        );
        assert_eq!(opt.get_best_size(), Some(Scalar::from(3_035_136u64)));
    }

    #[test]
    fn test_results_are_pareto_optimal() {
        let tensors = ring();
        let config = SearchConfig::new(
            CostModel::new(MemoryPolicy::Peak, MemoryAccounting::Sum),
            true,
        );
        let mut opt = ParetoSearch::new(&tensors, config);
        opt.find_path().unwrap();
        let costs = opt
            .get_best_networks()
            .iter()
            .map(Network::cost)
            .collect::<Vec<_>>();
        assert!(!costs.is_empty());
        for a in &costs {
            assert!(costs.iter().all(|b| !b.dominates(a)));
        }
        assert!(costs
            .windows(2)
            .all(|pair| pair[0].lexicographic_cmp(&pair[1]) != Some(Ordering::Greater)));
    }

    #[test]
    fn test_open_network() {
        // A chain with open ends
        let tensors = vec![
            Tensor::concrete("A", &[2, 10], &[-1, 0]).unwrap(),
            Tensor::concrete("B", &[10, 10], &[0, 1]).unwrap(),
            Tensor::concrete("C", &[10, 3], &[1, -2]).unwrap(),
        ];
        let mut opt = ParetoSearch::new(&tensors, SearchConfig::default());
        opt.find_path().unwrap();
        let best = opt.get_best_network().unwrap();
        assert_eq!(best.result().unwrap().name(), "[C-[A-B]]");
        // 2*10*10 + 2*3*10
        assert_eq!(best.cpu(), &Scalar::from(260u64));
        assert_eq!(opt.get_best_networks().len(), 1);
    }

    #[test]
    fn test_symbolic_disables_compare() {
        let chi = Scalar::symbol("chi").unwrap();
        let d = Scalar::symbol("D").unwrap();
        let tensors = vec![
            Tensor::new("A", vec![chi.clone(), d.clone()], vec![0, -1]).unwrap(),
            Tensor::new("B", vec![chi.clone(), chi.clone()], vec![0, 1]).unwrap(),
            Tensor::new("C", vec![chi, d], vec![1, -2]).unwrap(),
        ];
        let config = SearchConfig::new(
            CostModel::new(MemoryPolicy::Additive, MemoryAccounting::Sum),
            true,
        );
        let mut opt = ParetoSearch::new(&tensors, config);
        opt.find_path().unwrap();
        assert!(!opt.compare_enabled());
        let names = opt
            .get_best_networks()
            .iter()
            .map(|network| network.result().unwrap().name().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"[C-[A-B]]".to_string()));
        assert!(names.contains(&"[A-[B-C]]".to_string()));
    }

    #[test]
    fn test_symbolic_peak_policy_reports_orders() {
        let chi = Scalar::symbol("chi").unwrap();
        let d2: Scalar = "D^2".parse().unwrap();
        let tensors = vec![
            Tensor::new("C", vec![chi.clone(), chi.clone()], vec![1, 0]).unwrap(),
            Tensor::new("T1", vec![chi.clone(), chi.clone(), d2.clone()], vec![0, 2, -1]).unwrap(),
            Tensor::new("T2", vec![chi.clone(), chi, d2.clone()], vec![1, -3, 3]).unwrap(),
            Tensor::new("E", vec![d2.clone(), d2.clone(), d2.clone(), d2], vec![2, 3, -4, -2])
                .unwrap(),
        ];
        let config = SearchConfig::new(
            CostModel::new(MemoryPolicy::Peak, MemoryAccounting::Peak),
            false,
        );
        let mut opt = ParetoSearch::new(&tensors, config);
        opt.find_path().unwrap();
        let found = opt.get_best_networks();
        assert!(found.len() >= 2);
        for network in found {
            assert!(network.is_terminal());
            assert_eq!(network.mem(), None);
            assert_eq!(network.cost().compare(&found[0].cost()), Dominance::Incomparable);
        }
    }

    #[test]
    fn test_large_dimensions_stay_exact() {
        let big = 1u64 << 62;
        let tensors = vec![
            Tensor::concrete("A", &[big, big], &[-1, 0]).unwrap(),
            Tensor::concrete("B", &[big, big, 2], &[0, 1, -2]).unwrap(),
            Tensor::concrete("C", &[big, 3], &[1, -3]).unwrap(),
        ];
        let config = SearchConfig::new(CostModel::default(), false);
        let mut opt = ParetoSearch::new(&tensors, config);
        opt.find_path().unwrap();

        let mut costs = opt
            .get_best_networks()
            .iter()
            .map(|network| network.cpu().as_concrete().unwrap().clone())
            .collect::<Vec<_>>();
        costs.sort();
        let left_first = (BigUint::from(1u32) << 187u32) + (BigUint::from(3u32) << 125u32);
        let right_first = BigUint::from(3u32) << 126u32;
        assert_eq!(costs, vec![right_first.clone(), left_first]);

        let mut opt = ParetoSearch::new(&tensors, SearchConfig::default());
        opt.find_path().unwrap();
        assert_eq!(opt.get_best_flops(), Some(Scalar::from(right_first)));
    }

    #[test]
    fn test_trivial_networks() {
        let mut opt = ParetoSearch::new(&[], SearchConfig::default());
        opt.find_path().unwrap();
        assert!(opt.get_best_networks().is_empty());

        let single = vec![Tensor::concrete("A", &[3], &[-1]).unwrap()];
        let mut opt = ParetoSearch::new(&single, SearchConfig::default());
        opt.find_path().unwrap();
        assert_eq!(opt.get_best_networks().len(), 1);
        assert_eq!(opt.get_best_flops(), Some(Scalar::zero()));
    }

    #[test]
    fn test_disconnected() {
        let tensors = vec![
            Tensor::concrete("A", &[2], &[-1]).unwrap(),
            Tensor::concrete("B", &[2], &[-2]).unwrap(),
        ];
        let mut opt = ParetoSearch::new(&tensors, SearchConfig::default());
        assert_eq!(
            opt.find_path(),
            Err(OrderError::Disconnected { components: 2 })
        );
    }
}
