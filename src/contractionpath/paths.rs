//! Contraction order finders.

use serde::{Deserialize, Serialize};

use crate::{
    contractionpath::{contraction_cost::CostModel, LegPath, SimplePath},
    error::OrderError,
    scalar::Scalar,
    tensornetwork::network::Network,
};

pub mod pareto;
pub mod subset_dp;

/// An optimizer for finding a contraction order.
pub trait FindPath {
    /// Runs the search.
    fn find_path(&mut self) -> Result<(), OrderError>;

    /// The optimal terminal states found, best first. Empty before
    /// [`FindPath::find_path`] succeeded.
    fn get_best_networks(&self) -> &[Network];

    /// The best terminal state found.
    fn get_best_network(&self) -> Option<&Network> {
        self.get_best_networks().first()
    }

    /// Returns the leg sets contracted by the best found sequence.
    fn get_best_path(&self) -> Option<&LegPath> {
        self.get_best_network().map(Network::history)
    }

    /// Returns the best found contraction path in ReplaceLeft format.
    fn get_best_replace_path(&self) -> Option<SimplePath> {
        self.get_best_network().map(Network::replace_path)
    }

    /// Returns the total op count of the best path found.
    fn get_best_flops(&self) -> Option<Scalar> {
        self.get_best_network().map(|network| network.cpu().clone())
    }

    /// Returns the summarized memory of the best path found.
    fn get_best_size(&self) -> Option<Scalar> {
        self.get_best_network().and_then(Network::mem)
    }
}

/// The search strategy to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SearchMethod {
    /// Subset dynamic program over consumed-leg bitmasks. Needs a closed
    /// network with concrete dimensions.
    Dp,
    /// Breadth-first search with dominance pruning, returning a Pareto set.
    #[default]
    Bfs,
}

/// Settings of one search run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub cost_model: CostModel,
    /// Whether costs are compared to prune dominated branches. Ignored (treated
    /// as off) when a dimension is symbolic.
    pub compare: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            cost_model: CostModel::default(),
            compare: true,
        }
    }
}

impl SearchConfig {
    pub fn new(cost_model: CostModel, compare: bool) -> Self {
        Self {
            cost_model,
            compare,
        }
    }
}
