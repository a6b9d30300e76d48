//! Search state: the live tensors of a partially contracted network together
//! with the cost bookkeeping of the contractions that produced it.

use std::{collections::BTreeSet, fmt, sync::Arc};

use itertools::Itertools;

use crate::{
    contractionpath::{
        contraction_cost::{contract, CostModel},
        dominance::CostPair,
        ssa_replace_ordering, LegPath, SimplePath,
    },
    error::OrderError,
    scalar::Scalar,
    tensornetwork::tensor::{is_internal, Leg, Tensor, TensorIndex},
};

/// A partially contracted tensor network.
///
/// States are never mutated once built: [`Network::contract`] returns a new
/// state and leaves the parent untouched, so branches can be explored in any
/// order. Live tensors are shared between parent and children.
#[derive(Debug, Clone)]
pub struct Network {
    tensors: Vec<Arc<Tensor>>,
    /// SSA id of each live tensor.
    ids: Vec<usize>,
    inputs: usize,
    model: CostModel,
    cpu: Scalar,
    step_cpu: Vec<Scalar>,
    /// `None` where a contraction's peak memory is undefined.
    snapshots: Vec<Option<Scalar>>,
    consumed: BTreeSet<Leg>,
    history: LegPath,
    ssa_path: SimplePath,
}

impl Network {
    /// Creates the initial state of a search over `tensors`. Nothing is
    /// consumed yet and the only memory snapshot holds all inputs.
    ///
    /// # Examples
    /// ```
    /// # use tnorder::tensornetwork::network::Network;
    /// # use tnorder::tensornetwork::tensor::Tensor;
    /// # use tnorder::contractionpath::contraction_cost::CostModel;
    /// # use tnorder::scalar::Scalar;
    /// let a = Tensor::concrete("A", &[2, 3], &[0, -1]).unwrap();
    /// let b = Tensor::concrete("B", &[2, 4], &[0, -2]).unwrap();
    /// let network = Network::new(vec![a, b], CostModel::default());
    /// assert_eq!(network.cpu(), &Scalar::zero());
    /// assert_eq!(network.snapshots(), &[Some(Scalar::from(14u64))]);
    /// ```
    pub fn new(tensors: Vec<Tensor>, model: CostModel) -> Self {
        let snapshots = vec![Some(tensors.iter().map(Tensor::size).sum())];
        let inputs = tensors.len();
        Self {
            tensors: tensors.into_iter().map(Arc::new).collect(),
            ids: (0..inputs).collect(),
            inputs,
            model,
            cpu: Scalar::zero(),
            step_cpu: Vec::new(),
            snapshots,
            consumed: BTreeSet::new(),
            history: Vec::new(),
            ssa_path: Vec::new(),
        }
    }

    /// Number of live tensors.
    #[inline]
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Live tensors, inputs first in their original order, contraction results
    /// appended in the order they were created.
    pub fn tensors(&self) -> impl Iterator<Item = &Tensor> + '_ {
        self.tensors.iter().map(AsRef::as_ref)
    }

    #[inline]
    pub fn tensor(&self, index: TensorIndex) -> Option<&Tensor> {
        self.tensors.get(index).map(AsRef::as_ref)
    }

    #[inline]
    pub fn model(&self) -> CostModel {
        self.model
    }

    /// Number of input tensors the search started from.
    #[inline]
    pub fn inputs(&self) -> usize {
        self.inputs
    }

    /// Total cpu cost of all contractions so far.
    #[inline]
    pub fn cpu(&self) -> &Scalar {
        &self.cpu
    }

    /// Cpu cost of each contraction so far.
    #[inline]
    pub fn step_cpu(&self) -> &[Scalar] {
        &self.step_cpu
    }

    /// Memory snapshots: the initial one followed by one per contraction.
    #[inline]
    pub fn snapshots(&self) -> &[Option<Scalar>] {
        &self.snapshots
    }

    /// Snapshots summarized with the accounting of the cost model. `None` if a
    /// snapshot is undefined or a peak of incomparable symbolic snapshots is
    /// asked for.
    pub fn mem(&self) -> Option<Scalar> {
        self.model.accounting.summarize(&self.snapshots)
    }

    /// The cumulative cost used for dominance checks.
    pub fn cost(&self) -> CostPair {
        CostPair::new(self.cpu.clone(), self.mem())
    }

    /// Internal legs contracted so far. Two states with the same consumed legs
    /// hold the same tensors up to contraction order.
    #[inline]
    pub fn consumed(&self) -> &BTreeSet<Leg> {
        &self.consumed
    }

    /// The legs summed over in each contraction so far.
    #[inline]
    pub fn history(&self) -> &LegPath {
        &self.history
    }

    /// The contractions so far as tensor pairs in SSA format.
    #[inline]
    pub fn ssa_path(&self) -> &SimplePath {
        &self.ssa_path
    }

    /// The contractions so far as tensor pairs in ReplaceLeft format, indexing
    /// the input tensors.
    pub fn replace_path(&self) -> SimplePath {
        ssa_replace_ordering(&self.ssa_path, self.inputs)
    }

    /// A state is terminal once a single tensor without internal legs is left.
    pub fn is_terminal(&self) -> bool {
        match self.tensors.as_slice() {
            [tensor] => !tensor.legs().iter().any(|&leg| is_internal(leg)),
            _ => false,
        }
    }

    /// The final tensor of a terminal state.
    pub fn result(&self) -> Option<&Tensor> {
        self.is_terminal().then(|| self.tensors[0].as_ref())
    }

    /// Contracts the live tensors `i` and `j` over all their common legs.
    pub fn contract(&self, i: TensorIndex, j: TensorIndex) -> Result<Self, OrderError> {
        self.contract_over(i, j, &[])
    }

    /// Contracts the live tensors `i` and `j` over `legs`, or over all common
    /// legs if `legs` is empty, and returns the new state. Both operands are
    /// removed and the result is appended as the last live tensor.
    ///
    /// # Examples
    /// ```
    /// # use tnorder::tensornetwork::network::Network;
    /// # use tnorder::tensornetwork::tensor::Tensor;
    /// # use tnorder::contractionpath::contraction_cost::CostModel;
    /// # use tnorder::scalar::Scalar;
    /// let a = Tensor::concrete("A", &[2, 3], &[0, 1]).unwrap();
    /// let b = Tensor::concrete("B", &[2, 3], &[0, 2]).unwrap();
    /// let c = Tensor::concrete("C", &[3, 3], &[1, 2]).unwrap();
    /// let network = Network::new(vec![a, b, c], CostModel::default());
    /// let child = network.contract_over(0, 1, &[0]).unwrap();
    /// assert_eq!(network.len(), 3);
    /// assert_eq!(child.len(), 2);
    /// assert_eq!(child.tensor(1).unwrap().name(), "[A-B]");
    /// assert_eq!(child.history(), &vec![vec![0]]);
    /// assert_eq!(child.cpu(), &Scalar::from(18u64));
    /// ```
    pub fn contract_over(
        &self,
        i: TensorIndex,
        j: TensorIndex,
        legs: &[Leg],
    ) -> Result<Self, OrderError> {
        let len = self.tensors.len();
        for index in [i, j] {
            if index >= len {
                return Err(OrderError::InvalidTensorIndex { index, len });
            }
        }
        if i == j {
            return Err(OrderError::NoCommonLeg {
                first: self.tensors[i].name().to_string(),
                second: self.tensors[j].name().to_string(),
            });
        }

        let contraction = contract(&self.tensors[i], &self.tensors[j], legs, self.model.memory)?;
        let others = self
            .tensors
            .iter()
            .enumerate()
            .filter(|(k, _)| *k != i && *k != j)
            .map(|(_, tensor)| tensor.size())
            .sum::<Scalar>();

        let mut tensors = Vec::with_capacity(len - 1);
        let mut ids = Vec::with_capacity(len - 1);
        for (k, (tensor, id)) in self.tensors.iter().zip(&self.ids).enumerate() {
            if k != i && k != j {
                tensors.push(Arc::clone(tensor));
                ids.push(*id);
            }
        }
        tensors.push(Arc::new(contraction.tensor));
        ids.push(self.inputs + self.ssa_path.len());

        let mut step_cpu = self.step_cpu.clone();
        step_cpu.push(contraction.cpu.clone());
        let mut snapshots = self.snapshots.clone();
        snapshots.push(contraction.mem.map(|mem| &others + &mem));
        let mut consumed = self.consumed.clone();
        consumed.extend(contraction.legs.iter().copied());
        let mut history = self.history.clone();
        history.push(contraction.legs);
        let mut ssa_path = self.ssa_path.clone();
        ssa_path.push((self.ids[i], self.ids[j]));

        Ok(Self {
            tensors,
            ids,
            inputs: self.inputs,
            model: self.model,
            cpu: &self.cpu + &contraction.cpu,
            step_cpu,
            snapshots,
            consumed,
            history,
            ssa_path,
        })
    }

    /// Pairs `(i, j)` with `i < j` of live tensors sharing at least one leg.
    pub fn candidate_pairs(&self) -> impl Iterator<Item = (TensorIndex, TensorIndex)> + '_ {
        (0..self.tensors.len())
            .tuple_combinations()
            .filter(|&(i, j)| self.tensors[i].has_common_legs(&self.tensors[j]))
    }

    /// All states reachable by one contraction of two connected tensors.
    pub fn children(&self) -> impl Iterator<Item = Result<Self, OrderError>> + '_ {
        self.candidate_pairs().map(|(i, j)| self.contract(i, j))
    }

    /// Returns whether both states consumed the same legs, hold the same live
    /// tensors and have identical costs.
    pub fn is_duplicate_of(&self, other: &Self) -> bool {
        self.consumed == other.consumed
            && self.cpu == other.cpu
            && self.mem() == other.mem()
            && self
                .tensors()
                .map(Tensor::name)
                .sorted_unstable()
                .eq(other.tensors().map(Tensor::name).sorted_unstable())
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.tensors().join(", "), self.cost())
    }
}
