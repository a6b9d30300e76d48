//! Renders a contraction sequence as numpy statements.

use itertools::Itertools;
use rustc_hash::FxHashSet;

use crate::{
    contractionpath::{contraction_cost::CostModel, replay::locate},
    error::OrderError,
    scalar::Scalar,
    tensornetwork::{
        network::Network,
        tensor::{Leg, Tensor},
        validation::{validate_dimensions, validate_network},
    },
};

/// Python tuple literal.
fn tuple<T: ToString>(items: impl IntoIterator<Item = T>) -> String {
    let items = items.into_iter().map(|item| item.to_string()).collect_vec();
    match items.as_slice() {
        [single] => format!("({single},)"),
        _ => format!("({})", items.join(", ")),
    }
}

fn volume(tensor: &Tensor, axes: &[usize]) -> Scalar {
    axes.iter().map(|&axis| &tensor.shape()[axis]).product()
}

struct Emitter {
    lines: Vec<String>,
    /// Variables holding intermediates or transposed copies.
    temporaries: FxHashSet<String>,
}

impl Emitter {
    /// Brings `tensor` into matrix form with `rows` axes first and `columns`
    /// axes last. An empty group is dropped, giving a vector. Returns the
    /// expression to use and the variable to delete after the contraction.
    fn as_matrix(
        &mut self,
        tensor: &Tensor,
        rows: &[usize],
        columns: &[usize],
    ) -> (String, Option<String>) {
        let name = tensor.raw_name();
        let temporary = self.temporaries.contains(&name);
        let order = rows.iter().chain(columns).copied().collect_vec();
        let groups = [rows, columns]
            .into_iter()
            .filter(|axes| !axes.is_empty())
            .map(|axes| volume(tensor, axes))
            .collect_vec();
        let shape = tuple(&groups);

        let expression = if order.iter().copied().eq(0..order.len()) {
            if tensor.ndim() == groups.len() {
                name.clone()
            } else {
                format!("{name}.reshape{shape}")
            }
        } else if tensor.ndim() == 2 && groups.len() == 2 {
            format!("{name}.T")
        } else {
            let target = if temporary {
                name.clone()
            } else {
                format!("{name}_")
            };
            self.lines.push(format!(
                "{target} = {name}.transpose{}.reshape{shape}",
                tuple(&order)
            ));
            self.temporaries.insert(target.clone());
            return (target.clone(), Some(target));
        };
        (expression, temporary.then_some(name))
    }
}

/// Renders the contraction of `tensors` along `history` (leg sets, see
/// [`replay`](crate::contractionpath::replay::replay)) as numpy code.
///
/// The code expects the inputs as arrays named after the tensors, stripped of
/// characters not allowed in identifiers. Every free symbol that is a bare
/// dimension of some input is read from that input's shape first. Each step
/// reshapes both operands to matrices, multiplies them with `np.dot` and
/// deletes intermediates that are no longer needed. Inputs are never deleted.
/// Finally the result axes are sorted by the absolute value of their legs.
///
/// # Examples
/// ```
/// # use tnorder::tensornetwork::tensor::Tensor;
/// # use tnorder::contractionpath::contraction_cost::CostModel;
/// # use tnorder::codegen::emit_numpy;
/// let a = Tensor::concrete("A", &[2, 3], &[0, -1]).unwrap();
/// let b = Tensor::concrete("B", &[2, 4], &[0, -2]).unwrap();
/// let code = emit_numpy(&[a, b], &[vec![0]], CostModel::default()).unwrap();
/// assert!(code.contains("AB = np.dot(A.T, B).reshape(3, 4)"));
/// ```
pub fn emit_numpy(
    tensors: &[Tensor],
    history: &[Vec<Leg>],
    model: CostModel,
) -> Result<String, OrderError> {
    validate_network(tensors)?;
    validate_dimensions(tensors)?;

    let mut emitter = Emitter {
        lines: Vec::new(),
        temporaries: FxHashSet::default(),
    };
    emitter.lines.push(format!(
        "# contraction of {}",
        tensors.iter().map(Tensor::name).join(", ")
    ));

    let mut defined: FxHashSet<String> = FxHashSet::default();
    for tensor in tensors {
        for (axis, dim) in tensor.shape().iter().enumerate() {
            if let Some(symbol) = dim.as_bare_symbol() {
                if !defined.contains(&symbol) {
                    emitter
                        .lines
                        .push(format!("{symbol} = {}.shape[{axis}]", tensor.raw_name()));
                    defined.insert(symbol);
                }
            }
        }
    }
    let undefined = tensors
        .iter()
        .flat_map(|tensor| tensor.shape().iter().flat_map(Scalar::symbols))
        .filter(|symbol| !defined.contains(symbol))
        .sorted_unstable()
        .dedup()
        .collect_vec();
    if !undefined.is_empty() {
        emitter
            .lines
            .push(format!("# define {} before running", undefined.join(", ")));
    }

    let mut network = Network::new(tensors.to_vec(), model);
    for (step, legs) in history.iter().enumerate() {
        let Some(&leg) = legs.first() else {
            return Err(OrderError::EmptyStep { step });
        };
        let (i, j) = locate(&network, leg)?;
        let next = network.contract_over(i, j, legs)?;
        let (Some(a), Some(b)) = (network.tensor(i), network.tensor(j)) else {
            return Err(OrderError::LegNotFound { leg });
        };

        let summed_a = legs.iter().filter_map(|&leg| a.position(leg)).collect_vec();
        let summed_b = legs.iter().filter_map(|&leg| b.position(leg)).collect_vec();
        let free_a = (0..a.ndim()).filter(|k| !summed_a.contains(k)).collect_vec();
        let free_b = (0..b.ndim()).filter(|k| !summed_b.contains(k)).collect_vec();

        let (left, delete_a) = emitter.as_matrix(a, &free_a, &summed_a);
        let (right, delete_b) = emitter.as_matrix(b, &summed_b, &free_b);
        let Some(result) = next.tensor(next.len() - 1) else {
            return Err(OrderError::LegNotFound { leg });
        };
        let reshape = if result.ndim() > 1 {
            format!(".reshape{}", tuple(result.shape()))
        } else {
            String::new()
        };
        let name = result.raw_name();
        emitter
            .lines
            .push(format!("{name} = np.dot({left}, {right}){reshape}"));
        let delete = delete_a.into_iter().chain(delete_b).collect_vec();
        if !delete.is_empty() {
            emitter.lines.push(format!("del {}", delete.join(", ")));
        }
        for variable in &delete {
            emitter.temporaries.remove(variable);
        }
        emitter.temporaries.insert(name);
        network = next;
    }

    let Some(result) = network.result() else {
        return Err(OrderError::IncompleteContraction {
            remaining: network.len(),
        });
    };
    let order = (0..result.ndim())
        .sorted_by_key(|&axis| result.legs()[axis].unsigned_abs())
        .collect_vec();
    if !order.iter().copied().eq(0..order.len()) {
        let name = result.raw_name();
        emitter
            .lines
            .push(format!("{name} = {name}.transpose{}.copy()", tuple(&order)));
    }

    emitter.lines.push(String::new());
    emitter.lines.push(format!("# result: {}", result.name()));
    emitter.lines.push(format!("# total cpu: {}", network.cpu()));
    emitter.lines.push(format!(
        "# mem by step: [{}]",
        network
            .snapshots()
            .iter()
            .map(|snapshot| {
                snapshot
                    .as_ref()
                    .map_or_else(|| "-".to_string(), ToString::to_string)
            })
            .join(", ")
    ));
    Ok(emitter.lines.join("\n") + "\n")
}
