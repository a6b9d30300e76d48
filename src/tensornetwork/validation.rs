//! Checks on the leg structure of a network, shared by both search drivers.

use std::collections::BTreeMap;

use itertools::Itertools;
use rustc_hash::FxHashMap;

use crate::{
    error::ValidationError,
    tensornetwork::tensor::{is_internal, Leg, Tensor, TensorIndex},
    utils::union_find::ComponentSet,
};

/// Occurrences of each leg as `(tensor, position)` pairs, ordered by leg.
fn leg_occurrences(tensors: &[Tensor]) -> BTreeMap<Leg, Vec<(TensorIndex, usize)>> {
    let mut occurrences = BTreeMap::<Leg, Vec<_>>::new();
    for (t, tensor) in tensors.iter().enumerate() {
        for (position, &leg) in tensor.legs().iter().enumerate() {
            occurrences.entry(leg).or_default().push((t, position));
        }
    }
    occurrences
}

/// Validates the leg structure of a network:
/// - no tensor carries the same leg twice,
/// - every internal leg is carried by exactly two tensors,
/// - every open leg is carried by exactly one tensor,
/// - open legs are numbered `-1..-k` without gaps.
///
/// Validating an already valid network again always succeeds.
///
/// # Examples
/// ```
/// # use tnorder::tensornetwork::tensor::Tensor;
/// # use tnorder::tensornetwork::validation::validate_network;
/// let a = Tensor::concrete("A", &[2, 3], &[0, -1]).unwrap();
/// let b = Tensor::concrete("B", &[2, 4], &[0, -2]).unwrap();
/// assert!(validate_network(&[a.clone(), b]).is_ok());
/// assert!(validate_network(&[a]).is_err());
/// ```
pub fn validate_network(tensors: &[Tensor]) -> Result<(), ValidationError> {
    for tensor in tensors {
        if let Some(leg) = tensor.legs().iter().duplicates().next() {
            return Err(ValidationError::SelfTrace {
                name: tensor.name().to_string(),
                leg: *leg,
            });
        }
    }

    let occurrences = leg_occurrences(tensors);
    let mut open_legs = Vec::new();
    for (&leg, places) in &occurrences {
        let expected = if is_internal(leg) { 2 } else { 1 };
        if places.len() != expected {
            return Err(ValidationError::LegMultiplicity {
                leg,
                count: places.len(),
                expected,
            });
        }
        if !is_internal(leg) {
            open_legs.push(leg);
        }
    }

    // `occurrences` is ordered, so open legs run from the most negative up to -1
    let expected = open_legs.len();
    let contiguous = open_legs
        .iter()
        .rev()
        .zip(1..)
        .all(|(&leg, k): (&Leg, Leg)| leg == -k);
    if !contiguous {
        return Err(ValidationError::OpenLegNumbering {
            expected,
            found: open_legs,
        });
    }
    Ok(())
}

/// Checks that both ends of every shared leg carry the same dimension.
///
/// Contraction costs only look at the first operand's dimensions, so searches
/// work without this check. Code emission needs it.
///
/// # Examples
/// ```
/// # use tnorder::tensornetwork::tensor::Tensor;
/// # use tnorder::tensornetwork::validation::validate_dimensions;
/// let a = Tensor::concrete("A", &[2, 3], &[0, -1]).unwrap();
/// let b = Tensor::concrete("B", &[5, 4], &[0, -2]).unwrap();
/// assert!(validate_dimensions(&[a, b]).is_err());
/// ```
pub fn validate_dimensions(tensors: &[Tensor]) -> Result<(), ValidationError> {
    for (&leg, places) in &leg_occurrences(tensors) {
        for ((t1, p1), (t2, p2)) in places.iter().copied().tuple_windows() {
            let (first, second) = (&tensors[t1].shape()[p1], &tensors[t2].shape()[p2]);
            if first != second {
                return Err(ValidationError::DimensionMismatch {
                    leg,
                    first_tensor: tensors[t1].name().to_string(),
                    first: first.to_string(),
                    second_tensor: tensors[t2].name().to_string(),
                    second: second.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Sorted internal legs of the network.
pub fn internal_legs(tensors: &[Tensor]) -> Vec<Leg> {
    tensors
        .iter()
        .flat_map(|tensor| tensor.legs().iter().copied())
        .filter(|&leg| is_internal(leg))
        .sorted_unstable()
        .dedup()
        .collect()
}

/// Validates the network and additionally requires the internal legs to be
/// numbered `0..n-1`, as needed to index states by a leg bitmask.
pub fn validate_normalized(tensors: &[Tensor]) -> Result<(), ValidationError> {
    validate_network(tensors)?;
    let internal = internal_legs(tensors);
    if internal.iter().zip(0..).any(|(&leg, i): (&Leg, Leg)| leg != i) {
        return Err(ValidationError::InternalLegNumbering {
            expected: internal.len(),
            found: internal,
        });
    }
    Ok(())
}

/// Renumbers internal legs to `0..n-1` in order of first appearance, keeping
/// open legs untouched. Returns the renamed tensors and the map from old to
/// new labels.
///
/// # Examples
/// ```
/// # use tnorder::tensornetwork::tensor::Tensor;
/// # use tnorder::tensornetwork::validation::{normalize_legs, validate_normalized};
/// let a = Tensor::concrete("A", &[2, 3], &[7, 42]).unwrap();
/// let b = Tensor::concrete("B", &[3, 2], &[42, 7]).unwrap();
/// let (tensors, mapping) = normalize_legs(&[a, b]);
/// assert_eq!(tensors[1].legs(), &[1, 0]);
/// assert_eq!(mapping[&42], 1);
/// assert!(validate_normalized(&tensors).is_ok());
/// ```
pub fn normalize_legs(tensors: &[Tensor]) -> (Vec<Tensor>, FxHashMap<Leg, Leg>) {
    let mut mapping = FxHashMap::default();
    for leg in tensors.iter().flat_map(|tensor| tensor.legs().iter().copied()) {
        if is_internal(leg) {
            let next = mapping.len() as Leg;
            mapping.entry(leg).or_insert(next);
        }
    }
    let renamed = tensors
        .iter()
        .map(|tensor| {
            let legs = tensor
                .legs()
                .iter()
                .map(|leg| *mapping.get(leg).unwrap_or(leg))
                .collect();
            Tensor::from_parts(tensor.name().to_string(), tensor.shape().to_vec(), legs)
        })
        .collect();
    (renamed, mapping)
}

/// Number of connected components of the network, where two tensors are
/// connected if they share a leg.
pub fn count_components(tensors: &[Tensor]) -> usize {
    let mut components = ComponentSet::new(tensors.len());
    for places in leg_occurrences(tensors).values() {
        for ((t1, _), (t2, _)) in places.iter().tuple_windows() {
            components.union(*t1, *t2);
        }
    }
    components.count()
}
