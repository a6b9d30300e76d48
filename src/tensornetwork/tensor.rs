use std::{
    fmt,
    ops::{BitAnd, Index},
};

use serde::{Deserialize, Serialize};

use crate::{error::ValidationError, scalar::Scalar};

/// Label of a tensor index. Non-negative legs are internal and shared by
/// exactly two tensors, negative legs are open and numbered `-1, -2, ..`.
pub type Leg = i32;

/// Position of a tensor within a list of live tensors.
pub type TensorIndex = usize;

/// Returns whether `leg` is an internal (to be contracted) leg.
#[inline]
pub fn is_internal(leg: Leg) -> bool {
    leg >= 0
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawTensor", into = "RawTensor")]
/// Abstract representation of a tensor: a name, a shape and one leg label per
/// dimension. Tensors are immutable, contracting two of them creates a new one.
pub struct Tensor {
    name: String,
    shape: Vec<Scalar>,
    legs: Vec<Leg>,
    size: Scalar,
}

impl Tensor {
    /// Constructs a Tensor object.
    ///
    /// # Examples
    /// ```
    /// # use tnorder::tensornetwork::tensor::Tensor;
    /// # use tnorder::scalar::Scalar;
    /// let tensor = Tensor::new("T", vec![10u64.into(), 10u64.into(), 9u64.into()], vec![0, 1, 2]).unwrap();
    /// assert_eq!(tensor.size(), &Scalar::from(900u64));
    /// assert!(Tensor::new("T", vec![10u64.into()], vec![0, 1]).is_err());
    /// ```
    pub fn new(
        name: impl Into<String>,
        shape: Vec<Scalar>,
        legs: Vec<Leg>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if shape.len() != legs.len() {
            return Err(ValidationError::ShapeLegLengthMismatch {
                name,
                shape: shape.len(),
                legs: legs.len(),
            });
        }
        if let Some(zero) = shape.iter().find(|dim| dim.is_zero()) {
            return Err(ValidationError::InvalidDimension {
                name,
                dimension: zero.to_string(),
                reason: "dimensions must be positive".to_string(),
            });
        }
        let size = shape.iter().product();
        Ok(Self {
            name,
            shape,
            legs,
            size,
        })
    }

    /// Constructs a tensor with concrete dimensions.
    ///
    /// # Examples
    /// ```
    /// # use tnorder::tensornetwork::tensor::Tensor;
    /// let tensor = Tensor::concrete("C", &[100, 100], &[1, 0]).unwrap();
    /// assert_eq!(tensor.legs(), &[1, 0]);
    /// ```
    pub fn concrete(name: &str, shape: &[u64], legs: &[Leg]) -> Result<Self, ValidationError> {
        Self::new(
            name,
            shape.iter().map(|&dim| Scalar::from(dim)).collect(),
            legs.to_vec(),
        )
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn shape(&self) -> &[Scalar] {
        &self.shape
    }

    #[inline]
    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    /// Number of dimensions.
    #[inline]
    pub fn ndim(&self) -> usize {
        self.legs.len()
    }

    /// Number of elements, the product of all dimensions.
    #[inline]
    pub fn size(&self) -> &Scalar {
        &self.size
    }

    /// Returns `true` if every dimension is a concrete integer.
    pub fn is_concrete(&self) -> bool {
        self.shape.iter().all(Scalar::is_concrete)
    }

    /// Position of `leg` in this tensor.
    #[inline]
    pub fn position(&self, leg: Leg) -> Option<usize> {
        self.legs.iter().position(|&l| l == leg)
    }

    /// Dimension of `leg`, if the tensor carries it.
    pub fn dimension(&self, leg: Leg) -> Option<&Scalar> {
        self.position(leg).map(|i| &self.shape[i])
    }

    /// Iterator over `(leg, dimension)` pairs.
    pub fn edges(&self) -> impl Iterator<Item = (Leg, &Scalar)> + '_ {
        self.legs.iter().copied().zip(self.shape.iter())
    }

    /// Legs shared with `other`, in the order they appear in `self`.
    ///
    /// # Examples
    /// ```
    /// # use tnorder::tensornetwork::tensor::Tensor;
    /// let a = Tensor::concrete("A", &[2, 3, 4], &[0, 1, 2]).unwrap();
    /// let b = Tensor::concrete("B", &[4, 5, 2], &[2, 3, 0]).unwrap();
    /// assert_eq!(a.common_legs(&b), vec![0, 2]);
    /// assert_eq!(&a & &b, vec![0, 2]);
    /// ```
    pub fn common_legs(&self, other: &Tensor) -> Vec<Leg> {
        self.legs
            .iter()
            .copied()
            .filter(|leg| other.legs.contains(leg))
            .collect()
    }

    /// Returns whether the two tensors share at least one leg.
    #[inline]
    pub fn has_common_legs(&self, other: &Tensor) -> bool {
        self.legs.iter().any(|leg| other.legs.contains(leg))
    }

    /// Name stripped of every character that is not valid in an identifier.
    ///
    /// # Examples
    /// ```
    /// # use tnorder::tensornetwork::tensor::Tensor;
    /// let tensor = Tensor::concrete("[C-T_2]", &[2], &[-1]).unwrap();
    /// assert_eq!(tensor.raw_name(), "CT_2");
    /// ```
    pub fn raw_name(&self) -> String {
        self.name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect()
    }

    /// Keeps the dimensions whose leg is not in `removed`, in order.
    pub(crate) fn remaining_edges<'a>(
        &'a self,
        removed: &'a [Leg],
    ) -> impl Iterator<Item = (Leg, &'a Scalar)> + 'a {
        self.edges().filter(move |(leg, _)| !removed.contains(leg))
    }

    /// Constructs the result of a contraction from already checked parts.
    pub(crate) fn from_parts(name: String, shape: Vec<Scalar>, legs: Vec<Leg>) -> Self {
        debug_assert_eq!(shape.len(), legs.len());
        let size = shape.iter().product();
        Self {
            name,
            shape,
            legs,
            size,
        }
    }
}

/// Shared legs, see [`Tensor::common_legs`].
impl BitAnd for &Tensor {
    type Output = Vec<Leg>;

    #[inline]
    fn bitand(self, rhs: &Tensor) -> Self::Output {
        self.common_legs(rhs)
    }
}

/// Implementation of printing for Tensor. Prints the name only.
impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Implementation of indexing for Tensor, returning the leg at a position.
impl Index<usize> for Tensor {
    type Output = Leg;

    fn index(&self, index: usize) -> &Self::Output {
        &self.legs[index]
    }
}

/// Serialized form of a tensor, also the JSON input format. Dimensions are
/// either integers or expressions such as `"chi"` or `"D^2"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RawTensor {
    pub(crate) name: String,
    pub(crate) legs: Vec<Leg>,
    pub(crate) shape: Vec<Scalar>,
}

impl TryFrom<RawTensor> for Tensor {
    type Error = ValidationError;

    fn try_from(raw: RawTensor) -> Result<Self, Self::Error> {
        Tensor::new(raw.name, raw.shape, raw.legs)
    }
}

impl From<Tensor> for RawTensor {
    fn from(tensor: Tensor) -> Self {
        Self {
            name: tensor.name,
            legs: tensor.legs,
            shape: tensor.shape,
        }
    }
}
