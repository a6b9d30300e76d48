//! Partial order on the cumulative `(cpu, mem)` cost of contraction sequences.

use std::{cmp::Ordering, fmt};

use serde::Serialize;

use crate::scalar::Scalar;

/// Cumulative cost of a (partial) contraction sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CostPair {
    pub cpu: Scalar,
    /// Summarized memory. `None` if the peak of symbolic snapshots is undefined.
    pub mem: Option<Scalar>,
}

/// Outcome of comparing two cost pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dominance {
    /// Never worse and strictly better in at least one component.
    Dominates,
    DominatedBy,
    /// Both components are equal.
    Equal,
    /// Each is better in one component, or a symbolic value is involved.
    Incomparable,
}

impl CostPair {
    pub fn new(cpu: Scalar, mem: Option<Scalar>) -> Self {
        Self { cpu, mem }
    }

    /// Returns whether both components are concrete.
    pub fn is_concrete(&self) -> bool {
        self.cpu.is_concrete() && self.mem.as_ref().is_some_and(Scalar::is_concrete)
    }

    /// Compares two cost pairs. Any symbolic or undefined component makes the
    /// pair incomparable, even against a structurally identical pair.
    ///
    /// # Examples
    /// ```
    /// # use tnorder::contractionpath::dominance::{CostPair, Dominance};
    /// # use tnorder::scalar::Scalar;
    /// let a = CostPair::new(Scalar::from(10u64), Some(Scalar::from(5u64)));
    /// let b = CostPair::new(Scalar::from(12u64), Some(Scalar::from(5u64)));
    /// let c = CostPair::new(Scalar::from(8u64), Some(Scalar::from(7u64)));
    /// assert_eq!(a.compare(&b), Dominance::Dominates);
    /// assert_eq!(b.compare(&a), Dominance::DominatedBy);
    /// assert_eq!(a.compare(&c), Dominance::Incomparable);
    /// ```
    pub fn compare(&self, other: &Self) -> Dominance {
        let (Some(cpu1), Some(cpu2)) = (self.cpu.as_concrete(), other.cpu.as_concrete()) else {
            return Dominance::Incomparable;
        };
        let (Some(mem1), Some(mem2)) = (
            self.mem.as_ref().and_then(Scalar::as_concrete),
            other.mem.as_ref().and_then(Scalar::as_concrete),
        ) else {
            return Dominance::Incomparable;
        };

        match (cpu1.cmp(&cpu2), mem1.cmp(&mem2)) {
            (Ordering::Equal, Ordering::Equal) => Dominance::Equal,
            (Ordering::Less | Ordering::Equal, Ordering::Less | Ordering::Equal) => {
                Dominance::Dominates
            }
            (Ordering::Greater | Ordering::Equal, Ordering::Greater | Ordering::Equal) => {
                Dominance::DominatedBy
            }
            _ => Dominance::Incomparable,
        }
    }

    /// Strict dominance `self ≺ other`.
    #[inline]
    pub fn dominates(&self, other: &Self) -> bool {
        self.compare(other) == Dominance::Dominates
    }

    /// Returns whether `self` dominates or equals `other`.
    #[inline]
    pub fn covers(&self, other: &Self) -> bool {
        matches!(
            self.compare(other),
            Dominance::Dominates | Dominance::Equal
        )
    }

    /// Lexicographic `(cpu, mem)` order for concrete pairs, `None` otherwise.
    pub fn lexicographic_cmp(&self, other: &Self) -> Option<Ordering> {
        let cpu = self.cpu.as_concrete()?.cmp(other.cpu.as_concrete()?);
        let mem1 = self.mem.as_ref()?.as_concrete()?;
        let mem2 = other.mem.as_ref()?.as_concrete()?;
        Some(cpu.then(mem1.cmp(&mem2)))
    }
}

impl fmt::Display for CostPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.mem {
            Some(mem) => write!(f, "(cpu: {}, mem: {})", self.cpu, mem),
            None => write!(f, "(cpu: {}, mem: undefined)", self.cpu),
        }
    }
}
