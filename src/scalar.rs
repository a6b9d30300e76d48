//! Dimension sizes and costs that are either exact integers or symbolic
//! polynomials in free dimension symbols (e.g. `chi`, `D`).
//!
//! Concrete values are arbitrary precision, so costs of large networks never
//! wrap or clamp. Symbolic values are [`symbolica`] atoms kept in expanded
//! form, so equal polynomials are structurally equal. They support addition
//! and multiplication but generally no ordering: [`Scalar::partial_cmp`] only
//! answers for two concrete values or for two identical expressions.

use std::{
    cmp::Ordering,
    fmt,
    iter::{Product, Sum},
    ops::{Add, AddAssign, Mul, MulAssign},
    str::FromStr,
};

use num_bigint::BigUint;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use symbolica::{
    atom::{Atom, AtomCore, AtomView},
    parse,
};
use thiserror::Error;

/// Largest power accepted in a dimension expression.
pub const MAX_EXPONENT: u32 = 64;

/// A dimension size or cost: a concrete integer or a symbolic polynomial.
///
/// A `Symbolic` value always contains at least one symbol. Arithmetic whose
/// result has no symbols left (multiplication by zero) collapses back to
/// `Concrete`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    Concrete(BigUint),
    Symbolic(Atom),
}

impl Scalar {
    #[inline]
    pub fn zero() -> Self {
        Scalar::Concrete(BigUint::default())
    }

    #[inline]
    pub fn one() -> Self {
        Scalar::Concrete(BigUint::from(1u32))
    }

    /// Creates a free symbol. Fails if `name` is not a plain identifier.
    pub fn symbol(name: &str) -> Result<Self, ParseScalarError> {
        let value: Scalar = name.parse()?;
        if value.as_bare_symbol().as_deref() == Some(name) {
            Ok(value)
        } else {
            Err(ParseScalarError {
                input: name.to_string(),
                reason: "not a symbol name".to_string(),
            })
        }
    }

    #[inline]
    pub fn is_concrete(&self) -> bool {
        matches!(self, Scalar::Concrete(_))
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        matches!(self, Scalar::Concrete(value) if value.bits() == 0)
    }

    #[inline]
    pub fn as_concrete(&self) -> Option<&BigUint> {
        match self {
            Scalar::Concrete(value) => Some(value),
            Scalar::Symbolic(_) => None,
        }
    }

    /// The symbol name if this value is exactly one free symbol.
    pub fn as_bare_symbol(&self) -> Option<String> {
        match self {
            Scalar::Symbolic(atom) => match atom.as_view() {
                view @ AtomView::Var(_) => Some(symbol_name(view)),
                _ => None,
            },
            Scalar::Concrete(_) => None,
        }
    }

    /// All free symbols occurring in this value, sorted.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols = Vec::new();
        if let Scalar::Symbolic(atom) = self {
            collect_symbols(atom.as_view(), &mut symbols);
        }
        symbols.sort_unstable();
        symbols.dedup();
        symbols
    }

    /// Maximum of two values, or `None` if they cannot be ordered.
    ///
    /// # Examples
    /// ```
    /// # use tnorder::scalar::Scalar;
    /// assert_eq!(Scalar::from(3u64).max_with(&Scalar::from(5u64)), Some(Scalar::from(5u64)));
    /// ```
    pub fn max_with(&self, other: &Self) -> Option<Self> {
        match self.partial_cmp(other)? {
            Ordering::Less => Some(other.clone()),
            Ordering::Equal | Ordering::Greater => Some(self.clone()),
        }
    }

    /// Maximum of all values. Returns `Some(0)` for no values and `None` if
    /// two of them cannot be ordered.
    ///
    /// # Examples
    /// ```
    /// # use tnorder::scalar::Scalar;
    /// let values = [Scalar::from(4u64), Scalar::from(9u64), Scalar::from(2u64)];
    /// assert_eq!(Scalar::peak(&values), Some(Scalar::from(9u64)));
    /// assert_eq!(Scalar::peak([]), Some(Scalar::zero()));
    /// ```
    pub fn peak<'a>(values: impl IntoIterator<Item = &'a Scalar>) -> Option<Scalar> {
        let mut values = values.into_iter();
        let Some(first) = values.next() else {
            return Some(Scalar::zero());
        };
        values.try_fold(first.clone(), |peak, value| peak.max_with(value))
    }

    fn to_atom(&self) -> Atom {
        match self {
            Scalar::Concrete(value) => integer_atom(value),
            Scalar::Symbolic(atom) => atom.clone(),
        }
    }

    /// Expands `atom` and turns it back into a concrete value if no symbol is
    /// left.
    fn from_atom(atom: Atom) -> Self {
        let atom = atom.expand();
        let numeric = matches!(atom.as_view(), AtomView::Num(_));
        if numeric {
            if let Ok(value) = atom.to_string().parse::<BigUint>() {
                return Scalar::Concrete(value);
            }
        }
        Scalar::Symbolic(atom)
    }
}

/// Builds the integer atom of `value` from its base `2^32` digits.
fn integer_atom(value: &BigUint) -> Atom {
    let base = Atom::new_num(1i64 << 32);
    value
        .to_u32_digits()
        .iter()
        .rev()
        .fold(Atom::new_num(0), |acc, &digit| {
            &(&acc * &base) + &Atom::new_num(i64::from(digit))
        })
}

/// Name of a variable without its namespace.
fn symbol_name(view: AtomView<'_>) -> String {
    let name = view.to_string();
    match name.rsplit_once("::") {
        Some((_, short)) => short.to_string(),
        None => name,
    }
}

fn collect_symbols(view: AtomView<'_>, symbols: &mut Vec<String>) {
    match view {
        AtomView::Var(_) => symbols.push(symbol_name(view)),
        AtomView::Add(add) => add.iter().for_each(|term| collect_symbols(term, symbols)),
        AtomView::Mul(mul) => mul.iter().for_each(|factor| collect_symbols(factor, symbols)),
        AtomView::Pow(pow) => {
            let (base, exp) = pow.get_base_exp();
            collect_symbols(base, symbols);
            collect_symbols(exp, symbols);
        }
        _ => {}
    }
}

impl Default for Scalar {
    fn default() -> Self {
        Scalar::zero()
    }
}

impl From<BigUint> for Scalar {
    fn from(value: BigUint) -> Self {
        Scalar::Concrete(value)
    }
}

impl From<u128> for Scalar {
    fn from(value: u128) -> Self {
        Scalar::Concrete(value.into())
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Scalar::Concrete(value.into())
    }
}

impl From<u32> for Scalar {
    fn from(value: u32) -> Self {
        Scalar::Concrete(value.into())
    }
}

impl PartialOrd for Scalar {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Scalar::Concrete(a), Scalar::Concrete(b)) => Some(a.cmp(b)),
            _ if self == other => Some(Ordering::Equal),
            _ => None,
        }
    }
}

impl Add for &Scalar {
    type Output = Scalar;

    fn add(self, rhs: &Scalar) -> Scalar {
        match (self, rhs) {
            (Scalar::Concrete(a), Scalar::Concrete(b)) => Scalar::Concrete(a + b),
            _ => Scalar::from_atom(&self.to_atom() + &rhs.to_atom()),
        }
    }
}

impl Add for Scalar {
    type Output = Scalar;

    #[inline]
    fn add(self, rhs: Scalar) -> Scalar {
        &self + &rhs
    }
}

impl AddAssign<&Scalar> for Scalar {
    #[inline]
    fn add_assign(&mut self, rhs: &Scalar) {
        *self = &*self + rhs;
    }
}

impl Mul for &Scalar {
    type Output = Scalar;

    fn mul(self, rhs: &Scalar) -> Scalar {
        match (self, rhs) {
            (Scalar::Concrete(a), Scalar::Concrete(b)) => Scalar::Concrete(a * b),
            _ => Scalar::from_atom(&self.to_atom() * &rhs.to_atom()),
        }
    }
}

impl Mul for Scalar {
    type Output = Scalar;

    #[inline]
    fn mul(self, rhs: Scalar) -> Scalar {
        &self * &rhs
    }
}

impl MulAssign<&Scalar> for Scalar {
    #[inline]
    fn mul_assign(&mut self, rhs: &Scalar) {
        *self = &*self * rhs;
    }
}

impl<'a> Sum<&'a Scalar> for Scalar {
    fn sum<I: Iterator<Item = &'a Scalar>>(iter: I) -> Self {
        iter.fold(Scalar::zero(), |acc, value| &acc + value)
    }
}

impl Sum for Scalar {
    fn sum<I: Iterator<Item = Scalar>>(iter: I) -> Self {
        iter.fold(Scalar::zero(), |acc, value| &acc + &value)
    }
}

impl<'a> Product<&'a Scalar> for Scalar {
    fn product<I: Iterator<Item = &'a Scalar>>(iter: I) -> Self {
        iter.fold(Scalar::one(), |acc, value| &acc * value)
    }
}

impl Product for Scalar {
    fn product<I: Iterator<Item = Scalar>>(iter: I) -> Self {
        iter.fold(Scalar::one(), |acc, value| &acc * &value)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Sum,
    Product,
    Power,
}

/// Writes `view` as a Python expression: `**` powers, coefficients first.
fn write_python(
    f: &mut fmt::Formatter<'_>,
    view: AtomView<'_>,
    outer: Precedence,
) -> fmt::Result {
    match view {
        AtomView::Add(add) => {
            let wrap = outer > Precedence::Sum;
            if wrap {
                write!(f, "(")?;
            }
            for (k, term) in add.iter().enumerate() {
                if k > 0 {
                    write!(f, " + ")?;
                }
                write_python(f, term, Precedence::Sum)?;
            }
            if wrap {
                write!(f, ")")?;
            }
            Ok(())
        }
        AtomView::Mul(mul) => {
            let wrap = outer > Precedence::Product;
            if wrap {
                write!(f, "(")?;
            }
            let (numbers, factors): (Vec<_>, Vec<_>) = mul
                .iter()
                .partition(|factor| matches!(factor, AtomView::Num(_)));
            for (k, factor) in numbers.into_iter().chain(factors).enumerate() {
                if k > 0 {
                    write!(f, "*")?;
                }
                write_python(f, factor, Precedence::Product)?;
            }
            if wrap {
                write!(f, ")")?;
            }
            Ok(())
        }
        AtomView::Pow(pow) => {
            let wrap = outer == Precedence::Power;
            if wrap {
                write!(f, "(")?;
            }
            let (base, exp) = pow.get_base_exp();
            write_python(f, base, Precedence::Power)?;
            write!(f, "**")?;
            write_python(f, exp, Precedence::Power)?;
            if wrap {
                write!(f, ")")?;
            }
            Ok(())
        }
        AtomView::Var(_) => write!(f, "{}", symbol_name(view)),
        _ => write!(f, "{view}"),
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Concrete(value) => write!(f, "{value}"),
            Scalar::Symbolic(atom) => write_python(f, atom.as_view(), Precedence::Sum),
        }
    }
}

/// Failure to parse a dimension expression.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot parse '{input}': {reason}")]
pub struct ParseScalarError {
    pub input: String,
    pub reason: String,
}

/// Every `^` must be followed by an integer literal in `1..=MAX_EXPONENT`.
fn check_exponents(input: &str) -> Result<(), String> {
    for rest in input.split('^').skip(1) {
        let digits: String = rest
            .trim_start()
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        match digits.parse::<u32>() {
            Ok(exponent) if (1..=MAX_EXPONENT).contains(&exponent) => {}
            _ => {
                return Err(format!(
                    "exponents must be integer literals between 1 and {MAX_EXPONENT}"
                ))
            }
        }
    }
    Ok(())
}

/// Accepts sums and products of non-negative integers, symbols and bounded
/// integer powers.
fn check_polynomial(view: AtomView<'_>) -> Result<(), String> {
    match view {
        AtomView::Num(_) => view
            .to_string()
            .parse::<BigUint>()
            .map(|_| ())
            .map_err(|_| format!("'{view}' is not a non-negative integer")),
        AtomView::Var(_) => Ok(()),
        AtomView::Add(add) => add.iter().try_for_each(check_polynomial),
        AtomView::Mul(mul) => mul.iter().try_for_each(check_polynomial),
        AtomView::Pow(pow) => {
            let (base, exp) = pow.get_base_exp();
            check_polynomial(base)?;
            match i64::try_from(exp) {
                Ok(exponent) if (1..=i64::from(MAX_EXPONENT)).contains(&exponent) => Ok(()),
                _ => Err(format!("'{exp}' is not a supported exponent")),
            }
        }
        _ => Err(format!("'{view}' is not a polynomial")),
    }
}

impl FromStr for Scalar {
    type Err = ParseScalarError;

    /// Parses expressions such as `100`, `chi`, `D^2`, `D**2`, `2*chi*D`
    /// or `(chi + 1)^2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let error = |reason: String| ParseScalarError {
            input: s.to_string(),
            reason,
        };
        if s.trim().is_empty() {
            return Err(error("empty expression".to_string()));
        }
        let normalized = s.replace("**", "^");
        check_exponents(&normalized).map_err(error)?;
        let atom = parse!(normalized.as_str()).map_err(|err| error(err.to_string()))?;
        check_polynomial(atom.as_view()).map_err(error)?;
        Ok(Scalar::from_atom(atom))
    }
}

/// Serialized as an integer when it fits, as an expression string otherwise.
impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_concrete().and_then(|value| u64::try_from(value).ok()) {
            Some(value) => serializer.serialize_u64(value),
            None => serializer.collect_str(self),
        }
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Integer(u64),
            Expression(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Integer(value) => Ok(Scalar::from(value)),
            Raw::Expression(expression) => expression.parse().map_err(de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(expression: &str) -> Scalar {
        expression.parse().unwrap()
    }

    #[test]
    fn test_concrete_arithmetic() {
        let a = Scalar::from(6u64);
        let b = Scalar::from(7u64);
        assert_eq!(&a * &b, Scalar::from(42u64));
        assert_eq!(&a + &b, Scalar::from(13u64));
        assert_eq!(a.partial_cmp(&b), Some(Ordering::Less));
    }

    #[test]
    fn test_concrete_is_exact() {
        let big = Scalar::from(u128::MAX);
        let doubled = &big * &Scalar::from(2u64);
        assert_eq!(doubled, Scalar::Concrete(BigUint::from(u128::MAX) * 2u32));
        assert_eq!(doubled.partial_cmp(&big), Some(Ordering::Greater));
        assert!(&big + &Scalar::one() > big);
    }

    #[test]
    fn test_mixed_arithmetic_keeps_large_coefficients() {
        let chi = Scalar::symbol("chi").unwrap();
        let big = Scalar::from(1u128 << 100);
        let product = &big * &chi;
        assert_eq!(&product + &product, &Scalar::from(1u128 << 101) * &chi);
        assert_eq!(product.symbols(), vec!["chi"]);
    }

    #[test]
    fn test_symbolic_products_are_canonical() {
        let chi = Scalar::symbol("chi").unwrap();
        let d = Scalar::symbol("D").unwrap();
        assert_eq!(&chi * &d, &d * &chi);
        assert_eq!(
            [chi.clone(), chi.clone(), d.clone()].iter().product::<Scalar>(),
            parsed("chi^2*D")
        );
    }

    #[test]
    fn test_symbolic_sums_collect_terms() {
        let chi = Scalar::symbol("chi").unwrap();
        let sum = &(&chi * &chi) + &(&chi * &chi);
        assert_eq!(sum, parsed("2*chi**2"));
        assert_eq!(sum.to_string(), "2*chi**2");
    }

    #[test]
    fn test_symbolic_is_not_ordered() {
        let chi = Scalar::symbol("chi").unwrap();
        let d = Scalar::symbol("D").unwrap();
        assert_eq!(chi.partial_cmp(&d), None);
        assert_eq!(chi.partial_cmp(&Scalar::one()), None);
        assert_eq!(chi.partial_cmp(&chi.clone()), Some(Ordering::Equal));
        assert!(!(chi < d) && !(d < chi));
        assert_eq!(chi.max_with(&Scalar::one()), None);
        assert_eq!(Scalar::peak([&chi, &chi]), Some(chi.clone()));
        assert_eq!(Scalar::peak([&chi, &d]), None);
    }

    #[test]
    fn test_multiplying_by_zero_collapses() {
        let chi = Scalar::symbol("chi").unwrap();
        let product = &chi * &Scalar::zero();
        assert!(product.is_zero());
        assert!(product.is_concrete());
    }

    #[test]
    fn test_parse() {
        assert_eq!(parsed("100"), Scalar::from(100u64));
        assert_eq!(parsed("4**2"), Scalar::from(16u64));
        assert_eq!(parsed("(chi + 1)^2"), parsed("chi^2 + 2*chi + 1"));
        assert_eq!(parsed("D ** 2"), parsed("D^2"));
        assert_eq!(parsed("D ** 2").as_bare_symbol(), None);
        assert_eq!(parsed("chi").as_bare_symbol().as_deref(), Some("chi"));
        assert_eq!(parsed("D^2").to_string(), "D**2");
        assert_eq!(
            parsed("340282366920938463463374607431768211456"),
            &Scalar::from(u128::MAX) + &Scalar::one()
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!("".parse::<Scalar>().is_err());
        assert!("chi +".parse::<Scalar>().is_err());
        assert!("(chi".parse::<Scalar>().is_err());
        assert!("chi - 1".parse::<Scalar>().is_err());
        assert!("-3".parse::<Scalar>().is_err());
        assert!("1/2".parse::<Scalar>().is_err());
        assert!("exp(chi)".parse::<Scalar>().is_err());
        assert!("chi^0".parse::<Scalar>().is_err());
        assert!("chi^(2)".parse::<Scalar>().is_err());
        assert!(Scalar::symbol("2*chi").is_err());
    }

    #[test]
    fn test_parse_rejects_huge_exponents() {
        let err = "chi^4000000000".parse::<Scalar>().unwrap_err();
        assert_eq!(err.input, "chi^4000000000");
        assert!("2**65".parse::<Scalar>().is_err());
        assert_eq!(parsed("2**64"), Scalar::from(1u128 << 64));
    }

    #[test]
    fn test_symbols() {
        assert_eq!(parsed("chi^2*D + D").symbols(), vec!["D", "chi"]);
        assert!(Scalar::from(5u64).symbols().is_empty());
    }

    #[test]
    fn test_serde() {
        let values: Vec<Scalar> = serde_json::from_str(r#"[16, "chi^2", "2*D"]"#).unwrap();
        assert_eq!(values[0], Scalar::from(16u64));
        assert_eq!(values[1], parsed("chi**2"));
        assert_eq!(serde_json::to_string(&values).unwrap(), r#"[16,"chi**2","2*D"]"#);
        assert!(serde_json::from_str::<Scalar>(r#""chi +""#).is_err());

        let big = Scalar::from(u128::MAX);
        let json = serde_json::to_string(&big).unwrap();
        assert_eq!(json, format!("\"{}\"", u128::MAX));
        assert_eq!(serde_json::from_str::<Scalar>(&json).unwrap(), big);
    }
}
