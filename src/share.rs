//! A player's share of a secret: a resolved field element plus the degree
//! bound of the polynomial it came from (SPEC_FULL.md §4.4).
//!
//! Grounded on the teacher's `mpc::share::ShamirShare<T>` (`degree` +
//! `value`, with `add`/`subtract`/`negate`/`add_const`/`subtract_const`/
//! `multiply_const` as local combinators and `multiply` left to the runtime
//! since it needs a network round). This spec drops the teacher's
//! continuation-passing `multiply` from `Share` entirely: a `Share` here
//! only ever holds an already-known value, and every protocol that needs a
//! network round (`mul`, `open`, `invert`, ...) lives on `PassiveRuntime` as
//! an `async fn` returning a fresh `Share` — the `.await` point on that call
//! *is* the suspension, so `Share` itself carries no pending state.

use crate::error::FieldError;
use crate::field::FieldElement;

/// A Shamir share: `value = f(x_local)` for some polynomial `f` of degree
/// at most `degree`, with `f(0)` the secret. Purely local combinators (add,
/// sub, negate, scale by a public constant) live here because they need no
/// network round: they just apply the same combinator to the underlying
/// polynomials, which is exactly the pointwise operation on the evaluations
/// callers already hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    degree: usize,
    value: FieldElement,
}

impl Share {
    pub fn new(degree: usize, value: FieldElement) -> Self {
        Self { degree, value }
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn value(&self) -> &FieldElement {
        &self.value
    }

    /// `f(x) + g(x)`: degree is the larger of the two, since the sum
    /// polynomial's coefficients above the smaller degree are just the
    /// larger polynomial's own coefficients.
    pub fn add(&self, other: &Self) -> Result<Self, FieldError> {
        Ok(Self {
            degree: self.degree.max(other.degree),
            value: self.value.checked_add(&other.value)?,
        })
    }

    pub fn sub(&self, other: &Self) -> Result<Self, FieldError> {
        Ok(Self {
            degree: self.degree.max(other.degree),
            value: self.value.checked_sub(&other.value)?,
        })
    }

    pub fn negate(&self) -> Self {
        Self {
            degree: self.degree,
            value: self.value.negate(),
        }
    }

    /// Adds a public constant: only the constant term of the polynomial
    /// changes, so the degree bound is untouched.
    pub fn add_const(&self, c: &FieldElement) -> Result<Self, FieldError> {
        Ok(Self {
            degree: self.degree,
            value: self.value.checked_add(c)?,
        })
    }

    pub fn sub_const(&self, c: &FieldElement) -> Result<Self, FieldError> {
        Ok(Self {
            degree: self.degree,
            value: self.value.checked_sub(c)?,
        })
    }

    /// Scales by a public constant: `c * f(x)` has the same degree as `f`.
    pub fn scalar_mul(&self, c: &FieldElement) -> Result<Self, FieldError> {
        Ok(Self {
            degree: self.degree,
            value: self.value.checked_mul(c)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;

    use crate::field::make_field;

    fn field() -> crate::field::Field {
        make_field(BigUint::from(1031u32)).unwrap()
    }

    #[test]
    fn add_takes_the_larger_degree() {
        let f = field();
        let a = Share::new(1, f.from_u64(3));
        let b = Share::new(2, f.from_u64(4));
        let sum = a.add(&b).unwrap();
        assert_eq!(sum.degree(), 2);
        assert_eq!(sum.value(), &f.from_u64(7));
    }

    #[test]
    fn add_const_preserves_degree() {
        let f = field();
        let a = Share::new(3, f.from_u64(3));
        let shifted = a.add_const(&f.from_u64(10)).unwrap();
        assert_eq!(shifted.degree(), 3);
        assert_eq!(shifted.value(), &f.from_u64(13));
    }

    #[test]
    fn scalar_mul_preserves_degree_and_scales_value() {
        let f = field();
        let a = Share::new(2, f.from_u64(5));
        let scaled = a.scalar_mul(&f.from_u64(4)).unwrap();
        assert_eq!(scaled.degree(), 2);
        assert_eq!(scaled.value(), &f.from_u64(20));
    }

    #[test]
    fn negate_then_add_is_zero() {
        let f = field();
        let a = Share::new(1, f.from_u64(17));
        let sum = a.add(&a.negate()).unwrap();
        assert!(sum.value().is_zero());
    }
}
