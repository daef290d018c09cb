//! Prime field arithmetic (SPEC_FULL.md §4.1).
//!
//! Grounded on the teacher's `math::mersenne61::Mersenne61` (modular add/
//! sub/mul/negate/inverse via extended Euclid, `random`), generalised from a
//! fixed 61-bit Mersenne prime to an arbitrary `BigUint` modulus since the
//! comparison/equality protocols in SPEC_FULL.md §4.6 need primes well over
//! l + k + log2(n) + 1 bits.

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

use num_bigint::{BigInt, BigUint, RandBigInt, Sign};
use num_traits::{One, Signed, Zero};
use rand::Rng;

use crate::error::FieldError;

/// Deterministic Miller-Rabin witnesses, sufficient for any modulus this
/// crate is realistically asked to validate (test fields up to production
/// Blum primes); composite inputs beyond that are caught with overwhelming
/// probability by the trailing random-witness rounds.
const MILLER_RABIN_WITNESSES: &[u64] = &[2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];
const MILLER_RABIN_RANDOM_ROUNDS: usize = 20;

fn is_prime(n: &BigUint) -> bool {
    let two = BigUint::from(2u32);
    let three = BigUint::from(3u32);
    if *n < two {
        return false;
    }
    if *n == two || *n == three {
        return true;
    }
    if (n % &two).is_zero() {
        return false;
    }

    // n - 1 = d * 2^r with d odd.
    let n_minus_one = n - BigUint::one();
    let mut d = n_minus_one.clone();
    let mut r = 0u64;
    while (&d % &two).is_zero() {
        d /= &two;
        r += 1;
    }

    let check_witness = |a: BigUint| -> bool {
        if a < two || a >= *n {
            return true;
        }
        let mut x = a.modpow(&d, n);
        if x == BigUint::one() || x == n_minus_one {
            return true;
        }
        for _ in 0..r.saturating_sub(1) {
            x = x.modpow(&two, n);
            if x == n_minus_one {
                return true;
            }
        }
        false
    };

    for &w in MILLER_RABIN_WITNESSES {
        if !check_witness(BigUint::from(w)) {
            return false;
        }
    }
    let mut rng = rand::thread_rng();
    for _ in 0..MILLER_RABIN_RANDOM_ROUNDS {
        let a = rng.gen_biguint_range(&two, &(n - &two));
        if !check_witness(a) {
            return false;
        }
    }
    true
}

/// Shared, canonicalised representation of a prime field. Two calls to
/// [`make_field`] with the same modulus return `Field` handles that compare
/// equal and can be mixed freely; elements tagged with different handles
/// can never be combined (SPEC_FULL.md §3, "elements from different F_p are
/// not interoperable").
#[derive(Clone)]
pub struct Field(Arc<FieldInner>);

struct FieldInner {
    modulus: BigUint,
    blum: bool,
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("modulus", &self.0.modulus)
            .field("blum", &self.0.blum)
            .finish()
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Field {}

type FieldRegistry = Mutex<std::collections::HashMap<(BigUint, bool), Arc<FieldInner>>>;

fn registry() -> &'static FieldRegistry {
    static REGISTRY: OnceLock<FieldRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(std::collections::HashMap::new()))
}

/// Constructs (or looks up) the field F_p. Fails with `InvalidModulus` if
/// `p` is not prime, and records whether `p` is a Blum prime (p = 3 mod 4)
/// so that [`FieldElement::sqrt`] can later fail fast with `NotBlum`.
pub fn make_field(p: BigUint) -> Result<Field, FieldError> {
    if p < BigUint::from(2u32) || !is_prime(&p) {
        return Err(FieldError::InvalidModulus(p.to_string()));
    }
    let blum = &p % BigUint::from(4u32) == BigUint::from(3u32);
    let key = (p.clone(), blum);
    let mut reg = registry().lock().expect("field registry poisoned");
    let inner = reg
        .entry(key)
        .or_insert_with(|| Arc::new(FieldInner { modulus: p, blum }))
        .clone();
    Ok(Field(inner))
}

impl Field {
    pub fn modulus(&self) -> &BigUint {
        &self.0.modulus
    }

    pub fn is_blum(&self) -> bool {
        self.0.blum
    }

    /// Number of bits needed to represent any residue, i.e. ceil(log2(p)).
    pub fn bit_length(&self) -> u64 {
        self.0.modulus.bits()
    }

    pub fn zero(&self) -> FieldElement {
        FieldElement {
            value: BigUint::zero(),
            field: self.clone(),
        }
    }

    pub fn one(&self) -> FieldElement {
        FieldElement {
            value: BigUint::one(),
            field: self.clone(),
        }
    }

    pub fn from_u64(&self, v: u64) -> FieldElement {
        FieldElement {
            value: BigUint::from(v) % &self.0.modulus,
            field: self.clone(),
        }
    }

    pub fn from_bigint(&self, v: &BigInt) -> FieldElement {
        let m = BigInt::from(self.0.modulus.clone());
        let mut r = v % &m;
        if r.is_negative() {
            r += &m;
        }
        FieldElement {
            value: r.to_biguint().expect("non-negative by construction"),
            field: self.clone(),
        }
    }

    /// Uniformly random element of the field.
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> FieldElement {
        let v = rng.gen_biguint_below(&self.0.modulus);
        FieldElement {
            value: v,
            field: self.clone(),
        }
    }
}

/// An element of some `Field`, stored canonically in `[0, p)`.
#[derive(Clone)]
pub struct FieldElement {
    value: BigUint,
    field: Field,
}

impl fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.value.to_str_radix(16))
    }
}

impl PartialEq for FieldElement {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field && self.value == other.value
    }
}
impl Eq for FieldElement {}

impl std::hash::Hash for FieldElement {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

fn check_same_field(a: &Field, b: &Field) -> Result<(), FieldError> {
    if a == b {
        Ok(())
    } else {
        Err(FieldError::FieldMismatch)
    }
}

impl FieldElement {
    pub fn field(&self) -> &Field {
        &self.field
    }

    /// The non-negative residue, as used on the wire (SPEC_FULL.md §6:
    /// "ASCII 0x... hex of the non-negative residue").
    pub fn value(&self) -> &BigUint {
        &self.value
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    pub fn checked_add(&self, other: &Self) -> Result<Self, FieldError> {
        check_same_field(&self.field, &other.field)?;
        Ok(Self {
            value: (&self.value + &other.value) % self.field.modulus(),
            field: self.field.clone(),
        })
    }

    pub fn checked_sub(&self, other: &Self) -> Result<Self, FieldError> {
        check_same_field(&self.field, &other.field)?;
        let m = self.field.modulus();
        let value = if self.value >= other.value {
            &self.value - &other.value
        } else {
            m - (&other.value - &self.value)
        };
        Ok(Self {
            value,
            field: self.field.clone(),
        })
    }

    pub fn checked_mul(&self, other: &Self) -> Result<Self, FieldError> {
        check_same_field(&self.field, &other.field)?;
        Ok(Self {
            value: (&self.value * &other.value) % self.field.modulus(),
            field: self.field.clone(),
        })
    }

    pub fn negate(&self) -> Self {
        if self.value.is_zero() {
            self.clone()
        } else {
            Self {
                value: self.field.modulus() - &self.value,
                field: self.field.clone(),
            }
        }
    }

    /// Modular inverse via the extended Euclidean algorithm, mirroring the
    /// teacher's `Mersenne61::inverse` but over `BigInt` instead of `i64`.
    pub fn invert(&self) -> Result<Self, FieldError> {
        if self.value.is_zero() {
            return Err(FieldError::ZeroInverse);
        }
        let m = BigInt::from(self.field.modulus().clone());
        let (mut old_r, mut r) = (BigInt::from(self.value.clone()), m.clone());
        let (mut old_s, mut s) = (BigInt::one(), BigInt::zero());
        while !r.is_zero() {
            let q = &old_r / &r;
            let new_r = &old_r - &q * &r;
            old_r = std::mem::replace(&mut r, new_r);
            let new_s = &old_s - &q * &s;
            old_s = std::mem::replace(&mut s, new_s);
        }
        let mut inv = old_s % &m;
        if inv.is_negative() {
            inv += &m;
        }
        Ok(Self {
            value: inv.to_biguint().expect("non-negative by construction"),
            field: self.field.clone(),
        })
    }

    pub fn checked_div(&self, other: &Self) -> Result<Self, FieldError> {
        self.checked_mul(&other.invert()?)
    }

    /// Fast modular exponentiation, `e >= 0`.
    pub fn pow(&self, e: &BigUint) -> Self {
        Self {
            value: self.value.modpow(e, self.field.modulus()),
            field: self.field.clone(),
        }
    }

    pub fn pow_u64(&self, e: u64) -> Self {
        self.pow(&BigUint::from(e))
    }

    /// `a^((p+1)/4) mod p`, the principal square root for a Blum prime.
    /// Fails with `NotBlum` if the field's modulus isn't `3 mod 4`.
    pub fn sqrt(&self) -> Result<Self, FieldError> {
        if !self.field.is_blum() {
            return Err(FieldError::NotBlum);
        }
        let exponent = (self.field.modulus() + BigUint::one()) / BigUint::from(4u32);
        Ok(self.pow(&exponent))
    }

    /// `(value >> i) & 1` in the integer domain (not modular).
    pub fn bit(&self, i: u64) -> u8 {
        if self.value.bit(i) {
            1
        } else {
            0
        }
    }

    /// The signed representative in `(-p/2, p/2]`, used by the comparison
    /// protocols (SPEC_FULL.md §4.1).
    pub fn signed(&self) -> BigInt {
        let p = self.field.modulus();
        let half = p / BigUint::from(2u32);
        if self.value > half {
            BigInt::from_biguint(Sign::Minus, p - &self.value)
        } else {
            BigInt::from_biguint(Sign::Plus, self.value.clone())
        }
    }

    /// Euler's criterion: `true` iff `self` is a nonzero quadratic residue
    /// mod `p` (`self^((p-1)/2) == 1`). Meaningless on zero -- callers must
    /// check `is_zero` first (SPEC_FULL.md §4.6, the probabilistic `equal`
    /// fallback's per-round Legendre-symbol test).
    pub fn is_quadratic_residue(&self) -> bool {
        let exponent = (self.field.modulus() - BigUint::one()) / BigUint::from(2u32);
        self.pow(&exponent) == self.field.one()
    }

    /// Bitwise XOR of two known-0/1 elements, used only where both operands
    /// are boolean shares opened to the clear (SPEC_FULL.md §4.1).
    pub fn xor(&self, other: &Self) -> Result<Self, FieldError> {
        check_same_field(&self.field, &other.field)?;
        debug_assert!(self.value <= BigUint::one() && other.value <= BigUint::one());
        let v = if self.value == other.value {
            BigUint::zero()
        } else {
            BigUint::one()
        };
        Ok(Self {
            value: v,
            field: self.field.clone(),
        })
    }
}

impl std::ops::Add for &FieldElement {
    type Output = FieldElement;
    fn add(self, rhs: Self) -> FieldElement {
        self.checked_add(rhs).expect("field mismatch in +")
    }
}

impl std::ops::Sub for &FieldElement {
    type Output = FieldElement;
    fn sub(self, rhs: Self) -> FieldElement {
        self.checked_sub(rhs).expect("field mismatch in -")
    }
}

impl std::ops::Mul for &FieldElement {
    type Output = FieldElement;
    fn mul(self, rhs: Self) -> FieldElement {
        self.checked_mul(rhs).expect("field mismatch in *")
    }
}

impl std::ops::Neg for &FieldElement {
    type Output = FieldElement;
    fn neg(self) -> FieldElement {
        self.negate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;
    use rstest::rstest;

    fn small_field() -> Field {
        make_field(BigUint::from(1031u32)).unwrap()
    }

    fn blum_field() -> Field {
        // 2^31 - 1, a Mersenne prime that is also 3 mod 4.
        make_field(BigUint::from(2147483647u32)).unwrap()
    }

    #[test]
    fn rejects_composite_modulus() {
        let err = make_field(BigUint::from(1032u32)).unwrap_err();
        assert!(matches!(err, FieldError::InvalidModulus(_)));
    }

    #[test]
    fn field_mismatch_is_detected() {
        let f1 = small_field();
        let f2 = make_field(BigUint::from(1033u32)).unwrap();
        let a = f1.from_u64(3);
        let b = f2.from_u64(3);
        assert_eq!(a.checked_add(&b), Err(FieldError::FieldMismatch));
    }

    #[rstest]
    fn additive_inverse_round_trips(#[values(0u64, 1, 500, 1030)] v: u64) {
        let f = small_field();
        let a = f.from_u64(v);
        let s = a.checked_add(&a.negate()).unwrap();
        assert!(s.is_zero());
    }

    #[test]
    fn multiplicative_inverse() {
        let f = small_field();
        let mut rng = thread_rng();
        for _ in 0..100 {
            let a = f.random(&mut rng);
            if a.is_zero() {
                continue;
            }
            let one = a.checked_mul(&a.invert().unwrap()).unwrap();
            assert_eq!(one, f.one());
        }
    }

    #[test]
    fn inverse_of_zero_fails() {
        let f = small_field();
        assert_eq!(f.zero().invert(), Err(FieldError::ZeroInverse));
    }

    #[test]
    fn sqrt_requires_blum() {
        // 1033 = 1 mod 4, not a Blum prime.
        let f = make_field(BigUint::from(1033u32)).unwrap();
        let a = f.from_u64(4);
        assert_eq!(a.sqrt(), Err(FieldError::NotBlum));
    }

    #[test]
    fn blum_field_exposes_sqrt() {
        let f = small_field(); // 1031 = 3 mod 4, is Blum.
        let a = f.from_u64(4);
        assert!(a.sqrt().is_ok());
    }

    #[test]
    fn sqrt_squares_back_to_quadratic_residue() {
        let f = blum_field();
        let a = f.from_u64(9);
        let root = a.sqrt().unwrap();
        assert_eq!(root.checked_mul(&root).unwrap(), a.checked_mul(&f.one()).unwrap());
    }

    #[test]
    fn signed_representative_is_in_range() {
        let f = small_field();
        let mut rng = thread_rng();
        for _ in 0..50 {
            let a = f.random(&mut rng);
            let s = a.signed();
            let p = BigInt::from(f.modulus().clone());
            assert!(s > -&p / 2 && s <= &p / 2);
        }
    }

    #[test]
    fn distributivity() {
        let f = small_field();
        let mut rng = thread_rng();
        for _ in 0..50 {
            let a = f.random(&mut rng);
            let b = f.random(&mut rng);
            let c = f.random(&mut rng);
            let lhs = a.checked_mul(&b.checked_add(&c).unwrap()).unwrap();
            let rhs = a
                .checked_mul(&b)
                .unwrap()
                .checked_add(&a.checked_mul(&c).unwrap())
                .unwrap();
            assert_eq!(lhs, rhs);
        }
    }

    #[test]
    fn quadratic_residue_matches_sqrt() {
        let f = blum_field();
        let mut rng = thread_rng();
        for _ in 0..50 {
            let r = f.random(&mut rng);
            if r.is_zero() {
                continue;
            }
            let square = r.checked_mul(&r).unwrap();
            assert!(square.is_quadratic_residue());
        }
    }

    #[test]
    fn non_residue_fails_euler_criterion() {
        // 1031 is prime; 7 is a quadratic non-residue mod 1031 (by quadratic
        // reciprocity: (7/1031)(1031/7) = -1, (1031/7) = (2/7) = 1, so
        // (7/1031) = -1).
        let f = small_field();
        assert!(!f.from_u64(7).is_quadratic_residue());
    }

    #[test]
    fn same_modulus_canonicalises_to_same_handle() {
        let f1 = make_field(BigUint::from(1031u32)).unwrap();
        let f2 = make_field(BigUint::from(1031u32)).unwrap();
        assert_eq!(f1, f2);
    }
}
