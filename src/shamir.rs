//! Shamir polynomial sharing and Lagrange recombination (SPEC_FULL.md §4.2).
//!
//! Grounded on the teacher's `mpc::compute_shamir_share`/`reconstruct_secret`
//! and `math::lagrange::{compute_lagrange_basis, interpolate_polynomial_at}`,
//! generalised to arbitrary-size fields and with the recombination vector
//! memoised as SPEC_FULL.md §4.2 requires ("callers invoke recombine
//! billions of times on the same player-ID subsets").

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use num_bigint::BigUint;
use rand::Rng;

use crate::error::PreconditionError;
use crate::field::{Field, FieldElement};

/// One player's evaluation point: `(x_i, f(x_i))`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePoint {
    pub x: u32,
    pub y: FieldElement,
}

/// Splits `secret` into `n` Shamir shares of degree `t`, i.e. evaluations of
/// a random degree-`t` polynomial `f` with `f(0) = secret` at `x = 1..=n`.
pub fn share<R: Rng + ?Sized>(
    secret: &FieldElement,
    t: usize,
    n: usize,
    rng: &mut R,
) -> Result<Vec<SharePoint>, PreconditionError> {
    if n == 0 || t >= n {
        return Err(PreconditionError::ThresholdOutOfRange { t, n });
    }
    let field = secret.field().clone();
    let mut coeffs = Vec::with_capacity(t + 1);
    coeffs.push(secret.clone());
    for _ in 0..t {
        coeffs.push(field.random(rng));
    }

    Ok((1..=n as u32)
        .map(|x| SharePoint {
            x,
            y: evaluate(&coeffs, x),
        })
        .collect())
}

fn evaluate(coeffs: &[FieldElement], x: u32) -> FieldElement {
    let field = coeffs[0].field();
    let x_elem = field.from_u64(x as u64);
    // Horner's method.
    let mut acc = field.zero();
    for c in coeffs.iter().rev() {
        acc = acc.checked_mul(&x_elem).unwrap().checked_add(c).unwrap();
    }
    acc
}

type CacheKey = (BigUint, Vec<u32>, BigUint);
type Cache = Mutex<HashMap<CacheKey, Vec<FieldElement>>>;

fn cache() -> &'static Cache {
    static CACHE: OnceLock<Cache> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// The Lagrange basis `{ Pi_{j != i} (x_r - x_j) / (x_i - x_j) }` evaluated
/// at `x_r`, for the point labels `xs`. Memoised per `(modulus, xs, x_r)`
/// since recombination is invoked on the same small id-subsets constantly.
pub fn lagrange_basis(xs: &[u32], x_r: &FieldElement, field: &Field) -> Vec<FieldElement> {
    let key: CacheKey = (field.modulus().clone(), xs.to_vec(), x_r.value().clone());
    if let Some(hit) = cache().lock().expect("recombination cache poisoned").get(&key) {
        return hit.clone();
    }

    let mut basis = Vec::with_capacity(xs.len());
    for (j, &x_j) in xs.iter().enumerate() {
        let x_j_elem = field.from_u64(x_j as u64);
        let mut term = field.one();
        for (m, &x_m) in xs.iter().enumerate() {
            if m == j {
                continue;
            }
            let x_m_elem = field.from_u64(x_m as u64);
            let numerator = x_r.checked_sub(&x_m_elem).unwrap();
            let denominator = x_j_elem.checked_sub(&x_m_elem).unwrap();
            let factor = numerator.checked_div(&denominator).expect("distinct point labels");
            term = term.checked_mul(&factor).unwrap();
        }
        basis.push(term);
    }

    cache()
        .lock()
        .expect("recombination cache poisoned")
        .insert(key, basis.clone());
    basis
}

/// Lagrange interpolation of `points` at `x_r` (default the origin, i.e. the
/// shared secret itself). Any distinct-`x_i` subset of size `k` recombines
/// the unique degree-`< k` polynomial agreeing with the points.
pub fn recombine(points: &[SharePoint], x_r: Option<&FieldElement>) -> Result<FieldElement, PreconditionError> {
    if points.is_empty() {
        return Err(PreconditionError::NotEnoughShares { needed: 1, got: 0 });
    }
    let mut seen = std::collections::HashSet::new();
    for p in points {
        if !seen.insert(p.x) {
            return Err(PreconditionError::DuplicatePointLabel(p.x));
        }
    }

    let field = points[0].y.field().clone();
    let xs: Vec<u32> = points.iter().map(|p| p.x).collect();
    let origin;
    let x_r = match x_r {
        Some(x) => x,
        None => {
            origin = field.zero();
            &origin
        }
    };
    let basis = lagrange_basis(&xs, x_r, &field);

    let mut acc = field.zero();
    for (point, weight) in points.iter().zip(basis.iter()) {
        acc = acc.checked_add(&point.y.checked_mul(weight).unwrap()).unwrap();
    }
    Ok(acc)
}


/// Tiny local replacement for `itertools::combinations` so tests don't pull
/// in a dev-dependency just for one helper.
mod itertools_like_combinations {
    pub fn combinations<T: Clone>(items: &[T], k: usize) -> Vec<Vec<T>> {
        if k == 0 {
            return vec![vec![]];
        }
        if items.len() < k {
            return vec![];
        }
        let mut result = Vec::new();
        for i in 0..=items.len() - k {
            let head = items[i].clone();
            for mut tail in combinations(&items[i + 1..], k - 1) {
                tail.insert(0, head.clone());
                result.push(tail);
            }
        }
        result
    }
}
