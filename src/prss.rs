//! Pseudo-random secret sharing: non-interactive generation of a random
//! degree-`t` Shamir share from pre-distributed keys, with no messages sent
//! (SPEC_FULL.md §4.7).
//!
//! No teacher analogue exists (the teacher's `run_multiply_protocol`
//! generates its masking randomness by actually sharing and opening a
//! random value over the network); this follows the Cramer-Damgård-Ishai
//! construction the spec describes: for every maximal unqualified subset of
//! players `S` (size `t`), the players *outside* `S` hold a common key
//! `k_S`. Player `i` locally evaluates `e_S(i) * PRF(k_S, tag)` for every
//! such `S` it has a key for; `e_S` is the unique degree-`t` polynomial
//! vanishing on `S` and normalised to 1 at the origin, so the terms for
//! subsets containing `i` are structurally zero and the per-player sums are
//! the evaluations of one implicit random polynomial `F` with `F(0)` known
//! to no coalition of size `t` or smaller.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use num_bigint::{BigInt, BigUint, Sign};

use crate::field::{Field, FieldElement};
use crate::pc::Tag;
use crate::player::{Player, PlayerId};
use crate::share::Share;

/// `e_S(at)`, the public coefficient for subset `S`'s contribution to
/// player `at`'s share: `Pi_{j in S} (j - at) / j`, a degree-`|S|`
/// polynomial in `at` with `e_S(j) = 0` for every `j in S` and `e_S(0) = 1`.
fn evaluation_coefficient(subset: &[PlayerId], at: PlayerId, field: &Field) -> FieldElement {
    let at_elem = field.from_u64(at as u64);
    let mut acc = field.one();
    for &j in subset {
        let j_elem = field.from_u64(j as u64);
        let numerator = j_elem.checked_sub(&at_elem).expect("same field");
        let term = numerator.checked_div(&j_elem).expect("player ids are 1-indexed, never 0");
        acc = acc.checked_mul(&term).expect("same field");
    }
    acc
}

/// Expands `key` and `tag` into enough pseudorandom bytes to cover the
/// field's modulus with margin, via repeated keyed hashing. Not a
/// cryptographically vetted PRF construction (SPEC_FULL.md §9 records this
/// as an accepted simplification); it only needs to be a deterministic
/// function of `(key, tag)` that every holder of `key` computes identically.
fn derive_bytes(key: &[u8], tag: &Tag, out_len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(out_len);
    let mut counter: u64 = 0;
    while out.len() < out_len {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        tag.as_slice().hash(&mut hasher);
        counter.hash(&mut hasher);
        out.extend_from_slice(&hasher.finish().to_be_bytes());
        counter += 1;
    }
    out.truncate(out_len);
    out
}

/// `PRF(k_S, tag)` as a field element, uniform enough over `field` for PRSS
/// purposes given a key of adequate entropy.
fn prf_value(key: &[u8], tag: &Tag, field: &Field) -> FieldElement {
    let byte_len = (field.bit_length() as usize / 8) + 8;
    let bytes = derive_bytes(key, tag, byte_len);
    let magnitude = BigUint::from_bytes_be(&bytes);
    field.from_bigint(&BigInt::from_biguint(Sign::Plus, magnitude))
}

/// Computes `local`'s share of the PRSS value for `tag`: a fresh Shamir
/// share of degree `t` of a secret no coalition of `t` or fewer players
/// (other than the single committee whose keys they all hold) can predict.
/// `local.prss_keys` must hold exactly the keys for subsets not containing
/// `local.id` (SPEC_FULL.md §6 "owner's prss_keys subsection").
pub fn random_share(local: &Player, tag: &Tag, t: usize, field: &Field) -> Share {
    let mut acc = field.zero();
    for (subset, key) in &local.prss_keys {
        debug_assert_eq!(subset.len(), t, "prss key for a non-maximal subset");
        debug_assert!(!subset.contains(&local.id), "prss key for a subset containing the owner");
        let coeff = evaluation_coefficient(subset, local.id, field);
        let contribution = coeff.checked_mul(&prf_value(key, tag, field)).expect("same field");
        acc = acc.checked_add(&contribution).expect("same field");
    }
    Share::new(t, acc)
}
