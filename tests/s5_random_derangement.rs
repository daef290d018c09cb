//! S5: a secret-santa-style random derangement, built by attaching a fresh
//! PRSS key to each of the public indices `0..6`, sorting the pairs by key,
//! and rejection-sampling on the opened permutation until no index maps to
//! itself.

mod common;

use std::collections::HashSet;

use shami_rs::runtime::passive::PassiveRuntime;
use shami_rs::share::Share;

/// Orders the pair `(key_a, idx_a)`, `(key_b, idx_b)` ascending by key,
/// carrying the paired index along with whichever key moves -- the same
/// comparison bit drives both arrays, so the index never gets separated
/// from the key that earned it its position.
async fn compare_and_swap_paired(
    rt: &PassiveRuntime,
    key_a: &Share,
    key_b: &Share,
    idx_a: &Share,
    idx_b: &Share,
) -> (Share, Share, Share, Share) {
    let lt = rt.less_than(key_a, key_b).await.unwrap();

    let key_diff = rt.sub(key_a, key_b).unwrap();
    let key_term = rt.mul(&lt, &key_diff).await.unwrap();
    let key_min = rt.add(key_b, &key_term).unwrap();
    let key_max = rt.sub(key_a, &key_term).unwrap();

    let idx_diff = rt.sub(idx_a, idx_b).unwrap();
    let idx_term = rt.mul(&lt, &idx_diff).await.unwrap();
    let idx_min = rt.add(idx_b, &idx_term).unwrap();
    let idx_max = rt.sub(idx_a, &idx_term).unwrap();

    (key_min, key_max, idx_min, idx_max)
}

/// Odd-even transposition ("brick") sort: `n` passes of adjoining
/// compare-exchanges, alternating which pairing starts each pass. Simpler
/// to drive for a non-power-of-two `n` than a bitonic network.
async fn odd_even_sort_paired(rt: &PassiveRuntime, keys: &mut [Share], idx: &mut [Share]) {
    let n = keys.len();
    for pass in 0..n {
        let start = pass % 2;
        let mut i = start;
        while i + 1 < n {
            let (a, b, ia, ib) = compare_and_swap_paired(rt, &keys[i], &keys[i + 1], &idx[i], &idx[i + 1]).await;
            keys[i] = a;
            keys[i + 1] = b;
            idx[i] = ia;
            idx[i + 1] = ib;
            i += 2;
        }
    }
}

/// Draws a random permutation of `0..n` by sorting PRSS keys paired with the
/// public indices, re-drawing until it has no fixed point.
async fn random_derangement(rt: &PassiveRuntime, n: u64) -> Vec<u64> {
    let field = rt.base().field().clone();
    loop {
        let mut keys: Vec<Share> = Vec::with_capacity(n as usize);
        let mut idx: Vec<Share> = Vec::with_capacity(n as usize);
        for i in 0..n {
            keys.push(rt.random());
            idx.push(Share::new(0, field.from_u64(i)));
        }

        odd_even_sort_paired(rt, &mut keys, &mut idx).await;

        let mut permutation = Vec::with_capacity(n as usize);
        for share in &idx {
            let opened = rt.open(share).await.unwrap();
            permutation.push(opened.value().to_u64_digits().first().copied().unwrap_or(0));
        }

        let is_derangement = permutation.iter().enumerate().all(|(i, &p)| p != i as u64);
        if is_derangement {
            return permutation;
        }
    }
}

#[tokio::test]
async fn random_derangement_is_always_a_fixed_point_free_permutation() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let runtimes = common::players(&[1, 2, 3], 1, common::big_blum_field(), 8, 30);

            let mut tasks = Vec::new();
            for (_id, rt) in runtimes {
                tasks.push(tokio::task::spawn_local(async move {
                    let mut permutations = Vec::with_capacity(100);
                    for _ in 0..100 {
                        permutations.push(random_derangement(&rt, 6).await);
                    }
                    rt.shutdown().await;
                    permutations
                }));
            }

            for task in tasks {
                let permutations = task.await.unwrap();
                assert_eq!(permutations.len(), 100);
                for permutation in permutations {
                    let as_set: HashSet<u64> = permutation.iter().copied().collect();
                    assert_eq!(as_set, (0u64..6).collect::<HashSet<_>>(), "must be a permutation of 0..6");
                    for (i, &p) in permutation.iter().enumerate() {
                        assert_ne!(p, i as u64, "derangement must have no fixed point");
                    }
                }
            }
        })
        .await;
}
