//! S3: ascending bitonic sort over an 8-element shared array, built from the
//! comparison/selection primitives the core exposes (`less_than`, `mul`).

mod common;

use std::cell::Cell;

use shami_rs::runtime::passive::PassiveRuntime;
use shami_rs::share::Share;

/// Picks `(min, max)` of `a, b` without revealing which was smaller, via one
/// secure comparison and one secure multiplication; returns them in
/// ascending or descending order depending on `ascending`.
async fn oblivious_min_max(rt: &PassiveRuntime, comparisons: &Cell<u32>, a: &Share, b: &Share, ascending: bool) -> (Share, Share) {
    let lt = rt.less_than(a, b).await.unwrap();
    comparisons.set(comparisons.get() + 1);
    let diff = rt.sub(a, b).unwrap();
    let term = rt.mul(&lt, &diff).await.unwrap();
    let min = rt.add(b, &term).unwrap();
    let max = rt.sub(a, &term).unwrap();
    if ascending {
        (min, max)
    } else {
        (max, min)
    }
}

/// The classic iterative Batcher network: for power-of-two `n`, `log2(n)`
/// merge stages each split into `log2(n)..1` comparator rounds.
async fn bitonic_sort(rt: &PassiveRuntime, comparisons: &Cell<u32>, values: &mut [Share]) {
    let n = values.len();
    assert!(n.is_power_of_two(), "bitonic_sort needs a power-of-two length");

    let mut k = 2;
    while k <= n {
        let mut j = k / 2;
        while j > 0 {
            for i in 0..n {
                let l = i ^ j;
                if l > i {
                    let ascending = i & k == 0;
                    let (a, b) = oblivious_min_max(rt, comparisons, &values[i], &values[l], ascending).await;
                    values[i] = a;
                    values[l] = b;
                }
            }
            j /= 2;
        }
        k *= 2;
    }
}

#[tokio::test]
async fn bitonic_sort_matches_plaintext_ascending_order() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let runtimes = common::players(&[1, 2, 3], 1, common::big_blum_field(), 8, 30);
            let values: Vec<u64> = (0..8u64).map(|i| i * i).collect();

            let mut tasks = Vec::new();
            for (id, rt) in runtimes {
                let values = values.clone();
                tasks.push(tokio::task::spawn_local(async move {
                    let field = rt.base().field().clone();
                    let mut shares = Vec::with_capacity(values.len());
                    for &v in &values {
                        let secret = if id == 1 { Some(field.from_u64(v)) } else { None };
                        shares.push(rt.share_value(secret, 1).await.unwrap());
                    }

                    let comparisons = Cell::new(0u32);
                    bitonic_sort(&rt, &comparisons, &mut shares).await;

                    let mut opened = Vec::with_capacity(shares.len());
                    for share in &shares {
                        opened.push(rt.open(share).await.unwrap());
                    }
                    rt.shutdown().await;
                    (opened, comparisons.get())
                }));
            }

            let field = shami_rs::field::make_field(common::big_blum_field()).unwrap();
            let expected: Vec<_> = [0u64, 1, 4, 9, 16, 25, 36, 49].into_iter().map(|v| field.from_u64(v)).collect();

            for task in tasks {
                let (opened, comparisons) = task.await.unwrap();
                assert_eq!(opened, expected);
                assert_eq!(comparisons, 24, "6 stages x 4 comparators");
            }
        })
        .await;
}
