//! S2: the millionaires' problem, run as a round-robin of secure
//! comparisons over three players' private fortunes.

mod common;

use std::collections::HashMap;

#[tokio::test]
async fn millionaires_pairwise_comparisons_match_plaintext_fortunes() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let runtimes = common::players(&[1, 2, 3], 1, common::big_blum_field(), 8, 30);
            let fortunes: HashMap<u32, u64> = [(1, 123), (2, 45), (3, 78)].into_iter().collect();

            let mut tasks = Vec::new();
            for (id, rt) in runtimes {
                let fortunes = fortunes.clone();
                tasks.push(tokio::task::spawn_local(async move {
                    let field = rt.base().field().clone();
                    let mut shares = HashMap::new();
                    for owner in [1u32, 2, 3] {
                        let secret = if owner == id { Some(field.from_u64(fortunes[&owner])) } else { None };
                        shares.insert(owner, rt.share_value(secret, owner).await.unwrap());
                    }

                    // a >= b  <=>  not (a < b)
                    let m1_lt_m2 = rt.less_than(&shares[&1], &shares[&2]).await.unwrap();
                    let m1_lt_m3 = rt.less_than(&shares[&1], &shares[&3]).await.unwrap();
                    let m2_lt_m3 = rt.less_than(&shares[&2], &shares[&3]).await.unwrap();

                    let m1_ge_m2 = rt.open(&m1_lt_m2).await.unwrap().is_zero();
                    let m1_ge_m3 = rt.open(&m1_lt_m3).await.unwrap().is_zero();
                    let m2_ge_m3 = rt.open(&m2_lt_m3).await.unwrap().is_zero();

                    rt.shutdown().await;
                    (m1_ge_m2, m1_ge_m3, m2_ge_m3)
                }));
            }

            for task in tasks {
                let (m1_ge_m2, m1_ge_m3, m2_ge_m3) = task.await.unwrap();
                assert!(m1_ge_m2, "123 >= 45");
                assert!(m1_ge_m3, "123 >= 78");
                assert!(!m2_ge_m3, "45 < 78");
            }
        })
        .await;
}
