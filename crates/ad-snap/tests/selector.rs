mod common;

use std::collections::HashMap;
use std::sync::Arc;

use ad_snap::selector::{AdSelector, ScanEnd};
use ad_snap::TransactionContext;
use chain_client::ChainError;
use common::{record, test_config, MockChain};

#[tokio::test]
async fn scan_collects_only_eligible_records() {
    let chain = Arc::new(
        MockChain::new()
            .with_ad(record(0, true, 100))
            .with_ad(record(1, false, 50))
            .with_ad(record(2, true, 0))
            .with_ad(record(5, true, 7)),
    );
    let selector = AdSelector::new(chain, &test_config());

    let report = selector.scan().await.unwrap();
    assert_eq!(report.end, ScanEnd::RangeExhausted);
    let ids: Vec<u32> = report.eligible.iter().map(|ad| ad.ad_id).collect();
    assert_eq!(ids, vec![0, 5]);
}

#[tokio::test]
async fn chain_error_truncates_the_scan() {
    let chain = Arc::new(
        MockChain::new()
            .with_ad(record(0, true, 100))
            .with_ad(record(3, true, 100))
            .failing_from(3),
    );
    let selector = AdSelector::new(chain, &test_config());

    let report = selector.scan().await.unwrap();
    assert_eq!(report.end, ScanEnd::Truncated { failed_id: 3 });
    // Only the prefix before the failure was collected.
    let ids: Vec<u32> = report.eligible.iter().map(|ad| ad.ad_id).collect();
    assert_eq!(ids, vec![0]);
}

#[tokio::test]
async fn no_eligible_records_selects_nothing() {
    let chain = Arc::new(
        MockChain::new()
            .with_ad(record(0, false, 100))
            .with_ad(record(1, true, 0)),
    );
    let selector = AdSelector::new(chain, &test_config());

    let picked = selector
        .select_ad(&TransactionContext::default())
        .await
        .unwrap();
    assert!(picked.is_none());
}

#[tokio::test]
async fn selected_ad_carries_gateway_url() {
    let chain = Arc::new(MockChain::new().with_ad(record(4, true, 100)));
    let selector = AdSelector::new(chain, &test_config());

    let ad = selector
        .select_ad(&TransactionContext::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ad.ad_id, 4);
    assert_eq!(ad.video_url, "https://crustgateway.io/ipfs/QmCid4");
}

#[tokio::test]
async fn unreachable_chain_propagates_from_selection() {
    let chain = Arc::new(MockChain::new().offline());
    let selector = AdSelector::new(chain, &test_config());

    match selector.select_ad(&TransactionContext::default()).await {
        Err(ChainError::Connect(_)) => {}
        other => panic!("expected connect error, got {other:?}"),
    }
}

#[tokio::test]
async fn selection_is_roughly_uniform() {
    let chain = Arc::new(
        MockChain::new()
            .with_ad(record(0, true, 100))
            .with_ad(record(1, true, 100))
            .with_ad(record(2, true, 100))
            .with_ad(record(3, true, 100)),
    );
    let selector = AdSelector::new(chain, &test_config());

    const SAMPLES: u32 = 2_000;
    let mut counts: HashMap<u32, u32> = HashMap::new();
    for _ in 0..SAMPLES {
        let ad = selector
            .select_ad(&TransactionContext::default())
            .await
            .unwrap()
            .unwrap();
        *counts.entry(ad.ad_id).or_insert(0) += 1;
    }

    // Expected 500 per record; the band is ~7 standard deviations wide, so
    // a correct uniform pick essentially never trips it.
    for ad_id in 0..4 {
        let count = counts.get(&ad_id).copied().unwrap_or(0);
        assert!(
            (350..=650).contains(&count),
            "ad {ad_id} selected {count} times out of {SAMPLES}"
        );
    }
}
