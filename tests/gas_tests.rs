mod common;

use alloy_primitives::U256;
use common::*;
use curvelib::core::coin::Coin;
use std::sync::Arc;

const ADD_LIQUIDITY: &str = "add_liquidity(uint256[3],uint256)";

fn funded_three_pool(transport: &FakeTransport, allowance: U256) {
    transport.fund(&stables(), units(1_000_000, 18), allowance);
    transport.respond_any(THREE_POOL, "calc_token_amount(uint256[3],bool)", units(3, 18));
}

#[tokio::test]
async fn test_gas_limit_is_rounded_up() {
    let transport = Arc::new(FakeTransport::new());
    funded_three_pool(&transport, U256::MAX);
    transport.set_gas(ADD_LIQUIDITY, 100_001);
    let pool = registry(transport.clone()).get_pool("3pool").await.unwrap();

    let estimate = pool
        .estimate_gas()
        .deposit(&["1", "1", "1"], None)
        .await
        .unwrap();
    assert_eq!(estimate.execution, 100_001);
    assert_eq!(estimate.l1_data, None);

    pool.deposit(&["1", "1", "1"], None).await.unwrap();
    assert_eq!(transport.sent()[0].gas_limit, 130_002);
}

#[tokio::test]
async fn test_rollup_multiplies_execution_gas_only() {
    let transport = Arc::new(FakeTransport::new());
    funded_three_pool(&transport, U256::MAX);
    transport.set_gas(ADD_LIQUIDITY, 200_000);
    transport.set_l1_data_gas(2_500);
    let pool = registry_on(10, transport.clone())
        .get_pool("3pool")
        .await
        .unwrap();

    let estimate = pool
        .estimate_gas()
        .deposit(&["1", "1", "1"], None)
        .await
        .unwrap();
    assert_eq!(estimate.components(), vec![200_000, 2_500]);

    pool.deposit(&["1", "1", "1"], None).await.unwrap();
    assert_eq!(transport.sent()[0].gas_limit, 260_000);
}

#[tokio::test]
async fn test_legacy_pool_multiplier_override() {
    let transport = Arc::new(FakeTransport::new());
    transport.fund(&[Coin::new(COMPOUND_LP, "compound-LP", 18)], units(100, 18), U256::MAX);
    transport.respond_any(COMPOUND_ZAP, "calc_withdraw_one_coin(uint256,int128)", units(1, 18));
    let pool = registry(transport.clone()).get_pool("compound").await.unwrap();

    pool.withdraw_one_coin("1", 1, None).await.unwrap();
    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].gas_limit, 200_000);
}

#[tokio::test]
async fn test_estimate_needs_allowance() {
    let transport = Arc::new(FakeTransport::new());
    funded_three_pool(&transport, U256::ZERO);
    let pool = registry(transport.clone()).get_pool("3pool").await.unwrap();

    let err = pool
        .estimate_gas()
        .deposit(&["1", "1", "1"], None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        curvelib::CurveError::InsufficientAllowanceForEstimate { ref coins, .. } if coins.len() == 3
    ));

    let approvals = pool
        .estimate_gas()
        .deposit_approve(&["1", "1", "1"])
        .await
        .unwrap();
    assert_eq!(approvals.execution, 3 * FakeTransport::DEFAULT_GAS);
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_swap_estimate_matches_execution_path() {
    let transport = Arc::new(FakeTransport::new());
    transport.fund(&stables(), units(1_000_000, 18), U256::MAX);
    transport.respond_any(THREE_POOL, "get_dy(int128,int128,uint256)", U256::from(9_990_000u64));
    transport.set_gas("exchange(int128,int128,uint256,uint256)", 150_000);
    let pool = registry(transport.clone()).get_pool("3pool").await.unwrap();

    let estimate = pool.estimate_gas().swap(0, 1, "10", None).await.unwrap();
    assert_eq!(estimate.execution, 150_000);
    assert!(!estimate.approximated);
}
