mod common;

use alloy_primitives::{Address, U256, address};
use common::*;
use curvelib::core::coin::Coin;
use std::sync::Arc;

const CRV_MINTER: Address = address!("d061D61a4d941c39E5453435B6345Dc261C2fcE0");

fn lp() -> Coin {
    Coin::new(THREE_POOL_LP, "3pool-LP", 18)
}

#[tokio::test]
async fn test_stake_approves_the_gauge() {
    let transport = Arc::new(FakeTransport::new());
    transport.fund(&[lp()], units(10, 18), U256::ZERO);
    let pool = registry(transport.clone()).get_pool("3pool").await.unwrap();

    assert!(!pool.stake_is_approved("5").await.unwrap());
    pool.stake("5").await.unwrap();

    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].call.to, THREE_POOL_LP);
    assert_eq!(Address::from_word(word(&sent[0].call, 0).into()), THREE_POOL_GAUGE);
    assert_eq!(sent[1].call.to, THREE_POOL_GAUGE);
    assert_eq!(sent[1].call.signature, "deposit(uint256)");
    assert_eq!(word(&sent[1].call, 0), units(5, 18));
}

#[tokio::test]
async fn test_unstake_checks_the_staked_balance() {
    let transport = Arc::new(FakeTransport::new());
    transport.respond_any(THREE_POOL_GAUGE, "balanceOf(address)", units(2, 18));
    let pool = registry(transport.clone()).get_pool("3pool").await.unwrap();

    assert_eq!(pool.wallet_staked_balance().await.unwrap(), "2");
    assert!(matches!(
        pool.unstake("3").await,
        Err(curvelib::CurveError::InsufficientBalance { .. })
    ));

    pool.unstake("2").await.unwrap();
    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].call.signature, "withdraw(uint256)");
}

#[tokio::test]
async fn test_crv_rewards_on_mainnet() {
    let transport = Arc::new(FakeTransport::new());
    transport.respond_any(THREE_POOL_GAUGE, "claimable_tokens(address)", units(7, 17));
    let pool = registry(transport.clone()).get_pool("3pool").await.unwrap();

    assert_eq!(pool.claimable_crv().await.unwrap(), "0.7");
    pool.claim_crv().await.unwrap();

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].call.to, CRV_MINTER);
    assert_eq!(sent[0].call.signature, "mint(address)");
    assert_eq!(Address::from_word(word(&sent[0].call, 0).into()), THREE_POOL_GAUGE);
}
