use crate::errors::CurveError;
use alloy_primitives::Address;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use dashmap::DashMap;
use futures::future::try_join_all;

/// Spot USD prices per coin. Only used for crypto-pool balancing, bonuses
/// and price impact.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn usd_price(&self, coin: Address) -> Result<BigDecimal, CurveError>;

    async fn usd_prices(&self, coins: &[Address]) -> Result<Vec<BigDecimal>, CurveError> {
        try_join_all(coins.iter().map(|c| self.usd_price(*c))).await
    }
}

/// In-memory price table.
#[derive(Debug, Default)]
pub struct StaticPrices {
    prices: DashMap<Address, BigDecimal>,
}

impl StaticPrices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(self, coin: Address, price: BigDecimal) -> Self {
        self.prices.insert(coin, price);
        self
    }

    pub fn set_price(&self, coin: Address, price: BigDecimal) {
        self.prices.insert(coin, price);
    }
}

#[async_trait]
impl PriceOracle for StaticPrices {
    async fn usd_price(&self, coin: Address) -> Result<BigDecimal, CurveError> {
        self.prices
            .get(&coin)
            .map(|p| p.value().clone())
            .ok_or_else(|| CurveError::CalculationError(format!("no USD price for {coin}")))
    }
}
