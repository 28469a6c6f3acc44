use crate::core::coin::Coin;
use crate::curve::capabilities::ImplementationId;
use crate::errors::CurveError;
use alloy_json_abi::JsonAbi;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// How a lending pool's wrapped coin converts to its underlying coin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LendingRate {
    /// cTokens: `exchangeRateStored()`.
    ExchangeRateStored,
    /// yTokens: `getPricePerFullShare()`.
    PricePerFullShare,
    /// aTokens and anything else that tracks the underlying 1:1.
    #[default]
    OneToOne,
}

/// Static description of a pool, as served by the pools API or a constants
/// table. Never mutated after loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolDescriptor {
    pub id: String,
    pub name: String,
    pub swap_address: Address,
    pub token_address: Address,
    #[serde(default)]
    pub gauge_address: Option<Address>,
    /// Deposit zap.
    #[serde(default)]
    pub deposit_address: Option<Address>,
    pub underlying_coins: Vec<Coin>,
    pub wrapped_coins: Vec<Coin>,
    /// Id of the base pool of a metapool.
    #[serde(default)]
    pub base_pool: Option<String>,
    /// Per wrapped coin: whether it is a lending-protocol token.
    #[serde(default)]
    pub use_lending: Option<Vec<bool>>,
    #[serde(default)]
    pub lending_rate: LendingRate,
    #[serde(default)]
    pub reward_tokens: Vec<Address>,
    #[serde(default)]
    pub is_lending: bool,
    #[serde(default)]
    pub is_meta: bool,
    #[serde(default)]
    pub is_crypto: bool,
    /// The pool has no wrapped representation distinct from the underlying.
    #[serde(default)]
    pub is_fake: bool,
    #[serde(default)]
    pub is_factory: bool,
    #[serde(default)]
    pub is_ng: bool,
    #[serde(default)]
    pub implementation: Option<ImplementationId>,
    /// Swap contract ABI, used only when `implementation` is unknown.
    #[serde(default)]
    pub abi: Option<JsonAbi>,
}

impl PoolDescriptor {
    pub fn from_json(json: &str) -> Result<Self, CurveError> {
        let descriptor: Self = serde_json::from_str(json)?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    pub fn n_coins(&self) -> usize {
        self.underlying_coins.len()
    }

    pub fn n_wrapped_coins(&self) -> usize {
        self.wrapped_coins.len()
    }

    pub fn validate(&self) -> Result<(), CurveError> {
        if self.underlying_coins.is_empty() || self.wrapped_coins.is_empty() {
            return Err(CurveError::ConfigError(format!("{}: pool has no coins", self.id)));
        }
        if !self.is_meta && self.underlying_coins.len() != self.wrapped_coins.len() {
            return Err(CurveError::ConfigError(format!(
                "{}: {} underlying coins but {} wrapped coins",
                self.id,
                self.underlying_coins.len(),
                self.wrapped_coins.len()
            )));
        }
        if self.is_meta && self.base_pool.is_none() {
            return Err(CurveError::ConfigError(format!(
                "{}: metapool without base pool",
                self.id
            )));
        }
        if let Some(flags) = &self.use_lending {
            if flags.len() != self.wrapped_coins.len() {
                return Err(CurveError::ConfigError(format!(
                    "{}: useLending has {} entries for {} wrapped coins",
                    self.id,
                    flags.len(),
                    self.wrapped_coins.len()
                )));
            }
        }
        Ok(())
    }
}
