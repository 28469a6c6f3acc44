use alloy_primitives::{Address, TxHash};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CurveError {
    #[error("{pool}: {method}: insufficient balance of {coin} (required {required}, available {available})")]
    InsufficientBalance {
        pool: String,
        method: String,
        coin: String,
        required: String,
        available: String,
    },

    #[error("{pool}: {method}: token allowance is needed to estimate gas ({coins:?} not approved)")]
    InsufficientAllowanceForEstimate {
        pool: String,
        method: String,
        coins: Vec<Address>,
    },

    #[error("{pool}: {method} doesn't exist for this pool")]
    UnsupportedOperationForPoolShape { pool: String, method: String },

    #[error("{pool}: {method}: coin index {index} out of range (pool has {n_coins} coins)")]
    CoinIndexOutOfRange {
        pool: String,
        method: String,
        index: String,
        n_coins: usize,
    },

    #[error("{pool}: {method} is only available on chain {required} (current chain {current})")]
    NetworkRestricted {
        pool: String,
        method: String,
        required: u64,
        current: u64,
    },

    #[error("Invalid amount {0:?}: {1}")]
    InvalidAmount(String, String),

    #[error("Pool not found: {0}")]
    PoolNotFound(String),

    #[error("Transaction {0} reverted")]
    TransactionReverted(TxHash),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("ABI decoding error for contract call: {0}")]
    AbiDecodeError(String),

    #[error("Pool calculation error: {0}")]
    CalculationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<serde_json::Error> for CurveError {
    fn from(err: serde_json::Error) -> Self {
        CurveError::ConfigError(err.to_string())
    }
}

impl From<alloy_sol_types::Error> for CurveError {
    fn from(err: alloy_sol_types::Error) -> Self {
        CurveError::AbiDecodeError(err.to_string())
    }
}
