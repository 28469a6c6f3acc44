use crate::errors::CurveError;
use alloy_primitives::{Address, address};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const MULTICALL3: Address = address!("cA11bde05977b3631167028862bE2a173976CA11");
pub const CRV_MINTER: Address = address!("d061D61a4d941c39E5453435B6345Dc261C2fcE0");
pub const OP_STACK_GAS_ORACLE: Address = address!("420000000000000000000000000000000000000F");

/// 1.3x, in basis points.
pub const DEFAULT_GAS_MULTIPLIER_BP: u32 = 13_000;

fn default_gas_multiplier_bp() -> u32 {
    DEFAULT_GAS_MULTIPLIER_BP
}

fn default_multicall() -> Address {
    MULTICALL3
}

/// Per-chain constants the operation layer needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub name: String,
    pub native_symbol: String,
    #[serde(default = "default_multicall")]
    pub multicall: Address,
    /// CRV minter; only deployed on Ethereum mainnet.
    #[serde(default)]
    pub minter: Option<Address>,
    /// Rollups report gas as (execution, L1 data).
    #[serde(default)]
    pub is_rollup: bool,
    #[serde(default)]
    pub l1_gas_oracle: Option<Address>,
    #[serde(default = "default_gas_multiplier_bp")]
    pub gas_multiplier_bp: u32,
}

impl NetworkConfig {
    fn new(chain_id: u64, name: &str, native_symbol: &str) -> Self {
        Self {
            chain_id,
            name: name.to_string(),
            native_symbol: native_symbol.to_string(),
            multicall: MULTICALL3,
            minter: None,
            is_rollup: false,
            l1_gas_oracle: None,
            gas_multiplier_bp: DEFAULT_GAS_MULTIPLIER_BP,
        }
    }

    fn rollup(mut self, oracle: Address) -> Self {
        self.is_rollup = true;
        self.l1_gas_oracle = Some(oracle);
        self
    }

    pub fn builtin(chain_id: u64) -> Result<Self, CurveError> {
        BUILTIN_NETWORKS
            .get(&chain_id)
            .cloned()
            .ok_or_else(|| CurveError::ConfigError(format!("no built-in network for chain {chain_id}")))
    }

    pub fn from_json(json: &str) -> Result<Self, CurveError> {
        let config: Self = serde_json::from_str(json)?;
        if config.gas_multiplier_bp < 10_000 {
            return Err(CurveError::ConfigError(format!(
                "gas multiplier {}bp is below 1x",
                config.gas_multiplier_bp
            )));
        }
        if config.is_rollup && config.l1_gas_oracle.is_none() {
            return Err(CurveError::ConfigError(format!(
                "rollup network {} has no L1 gas oracle",
                config.chain_id
            )));
        }
        Ok(config)
    }
}

pub static BUILTIN_NETWORKS: Lazy<HashMap<u64, NetworkConfig>> = Lazy::new(|| {
    let mut mainnet = NetworkConfig::new(1, "ethereum", "ETH");
    mainnet.minter = Some(CRV_MINTER);

    [
        mainnet,
        NetworkConfig::new(10, "optimism", "ETH").rollup(OP_STACK_GAS_ORACLE),
        NetworkConfig::new(100, "xdai", "XDAI"),
        NetworkConfig::new(137, "polygon", "MATIC"),
        NetworkConfig::new(250, "fantom", "FTM"),
        NetworkConfig::new(8453, "base", "ETH").rollup(OP_STACK_GAS_ORACLE),
        NetworkConfig::new(42161, "arbitrum", "ETH"),
        NetworkConfig::new(43114, "avalanche", "AVAX"),
    ]
    .into_iter()
    .map(|n| (n.chain_id, n))
    .collect()
});

/// Everything an operation needs besides its pool: network constants, the
/// signing account and the approval policy. Built once, shared behind `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurveContext {
    pub network: NetworkConfig,
    pub signer: Address,
    /// Approve `U256::MAX` instead of the exact amount.
    pub max_approve: bool,
}

impl CurveContext {
    pub fn new(network: NetworkConfig, signer: Address) -> Self {
        Self {
            network,
            signer,
            max_approve: true,
        }
    }

    pub fn for_chain(chain_id: u64, signer: Address) -> Result<Self, CurveError> {
        Ok(Self::new(NetworkConfig::builtin(chain_id)?, signer))
    }

    pub fn with_max_approve(mut self, max_approve: bool) -> Self {
        self.max_approve = max_approve;
        self
    }

    pub fn chain_id(&self) -> u64 {
        self.network.chain_id
    }
}
