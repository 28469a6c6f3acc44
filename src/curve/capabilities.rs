//! Which functions, overloads and argument types a pool contract exposes.
//!
//! The capability set of every known implementation is a fixed table. ABI
//! introspection is used only for pools whose implementation is not named
//! by their descriptor.

use crate::core::abi::IndexType;
use crate::curve::descriptor::PoolDescriptor;
use alloy_json_abi::{Function, JsonAbi};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImplementationId {
    /// Early stableswap without single-coin withdrawal (susd).
    LegacyPlain,
    /// 3pool era stableswap.
    StableSwapV2,
    /// compound, usdt, y, busd, pax: underlying only through the zap.
    LegacyLending,
    /// aave, saave, ib: `use_underlying` overloads on the swap contract.
    AaveLending,
    FactoryPlain,
    FactoryMeta,
    /// tricrypto2.
    CryptoV1,
    CryptoFactory,
    StableSwapNg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capabilities {
    pub index_type: IndexType,
    /// `balances(int128)` instead of `balances(uint256)`.
    pub balances_int128: bool,
    /// Amount arrays are `uint256[]` rather than `uint256[N]`.
    pub dynamic_arrays: bool,
    pub add_liquidity_bool: bool,
    pub remove_liquidity_bool: bool,
    pub remove_liquidity_imbalance: bool,
    pub remove_liquidity_imbalance_bool: bool,
    pub remove_liquidity_one_coin: bool,
    pub remove_liquidity_one_coin_bool: bool,
    pub exchange_underlying: bool,
    /// `exchange(uint256,uint256,uint256,uint256,bool)`.
    pub exchange_native: bool,
    pub calc_token_amount_is_deposit: bool,
    /// The deposit zap's single-coin withdrawal takes a trailing `donate_dust`.
    pub zap_donate_dust: bool,
}

const STABLE_BASE: Capabilities = Capabilities {
    index_type: IndexType::Int128,
    balances_int128: false,
    dynamic_arrays: false,
    add_liquidity_bool: false,
    remove_liquidity_bool: false,
    remove_liquidity_imbalance: true,
    remove_liquidity_imbalance_bool: false,
    remove_liquidity_one_coin: true,
    remove_liquidity_one_coin_bool: false,
    exchange_underlying: false,
    exchange_native: false,
    calc_token_amount_is_deposit: true,
    zap_donate_dust: false,
};

const CRYPTO_BASE: Capabilities = Capabilities {
    index_type: IndexType::Uint256,
    remove_liquidity_imbalance: false,
    exchange_native: true,
    ..STABLE_BASE
};

impl ImplementationId {
    pub const fn capabilities(self) -> Capabilities {
        match self {
            ImplementationId::LegacyPlain => Capabilities {
                balances_int128: true,
                remove_liquidity_one_coin: false,
                exchange_underlying: true,
                ..STABLE_BASE
            },
            ImplementationId::StableSwapV2 | ImplementationId::FactoryPlain => STABLE_BASE,
            ImplementationId::LegacyLending => Capabilities {
                balances_int128: true,
                remove_liquidity_one_coin: false,
                exchange_underlying: true,
                zap_donate_dust: true,
                ..STABLE_BASE
            },
            ImplementationId::AaveLending => Capabilities {
                add_liquidity_bool: true,
                remove_liquidity_bool: true,
                remove_liquidity_imbalance_bool: true,
                remove_liquidity_one_coin_bool: true,
                exchange_underlying: true,
                ..STABLE_BASE
            },
            ImplementationId::FactoryMeta => Capabilities {
                exchange_underlying: true,
                ..STABLE_BASE
            },
            ImplementationId::CryptoV1 => CRYPTO_BASE,
            ImplementationId::CryptoFactory => Capabilities {
                add_liquidity_bool: true,
                remove_liquidity_bool: true,
                remove_liquidity_one_coin_bool: true,
                calc_token_amount_is_deposit: false,
                ..CRYPTO_BASE
            },
            ImplementationId::StableSwapNg => Capabilities {
                dynamic_arrays: true,
                exchange_underlying: true,
                ..STABLE_BASE
            },
        }
    }

    /// Best guess from the archetype booleans of a descriptor.
    pub fn infer(descriptor: &PoolDescriptor) -> Self {
        if descriptor.is_crypto {
            if descriptor.is_factory {
                ImplementationId::CryptoFactory
            } else {
                ImplementationId::CryptoV1
            }
        } else if descriptor.is_ng {
            ImplementationId::StableSwapNg
        } else if descriptor.is_factory && descriptor.is_meta {
            ImplementationId::FactoryMeta
        } else if descriptor.is_factory {
            ImplementationId::FactoryPlain
        } else {
            ImplementationId::StableSwapV2
        }
    }
}

fn has_trailing_bool(function: &Function, base_inputs: usize) -> bool {
    function.inputs.len() == base_inputs + 1
        && function.inputs.last().is_some_and(|p| p.ty == "bool")
}

impl Capabilities {
    /// Resolves the capability set of the pool's swap contract: named
    /// implementation first, then the descriptor's ABI, then the archetype.
    pub fn resolve(descriptor: &PoolDescriptor) -> Self {
        if let Some(id) = descriptor.implementation {
            return id.capabilities();
        }
        if let Some(abi) = &descriptor.abi {
            debug!(pool = %descriptor.id, "introspecting swap contract ABI");
            return Self::from_abi(abi);
        }
        ImplementationId::infer(descriptor).capabilities()
    }

    pub fn from_abi(abi: &JsonAbi) -> Self {
        let overloads = |name: &str| abi.function(name).map(Vec::as_slice).unwrap_or_default();
        let any = |name: &str, base: usize| overloads(name).iter().any(|f| has_trailing_bool(f, base));

        let index_type = match overloads("exchange").first().and_then(|f| f.inputs.first()) {
            Some(p) if p.ty == "uint256" => IndexType::Uint256,
            _ => IndexType::Int128,
        };
        let dynamic_arrays = overloads("add_liquidity")
            .first()
            .and_then(|f| f.inputs.first())
            .is_some_and(|p| p.ty == "uint256[]");
        let exchange_native = overloads("exchange").iter().any(|f| {
            f.inputs.iter().map(|p| p.ty.as_str()).eq(["uint256", "uint256", "uint256", "uint256", "bool"])
        });

        Self {
            index_type,
            balances_int128: overloads("balances")
                .first()
                .and_then(|f| f.inputs.first())
                .is_some_and(|p| p.ty == "int128"),
            dynamic_arrays,
            add_liquidity_bool: any("add_liquidity", 2),
            remove_liquidity_bool: any("remove_liquidity", 2),
            remove_liquidity_imbalance: !overloads("remove_liquidity_imbalance").is_empty(),
            remove_liquidity_imbalance_bool: any("remove_liquidity_imbalance", 2),
            remove_liquidity_one_coin: !overloads("remove_liquidity_one_coin").is_empty(),
            remove_liquidity_one_coin_bool: any("remove_liquidity_one_coin", 3),
            exchange_underlying: !overloads("exchange_underlying").is_empty(),
            exchange_native,
            calc_token_amount_is_deposit: overloads("calc_token_amount")
                .iter()
                .any(|f| f.inputs.get(1).is_some_and(|p| p.ty == "bool")),
            zap_donate_dust: false,
        }
    }
}
