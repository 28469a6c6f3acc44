use crate::curve::constants::LEGACY_ZAP_EXCLUDED_POOL;
use crate::curve::metadata::PoolMetadata;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationFamily {
    Deposit,
    Withdraw,
    WithdrawImbalance,
    WithdrawOneCoin,
    Swap,
    DepositWrapped,
    WithdrawWrapped,
    WithdrawImbalanceWrapped,
    WithdrawOneCoinWrapped,
    SwapWrapped,
}

impl OperationFamily {
    pub const fn method_name(self) -> &'static str {
        match self {
            OperationFamily::Deposit => "deposit",
            OperationFamily::Withdraw => "withdraw",
            OperationFamily::WithdrawImbalance => "withdraw_imbalance",
            OperationFamily::WithdrawOneCoin => "withdraw_one_coin",
            OperationFamily::Swap => "swap",
            OperationFamily::DepositWrapped => "deposit_wrapped",
            OperationFamily::WithdrawWrapped => "withdraw_wrapped",
            OperationFamily::WithdrawImbalanceWrapped => "withdraw_imbalance_wrapped",
            OperationFamily::WithdrawOneCoinWrapped => "withdraw_one_coin_wrapped",
            OperationFamily::SwapWrapped => "swap_wrapped",
        }
    }

    pub const fn is_wrapped(self) -> bool {
        matches!(
            self,
            OperationFamily::DepositWrapped
                | OperationFamily::WithdrawWrapped
                | OperationFamily::WithdrawImbalanceWrapped
                | OperationFamily::WithdrawOneCoinWrapped
                | OperationFamily::SwapWrapped
        )
    }
}

impl fmt::Display for OperationFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

/// Deposit and withdrawal families in underlying coins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LiquidityVariant {
    /// Shared zap, pool address as the leading argument.
    MetaFactory,
    /// The pool's own deposit zap.
    Zap,
    /// Swap contract, trailing `use_underlying = true`.
    LendingOrCrypto,
    /// Swap contract, base argument list.
    Plain,
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapVariant {
    /// `exchange(uint256,uint256,uint256,uint256,bool)` with `use_eth = true`.
    NativeCapable,
    /// Shared zap with the pool address leading: `exchange` on crypto
    /// metapools, `exchange_underlying` otherwise.
    MetaFactory { crypto: bool },
    /// `exchange_underlying` on the swap contract.
    Underlying,
    /// `exchange` on the swap contract.
    Plain,
}

/// Wrapped-coin deposit and withdrawal families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WrappedVariant {
    /// Base argument list.
    Direct,
    /// Trailing `use_underlying = false` selects wrapped coins.
    ExplicitWrapped,
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WrappedSwapVariant {
    /// `exchange(i, j, dx, min_dy)`.
    Exchange,
    /// `exchange(i, j, dx, min_dy, false)`.
    NativeCapable,
    Unsupported,
}

/// The variant chosen for every operation family of one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StrategySet {
    pub deposit: LiquidityVariant,
    pub withdraw: LiquidityVariant,
    pub withdraw_imbalance: LiquidityVariant,
    pub withdraw_one_coin: LiquidityVariant,
    pub swap: SwapVariant,
    pub deposit_wrapped: WrappedVariant,
    pub withdraw_wrapped: WrappedVariant,
    pub withdraw_imbalance_wrapped: WrappedVariant,
    pub withdraw_one_coin_wrapped: WrappedVariant,
    pub swap_wrapped: WrappedSwapVariant,
}

pub struct StrategyRegistry;

impl StrategyRegistry {
    /// Pure function of its inputs; the same pool always gets the same set.
    pub fn select(pool_id: &str, metadata: &PoolMetadata) -> StrategySet {
        let caps = &metadata.capabilities;
        let flags = &metadata.flags;

        StrategySet {
            deposit: Self::liquidity(pool_id, metadata, true, caps.add_liquidity_bool),
            withdraw: Self::liquidity(pool_id, metadata, true, caps.remove_liquidity_bool),
            withdraw_imbalance: if flags.is_crypto {
                LiquidityVariant::Unsupported
            } else {
                Self::liquidity(
                    pool_id,
                    metadata,
                    caps.remove_liquidity_imbalance,
                    caps.remove_liquidity_imbalance_bool,
                )
            },
            withdraw_one_coin: Self::liquidity(
                pool_id,
                metadata,
                caps.remove_liquidity_one_coin,
                caps.remove_liquidity_one_coin_bool,
            ),
            swap: Self::swap(metadata),
            deposit_wrapped: Self::wrapped(metadata, true, caps.add_liquidity_bool),
            withdraw_wrapped: Self::wrapped(metadata, true, caps.remove_liquidity_bool),
            withdraw_imbalance_wrapped: Self::wrapped(
                metadata,
                caps.remove_liquidity_imbalance && !flags.is_crypto,
                caps.remove_liquidity_imbalance_bool,
            ),
            withdraw_one_coin_wrapped: Self::wrapped(
                metadata,
                caps.remove_liquidity_one_coin,
                caps.remove_liquidity_one_coin_bool,
            ),
            swap_wrapped: if flags.is_plain || flags.is_fake {
                WrappedSwapVariant::Unsupported
            } else if caps.exchange_native {
                WrappedSwapVariant::NativeCapable
            } else {
                WrappedSwapVariant::Exchange
            },
        }
    }

    fn routes_through_meta_factory_zap(metadata: &PoolMetadata) -> bool {
        metadata.flags.is_meta_factory
            && (metadata.base_is_lending() || metadata.base_is_fake() || metadata.flags.is_crypto)
    }

    fn routes_through_zap(pool_id: &str, metadata: &PoolMetadata) -> bool {
        metadata.flags.has_zap && pool_id != LEGACY_ZAP_EXCLUDED_POOL
    }

    /// `on_swap_contract` says whether the swap contract implements the
    /// function at all; zaps always do.
    fn liquidity(
        pool_id: &str,
        metadata: &PoolMetadata,
        on_swap_contract: bool,
        trailing_bool: bool,
    ) -> LiquidityVariant {
        if Self::routes_through_meta_factory_zap(metadata) {
            LiquidityVariant::MetaFactory
        } else if Self::routes_through_zap(pool_id, metadata) {
            LiquidityVariant::Zap
        } else if !on_swap_contract || metadata.flags.is_meta {
            // a metapool's swap contract only takes wrapped coins
            LiquidityVariant::Unsupported
        } else if trailing_bool {
            LiquidityVariant::LendingOrCrypto
        } else {
            LiquidityVariant::Plain
        }
    }

    fn swap(metadata: &PoolMetadata) -> SwapVariant {
        let caps = &metadata.capabilities;
        if caps.exchange_native {
            SwapVariant::NativeCapable
        } else if Self::routes_through_meta_factory_zap(metadata) {
            SwapVariant::MetaFactory {
                crypto: metadata.flags.is_crypto,
            }
        } else if caps.exchange_underlying && !metadata.flags.is_plain {
            SwapVariant::Underlying
        } else {
            SwapVariant::Plain
        }
    }

    fn wrapped(metadata: &PoolMetadata, on_swap_contract: bool, trailing_bool: bool) -> WrappedVariant {
        let flags = &metadata.flags;
        if flags.is_plain || flags.is_fake || !on_swap_contract {
            WrappedVariant::Unsupported
        } else if (flags.is_lending || flags.is_crypto) && !flags.has_zap && trailing_bool {
            WrappedVariant::ExplicitWrapped
        } else {
            WrappedVariant::Direct
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::capabilities::ImplementationId;
    use crate::curve::metadata::PoolFlags;

    fn metadata(flags: PoolFlags, base: Option<PoolFlags>, id: ImplementationId) -> PoolMetadata {
        PoolMetadata {
            flags,
            base_flags: base,
            capabilities: id.capabilities(),
        }
    }

    #[test]
    fn plain_pool_has_no_wrapped_operations() {
        let md = metadata(
            PoolFlags {
                is_plain: true,
                ..Default::default()
            },
            None,
            ImplementationId::StableSwapV2,
        );
        let set = StrategyRegistry::select("3pool", &md);
        assert_eq!(set.deposit, LiquidityVariant::Plain);
        assert_eq!(set.withdraw_one_coin, LiquidityVariant::Plain);
        assert_eq!(set.swap, SwapVariant::Plain);
        assert_eq!(set.deposit_wrapped, WrappedVariant::Unsupported);
        assert_eq!(set.swap_wrapped, WrappedSwapVariant::Unsupported);
    }

    #[test]
    fn susd_ignores_its_zap() {
        let md = metadata(
            PoolFlags {
                has_zap: true,
                ..Default::default()
            },
            None,
            ImplementationId::LegacyPlain,
        );
        let set = StrategyRegistry::select("susd", &md);
        assert_eq!(set.deposit, LiquidityVariant::Plain);
        assert_eq!(set.withdraw_one_coin, LiquidityVariant::Unsupported);

        let set = StrategyRegistry::select("compound", &md);
        assert_eq!(set.deposit, LiquidityVariant::Zap);
        assert_eq!(set.withdraw_one_coin, LiquidityVariant::Zap);
    }

    #[test]
    fn aave_uses_the_underlying_flag_both_ways() {
        let md = metadata(
            PoolFlags {
                is_lending: true,
                ..Default::default()
            },
            None,
            ImplementationId::AaveLending,
        );
        let set = StrategyRegistry::select("aave", &md);
        assert_eq!(set.deposit, LiquidityVariant::LendingOrCrypto);
        assert_eq!(set.withdraw_imbalance, LiquidityVariant::LendingOrCrypto);
        assert_eq!(set.swap, SwapVariant::Underlying);
        assert_eq!(set.deposit_wrapped, WrappedVariant::ExplicitWrapped);
        assert_eq!(set.withdraw_one_coin_wrapped, WrappedVariant::ExplicitWrapped);
    }

    #[test]
    fn meta_factory_needs_a_lending_or_fake_base() {
        let meta_factory = PoolFlags {
            is_meta: true,
            is_factory: true,
            is_meta_factory: true,
            ..Default::default()
        };
        let lending_base = PoolFlags {
            is_lending: true,
            ..Default::default()
        };
        let plain_base = PoolFlags {
            is_plain: true,
            ..Default::default()
        };

        let set = StrategyRegistry::select(
            "factory-v2-1",
            &metadata(meta_factory, Some(lending_base), ImplementationId::FactoryMeta),
        );
        assert_eq!(set.deposit, LiquidityVariant::MetaFactory);
        assert_eq!(set.swap, SwapVariant::MetaFactory { crypto: false });
        assert_eq!(set.deposit_wrapped, WrappedVariant::Direct);

        let set = StrategyRegistry::select(
            "factory-v2-2",
            &metadata(meta_factory, Some(plain_base), ImplementationId::FactoryMeta),
        );
        assert_eq!(set.deposit, LiquidityVariant::Unsupported);
        assert_eq!(set.deposit_wrapped, WrappedVariant::Direct);
        assert_eq!(set.swap, SwapVariant::Underlying);

        let with_zap = PoolFlags {
            has_zap: true,
            ..meta_factory
        };
        let set = StrategyRegistry::select(
            "factory-v2-3",
            &metadata(with_zap, Some(plain_base), ImplementationId::FactoryMeta),
        );
        assert_eq!(set.deposit, LiquidityVariant::Zap);
        assert_eq!(set.withdraw_one_coin, LiquidityVariant::Zap);
    }

    #[test]
    fn native_exchange_wins_over_everything() {
        let md = metadata(
            PoolFlags {
                is_crypto: true,
                is_meta: true,
                is_factory: true,
                is_meta_factory: true,
                has_zap: true,
                ..Default::default()
            },
            Some(PoolFlags::default()),
            ImplementationId::CryptoFactory,
        );
        let set = StrategyRegistry::select("factory-crypto-1", &md);
        assert_eq!(set.swap, SwapVariant::NativeCapable);
        assert_eq!(set.deposit, LiquidityVariant::MetaFactory);
        assert_eq!(set.withdraw_imbalance, LiquidityVariant::Unsupported);
        assert_eq!(set.withdraw_imbalance_wrapped, WrappedVariant::Unsupported);
    }

    #[test]
    fn crypto_without_zap_passes_use_eth() {
        let md = metadata(
            PoolFlags {
                is_crypto: true,
                is_factory: true,
                ..Default::default()
            },
            None,
            ImplementationId::CryptoFactory,
        );
        let set = StrategyRegistry::select("factory-crypto-7", &md);
        assert_eq!(set.deposit, LiquidityVariant::LendingOrCrypto);
        assert_eq!(set.withdraw_one_coin, LiquidityVariant::LendingOrCrypto);
        assert_eq!(set.deposit_wrapped, WrappedVariant::ExplicitWrapped);
        assert_eq!(set.swap_wrapped, WrappedSwapVariant::NativeCapable);
    }
}
