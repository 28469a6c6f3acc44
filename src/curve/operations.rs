//! The uniform operation surface of [`CurvePool`].
//!
//! Every executing operation is split into a `prepare_*` step, which does
//! all reads, checks and call encoding, and the shared execute / estimate
//! paths in `pool.rs`.

use crate::core::abi::{CallArg, ContractCall, IndexType};
use crate::core::coin::Coin;
use crate::core::transport::ChainTransport;
use crate::curve::balanced;
use crate::curve::pool::{Approval, CurvePool, PreparedCall};
use crate::curve::slippage::{self, SlippageTolerance};
use crate::curve::strategies::{
    LiquidityVariant, OperationFamily, SwapVariant, WrappedSwapVariant, WrappedVariant,
};
use crate::errors::CurveError;
use crate::math::decimal::{self, Rounding};
use crate::math::{Amount, ToDecimal};
use alloy_primitives::{Address, TxHash, U256};
use bigdecimal::BigDecimal;
use std::slice;

const BONUS_SCALE: u8 = 8;

fn tolerance_or_default(tolerance: Option<&SlippageTolerance>) -> SlippageTolerance {
    tolerance.cloned().unwrap_or_default()
}

impl<T: ChainTransport + ?Sized> CurvePool<T> {
    fn liquidity_variant(&self, family: OperationFamily) -> LiquidityVariant {
        match family {
            OperationFamily::Deposit => self.strategies.deposit,
            OperationFamily::Withdraw => self.strategies.withdraw,
            OperationFamily::WithdrawImbalance => self.strategies.withdraw_imbalance,
            OperationFamily::WithdrawOneCoin => self.strategies.withdraw_one_coin,
            _ => LiquidityVariant::Unsupported,
        }
    }

    fn wrapped_variant(&self, family: OperationFamily) -> WrappedVariant {
        match family {
            OperationFamily::DepositWrapped => self.strategies.deposit_wrapped,
            OperationFamily::WithdrawWrapped => self.strategies.withdraw_wrapped,
            OperationFamily::WithdrawImbalanceWrapped => self.strategies.withdraw_imbalance_wrapped,
            OperationFamily::WithdrawOneCoinWrapped => self.strategies.withdraw_one_coin_wrapped,
            _ => WrappedVariant::Unsupported,
        }
    }

    fn ensure_supported(&self, family: OperationFamily) -> Result<(), CurveError> {
        let supported = if family == OperationFamily::Swap {
            true
        } else if family == OperationFamily::SwapWrapped {
            self.strategies.swap_wrapped != WrappedSwapVariant::Unsupported
        } else if family.is_wrapped() {
            self.wrapped_variant(family) != WrappedVariant::Unsupported
        } else {
            self.liquidity_variant(family) != LiquidityVariant::Unsupported
        };
        if supported {
            Ok(())
        } else {
            Err(self.unsupported(family))
        }
    }

    /// The shared meta zap takes the pool as its first argument.
    fn zap_is_pool_qualified(&self, variant: LiquidityVariant) -> bool {
        variant == LiquidityVariant::MetaFactory
            || (variant == LiquidityVariant::Zap && self.metadata.flags.is_meta_factory)
    }

    /// Contract an operation of `family` is sent to.
    fn target(&self, family: OperationFamily) -> Result<Address, CurveError> {
        self.ensure_supported(family)?;
        if family.is_wrapped() {
            return Ok(self.address());
        }
        if family == OperationFamily::Swap {
            return match self.strategies.swap {
                SwapVariant::MetaFactory { .. } => self.zap(family),
                _ => Ok(self.address()),
            };
        }
        match self.liquidity_variant(family) {
            LiquidityVariant::MetaFactory | LiquidityVariant::Zap => self.zap(family),
            _ => Ok(self.address()),
        }
    }

    fn liquidity_call(
        &self,
        family: OperationFamily,
        function: &str,
        mut args: Vec<CallArg>,
    ) -> Result<ContractCall, CurveError> {
        let variant = self.liquidity_variant(family);
        let to = self.target(family)?;
        if self.zap_is_pool_qualified(variant) {
            args.insert(0, CallArg::Address(self.address()));
        }
        if variant == LiquidityVariant::LendingOrCrypto {
            args.push(CallArg::Bool(true));
        }
        Ok(ContractCall::new(to, function, args))
    }

    fn wrapped_call(
        &self,
        family: OperationFamily,
        function: &str,
        mut args: Vec<CallArg>,
    ) -> Result<ContractCall, CurveError> {
        let to = self.target(family)?;
        if self.wrapped_variant(family) == WrappedVariant::ExplicitWrapped {
            args.push(CallArg::Bool(false));
        }
        Ok(ContractCall::new(to, function, args))
    }

    fn family_call(
        &self,
        family: OperationFamily,
        function: &str,
        args: Vec<CallArg>,
    ) -> Result<ContractCall, CurveError> {
        if family.is_wrapped() {
            self.wrapped_call(family, function, args)
        } else {
            self.liquidity_call(family, function, args)
        }
    }

    /// LP approval for withdrawals routed through a zap; the swap contract
    /// burns LP tokens without one.
    fn lp_approval(&self, call: &ContractCall, lp_amount: U256) -> Option<Approval> {
        (call.to != self.address()).then(|| Approval {
            spender: call.to,
            coins: vec![self.lp_token.clone()],
            amounts: vec![lp_amount],
        })
    }

    // Expected values

    /// LP minted (deposit) or burned (withdrawal) for `amounts`.
    pub(crate) async fn raw_calc_token_amount(
        &self,
        amounts: &[U256],
        is_deposit: bool,
        wrapped: bool,
    ) -> Result<U256, CurveError> {
        let flags = &self.metadata.flags;
        let caps = &self.metadata.capabilities;
        let family = match (is_deposit, wrapped) {
            (true, false) => OperationFamily::Deposit,
            (true, true) => OperationFamily::DepositWrapped,
            (false, false) => OperationFamily::WithdrawImbalance,
            (false, true) => OperationFamily::WithdrawImbalanceWrapped,
        };
        let variant = self.liquidity_variant(family);

        if !wrapped && self.zap_is_pool_qualified(variant) {
            let call = ContractCall::new(
                self.zap(family)?,
                "calc_token_amount",
                vec![
                    CallArg::Address(self.address()),
                    self.amounts_arg(amounts),
                    CallArg::Bool(is_deposit),
                ],
            );
            return self.read_u256(call).await;
        }
        if !wrapped && flags.is_meta {
            let call = ContractCall::new(
                self.zap(family)?,
                "calc_token_amount",
                vec![self.amounts_arg(amounts), CallArg::Bool(is_deposit)],
            );
            return self.read_u256(call).await;
        }

        let amounts = if !wrapped && flags.is_lending {
            let rates = self.raw_rates().await?;
            amounts
                .iter()
                .zip(&rates)
                .map(|(a, rate)| {
                    a.checked_mul(crate::curve::constants::PRECISION)
                        .and_then(|v| v.checked_div(*rate))
                        .ok_or_else(|| CurveError::CalculationError("wrapped amount conversion".into()))
                })
                .collect::<Result<Vec<_>, _>>()?
        } else {
            amounts.to_vec()
        };
        let mut args = vec![self.amounts_arg(&amounts)];
        if caps.calc_token_amount_is_deposit {
            args.push(CallArg::Bool(is_deposit));
        }
        self.read_u256(ContractCall::new(self.address(), "calc_token_amount", args))
            .await
    }

    pub(crate) async fn raw_withdraw_expected(&self, lp: U256, wrapped: bool) -> Result<Vec<U256>, CurveError> {
        let snapshot = self.snapshot(!wrapped).await?;
        if snapshot.lp_supply.is_zero() {
            return Ok(vec![U256::ZERO; snapshot.reserves.len()]);
        }
        snapshot
            .reserves
            .iter()
            .map(|r| {
                r.checked_mul(lp)
                    .map(|v| v / snapshot.lp_supply)
                    .ok_or_else(|| CurveError::CalculationError("withdraw expected overflow".into()))
            })
            .collect()
    }

    pub(crate) async fn raw_withdraw_one_coin_expected(
        &self,
        lp: U256,
        index: usize,
        wrapped: bool,
    ) -> Result<U256, CurveError> {
        let family = if wrapped {
            OperationFamily::WithdrawOneCoinWrapped
        } else {
            OperationFamily::WithdrawOneCoin
        };
        self.check_index(family, index)?;
        let to = self.target(family)?;
        let mut args = vec![CallArg::Uint(lp), self.index_arg(index)];
        if !wrapped && self.zap_is_pool_qualified(self.strategies.withdraw_one_coin) {
            args.insert(0, CallArg::Address(self.address()));
        }
        self.read_u256(ContractCall::new(to, "calc_withdraw_one_coin", args))
            .await
    }

    pub(crate) async fn raw_swap_expected(
        &self,
        i: usize,
        j: usize,
        dx: U256,
        wrapped: bool,
    ) -> Result<U256, CurveError> {
        let family = if wrapped {
            OperationFamily::SwapWrapped
        } else {
            OperationFamily::Swap
        };
        self.check_index(family, i)?;
        self.check_index(family, j)?;
        self.ensure_supported(family)?;
        let indices = [self.index_arg(i), self.index_arg(j), CallArg::Uint(dx)];
        let call = if wrapped {
            ContractCall::new(self.address(), "get_dy", indices.to_vec())
        } else {
            match self.strategies.swap {
                SwapVariant::NativeCapable | SwapVariant::Plain => {
                    ContractCall::new(self.address(), "get_dy", indices.to_vec())
                }
                SwapVariant::Underlying | SwapVariant::MetaFactory { crypto: false } => {
                    ContractCall::new(self.address(), "get_dy_underlying", indices.to_vec())
                }
                SwapVariant::MetaFactory { crypto: true } => {
                    let mut args = vec![CallArg::Address(self.address())];
                    args.extend(indices);
                    ContractCall::new(self.zap(family)?, "get_dy", args)
                }
            }
        };
        self.read_u256(call).await
    }

    // Deposit

    async fn prepare_deposit_family<A: ToDecimal>(
        &self,
        family: OperationFamily,
        amounts: &[A],
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<PreparedCall, CurveError> {
        self.ensure_supported(family)?;
        let coins = self.coins_for(family);
        let raw = self.parse_amounts(family, amounts)?;
        self.check_balances(family, coins, &raw).await?;

        let expected = self
            .raw_calc_token_amount(&raw, true, family.is_wrapped())
            .await?;
        let min_mint = slippage::min_received(self.lp_token.amount(expected), &tolerance_or_default(tolerance))?;
        let call = self
            .family_call(
                family,
                "add_liquidity",
                vec![self.amounts_arg(&raw), CallArg::Uint(min_mint.bound.raw())],
            )?
            .with_value(Self::native_value(coins, &raw));
        let approval = Approval {
            spender: call.to,
            coins: coins.to_vec(),
            amounts: raw,
        };
        Ok(PreparedCall::new(family, call, Some(approval)))
    }

    pub(crate) async fn prepare_deposit<A: ToDecimal>(
        &self,
        amounts: &[A],
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<PreparedCall, CurveError> {
        self.prepare_deposit_family(OperationFamily::Deposit, amounts, tolerance)
            .await
    }

    pub(crate) async fn prepare_deposit_wrapped<A: ToDecimal>(
        &self,
        amounts: &[A],
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<PreparedCall, CurveError> {
        self.prepare_deposit_family(OperationFamily::DepositWrapped, amounts, tolerance)
            .await
    }

    pub(crate) fn deposit_approval<A: ToDecimal>(
        &self,
        family: OperationFamily,
        amounts: &[A],
    ) -> Result<Approval, CurveError> {
        let raw = self.parse_amounts(family, amounts)?;
        Ok(Approval {
            spender: self.target(family)?,
            coins: self.coins_for(family).to_vec(),
            amounts: raw,
        })
    }

    pub async fn deposit_expected<A: ToDecimal>(&self, amounts: &[A]) -> Result<String, CurveError> {
        self.ensure_supported(OperationFamily::Deposit)?;
        let raw = self.parse_amounts(OperationFamily::Deposit, amounts)?;
        Ok(self.lp_token.format(self.raw_calc_token_amount(&raw, true, false).await?))
    }

    pub async fn deposit_wrapped_expected<A: ToDecimal>(&self, amounts: &[A]) -> Result<String, CurveError> {
        self.ensure_supported(OperationFamily::DepositWrapped)?;
        let raw = self.parse_amounts(OperationFamily::DepositWrapped, amounts)?;
        Ok(self.lp_token.format(self.raw_calc_token_amount(&raw, true, true).await?))
    }

    async fn balanced_amounts_for(&self, family: OperationFamily) -> Result<Vec<String>, CurveError> {
        self.ensure_supported(family)?;
        let coins = self.coins_for(family);
        let (snapshot, wallet) = self
            .snapshot_with(!family.is_wrapped(), &self.wallet_balance_calls(coins))
            .await?;
        let reserves = self.to_decimals(coins, &snapshot.reserves);
        let wallet = self.to_decimals(coins, &wallet);
        let decimals: Vec<u8> = coins.iter().map(|c| c.decimals).collect();

        let amounts = if self.metadata.flags.is_crypto {
            let prices = self.usd_prices(coins).await?;
            balanced::balanced_amounts_usd(&reserves, &wallet, &prices, &decimals)?
        } else {
            balanced::balanced_amounts(&reserves, &wallet, &decimals)?
        };
        Ok(amounts
            .iter()
            .zip(coins)
            .map(|(a, c)| decimal::plain_string(a, c.decimals))
            .collect())
    }

    pub async fn deposit_balanced_amounts(&self) -> Result<Vec<String>, CurveError> {
        self.balanced_amounts_for(OperationFamily::Deposit).await
    }

    pub async fn deposit_wrapped_balanced_amounts(&self) -> Result<Vec<String>, CurveError> {
        self.balanced_amounts_for(OperationFamily::DepositWrapped)
            .await
    }

    pub async fn deposit_is_approved<A: ToDecimal>(&self, amounts: &[A]) -> Result<bool, CurveError> {
        self.is_approved(self.deposit_approval(OperationFamily::Deposit, amounts)?)
            .await
    }

    pub async fn deposit_approve<A: ToDecimal>(&self, amounts: &[A]) -> Result<Vec<TxHash>, CurveError> {
        self.approve(self.deposit_approval(OperationFamily::Deposit, amounts)?)
            .await
    }

    pub async fn deposit<A: ToDecimal>(
        &self,
        amounts: &[A],
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<TxHash, CurveError> {
        let prepared = self.prepare_deposit(amounts, tolerance).await?;
        self.execute(prepared).await
    }

    pub async fn deposit_wrapped_is_approved<A: ToDecimal>(&self, amounts: &[A]) -> Result<bool, CurveError> {
        self.is_approved(self.deposit_approval(OperationFamily::DepositWrapped, amounts)?)
            .await
    }

    pub async fn deposit_wrapped_approve<A: ToDecimal>(&self, amounts: &[A]) -> Result<Vec<TxHash>, CurveError> {
        self.approve(self.deposit_approval(OperationFamily::DepositWrapped, amounts)?)
            .await
    }

    pub async fn deposit_wrapped<A: ToDecimal>(
        &self,
        amounts: &[A],
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<TxHash, CurveError> {
        let prepared = self.prepare_deposit_wrapped(amounts, tolerance).await?;
        self.execute(prepared).await
    }

    /// Percent more LP than a balanced deposit of the same value would mint.
    pub async fn deposit_bonus<A: ToDecimal>(&self, amounts: &[A]) -> Result<String, CurveError> {
        let family = OperationFamily::Deposit;
        self.ensure_supported(family)?;
        let raw = self.parse_amounts(family, amounts)?;
        let balanced = self.same_value_balanced_raw(&raw).await?;

        let actual = self.raw_calc_token_amount(&raw, true, false).await?;
        let reference = self.raw_calc_token_amount(&balanced, true, false).await?;
        let bonus = slippage::bonus_on_received(
            &self.lp_token.amount(actual).to_decimal(),
            &self.lp_token.amount(reference).to_decimal(),
        )?;
        Ok(decimal::plain_string(&bonus, BONUS_SCALE))
    }

    /// `raw` redistributed over the underlying coins in reserve ratios with
    /// the same total value.
    async fn same_value_balanced_raw(&self, raw: &[U256]) -> Result<Vec<U256>, CurveError> {
        let coins = self.underlying_coins();
        let reserves = self.snapshot(true).await?.reserves;
        let prices = if self.metadata.flags.is_crypto {
            Some(self.usd_prices(coins).await?)
        } else {
            None
        };
        let balanced = balanced::same_value_balanced(
            &self.to_decimals(coins, raw),
            &self.to_decimals(coins, &reserves),
            prices.as_deref(),
        )?;
        balanced
            .iter()
            .zip(coins)
            .map(|(v, c)| decimal::to_raw(v, c.decimals, Rounding::Down))
            .collect()
    }

    // Withdraw

    async fn prepare_withdraw_family<A: ToDecimal + ?Sized>(
        &self,
        family: OperationFamily,
        lp_amount: &A,
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<PreparedCall, CurveError> {
        self.ensure_supported(family)?;
        let lp = self.lp_token.parse(lp_amount)?;
        self.check_balances(family, slice::from_ref(&self.lp_token), &[lp])
            .await?;

        let tolerance = tolerance_or_default(tolerance);
        let coins = self.coins_for(family);
        let expected = self.raw_withdraw_expected(lp, family.is_wrapped()).await?;
        let min_amounts = coins
            .iter()
            .zip(&expected)
            .map(|(c, e)| Ok(slippage::min_received(c.amount(*e), &tolerance)?.bound.raw()))
            .collect::<Result<Vec<_>, CurveError>>()?;
        let call = self.family_call(
            family,
            "remove_liquidity",
            vec![CallArg::Uint(lp), self.amounts_arg(&min_amounts)],
        )?;
        let approval = self.lp_approval(&call, lp);
        Ok(PreparedCall::new(family, call, approval))
    }

    pub(crate) async fn prepare_withdraw<A: ToDecimal + ?Sized>(
        &self,
        lp_amount: &A,
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<PreparedCall, CurveError> {
        self.prepare_withdraw_family(OperationFamily::Withdraw, lp_amount, tolerance)
            .await
    }

    pub(crate) async fn prepare_withdraw_wrapped<A: ToDecimal + ?Sized>(
        &self,
        lp_amount: &A,
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<PreparedCall, CurveError> {
        self.prepare_withdraw_family(OperationFamily::WithdrawWrapped, lp_amount, tolerance)
            .await
    }

    /// LP approval needed by a withdrawal family, `None` when the swap
    /// contract burns the LP tokens itself.
    pub(crate) fn lp_approval_for<A: ToDecimal + ?Sized>(
        &self,
        family: OperationFamily,
        lp_amount: &A,
    ) -> Result<Option<Approval>, CurveError> {
        let lp = self.lp_token.parse(lp_amount)?;
        let to = self.target(family)?;
        Ok((to != self.address()).then(|| Approval {
            spender: to,
            coins: vec![self.lp_token.clone()],
            amounts: vec![lp],
        }))
    }

    pub async fn withdraw_expected<A: ToDecimal + ?Sized>(&self, lp_amount: &A) -> Result<Vec<String>, CurveError> {
        self.ensure_supported(OperationFamily::Withdraw)?;
        let raw = self
            .raw_withdraw_expected(self.lp_token.parse(lp_amount)?, false)
            .await?;
        Ok(self.format_amounts(self.underlying_coins(), &raw))
    }

    pub async fn withdraw_wrapped_expected<A: ToDecimal + ?Sized>(
        &self,
        lp_amount: &A,
    ) -> Result<Vec<String>, CurveError> {
        self.ensure_supported(OperationFamily::WithdrawWrapped)?;
        let raw = self
            .raw_withdraw_expected(self.lp_token.parse(lp_amount)?, true)
            .await?;
        Ok(self.format_amounts(self.wrapped_coins(), &raw))
    }

    pub async fn withdraw_is_approved<A: ToDecimal + ?Sized>(&self, lp_amount: &A) -> Result<bool, CurveError> {
        self.maybe_is_approved(self.lp_approval_for(OperationFamily::Withdraw, lp_amount)?)
            .await
    }

    pub async fn withdraw_approve<A: ToDecimal + ?Sized>(&self, lp_amount: &A) -> Result<Vec<TxHash>, CurveError> {
        self.maybe_approve(self.lp_approval_for(OperationFamily::Withdraw, lp_amount)?)
            .await
    }

    pub async fn withdraw<A: ToDecimal + ?Sized>(
        &self,
        lp_amount: &A,
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<TxHash, CurveError> {
        let prepared = self.prepare_withdraw(lp_amount, tolerance).await?;
        self.execute(prepared).await
    }

    pub async fn withdraw_wrapped_is_approved<A: ToDecimal + ?Sized>(&self, lp_amount: &A) -> Result<bool, CurveError> {
        self.maybe_is_approved(self.lp_approval_for(OperationFamily::WithdrawWrapped, lp_amount)?)
            .await
    }

    pub async fn withdraw_wrapped_approve<A: ToDecimal + ?Sized>(
        &self,
        lp_amount: &A,
    ) -> Result<Vec<TxHash>, CurveError> {
        self.maybe_approve(self.lp_approval_for(OperationFamily::WithdrawWrapped, lp_amount)?)
            .await
    }

    pub async fn withdraw_wrapped<A: ToDecimal + ?Sized>(
        &self,
        lp_amount: &A,
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<TxHash, CurveError> {
        let prepared = self.prepare_withdraw_wrapped(lp_amount, tolerance).await?;
        self.execute(prepared).await
    }

    // Withdraw imbalance

    async fn prepare_withdraw_imbalance_family<A: ToDecimal>(
        &self,
        family: OperationFamily,
        amounts: &[A],
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<PreparedCall, CurveError> {
        self.ensure_supported(family)?;
        let raw = self.parse_amounts(family, amounts)?;
        let expected = self
            .raw_calc_token_amount(&raw, false, family.is_wrapped())
            .await?;
        self.check_balances(family, slice::from_ref(&self.lp_token), &[expected])
            .await?;

        let max_burn = slippage::max_burn(self.lp_token.amount(expected), &tolerance_or_default(tolerance))?;
        let max_burn = max_burn.bound.raw();
        let call = self.family_call(
            family,
            "remove_liquidity_imbalance",
            vec![self.amounts_arg(&raw), CallArg::Uint(max_burn)],
        )?;
        let approval = self.lp_approval(&call, max_burn);
        Ok(PreparedCall::new(family, call, approval))
    }

    pub(crate) async fn prepare_withdraw_imbalance<A: ToDecimal>(
        &self,
        amounts: &[A],
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<PreparedCall, CurveError> {
        self.prepare_withdraw_imbalance_family(OperationFamily::WithdrawImbalance, amounts, tolerance)
            .await
    }

    pub(crate) async fn prepare_withdraw_imbalance_wrapped<A: ToDecimal>(
        &self,
        amounts: &[A],
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<PreparedCall, CurveError> {
        self.prepare_withdraw_imbalance_family(OperationFamily::WithdrawImbalanceWrapped, amounts, tolerance)
            .await
    }

    /// The imbalanced withdrawal approves its worst-case burn.
    pub(crate) async fn imbalance_approval<A: ToDecimal>(
        &self,
        family: OperationFamily,
        amounts: &[A],
    ) -> Result<Option<Approval>, CurveError> {
        let to = self.target(family)?;
        if to == self.address() {
            return Ok(None);
        }
        let raw = self.parse_amounts(family, amounts)?;
        let expected = self
            .raw_calc_token_amount(&raw, false, family.is_wrapped())
            .await?;
        let max_burn = slippage::max_burn(self.lp_token.amount(expected), &SlippageTolerance::default())?;
        Ok(Some(Approval {
            spender: to,
            coins: vec![self.lp_token.clone()],
            amounts: vec![max_burn.bound.raw()],
        }))
    }

    pub async fn withdraw_imbalance_expected<A: ToDecimal>(&self, amounts: &[A]) -> Result<String, CurveError> {
        self.ensure_supported(OperationFamily::WithdrawImbalance)?;
        let raw = self.parse_amounts(OperationFamily::WithdrawImbalance, amounts)?;
        Ok(self.lp_token.format(self.raw_calc_token_amount(&raw, false, false).await?))
    }

    pub async fn withdraw_imbalance_wrapped_expected<A: ToDecimal>(
        &self,
        amounts: &[A],
    ) -> Result<String, CurveError> {
        self.ensure_supported(OperationFamily::WithdrawImbalanceWrapped)?;
        let raw = self.parse_amounts(OperationFamily::WithdrawImbalanceWrapped, amounts)?;
        Ok(self.lp_token.format(self.raw_calc_token_amount(&raw, false, true).await?))
    }

    pub async fn withdraw_imbalance_is_approved<A: ToDecimal>(&self, amounts: &[A]) -> Result<bool, CurveError> {
        self.maybe_is_approved(self.imbalance_approval(OperationFamily::WithdrawImbalance, amounts).await?)
            .await
    }

    pub async fn withdraw_imbalance_approve<A: ToDecimal>(&self, amounts: &[A]) -> Result<Vec<TxHash>, CurveError> {
        self.maybe_approve(self.imbalance_approval(OperationFamily::WithdrawImbalance, amounts).await?)
            .await
    }

    pub async fn withdraw_imbalance<A: ToDecimal>(
        &self,
        amounts: &[A],
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<TxHash, CurveError> {
        let prepared = self.prepare_withdraw_imbalance(amounts, tolerance).await?;
        self.execute(prepared).await
    }

    pub async fn withdraw_imbalance_wrapped_is_approved<A: ToDecimal>(
        &self,
        amounts: &[A],
    ) -> Result<bool, CurveError> {
        let approval = self
            .imbalance_approval(OperationFamily::WithdrawImbalanceWrapped, amounts)
            .await?;
        self.maybe_is_approved(approval).await
    }

    pub async fn withdraw_imbalance_wrapped_approve<A: ToDecimal>(
        &self,
        amounts: &[A],
    ) -> Result<Vec<TxHash>, CurveError> {
        let approval = self
            .imbalance_approval(OperationFamily::WithdrawImbalanceWrapped, amounts)
            .await?;
        self.maybe_approve(approval).await
    }

    pub async fn withdraw_imbalance_wrapped<A: ToDecimal>(
        &self,
        amounts: &[A],
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<TxHash, CurveError> {
        let prepared = self
            .prepare_withdraw_imbalance_wrapped(amounts, tolerance)
            .await?;
        self.execute(prepared).await
    }

    /// Percent fewer LP burned than by a balanced withdrawal of the same value.
    pub async fn withdraw_imbalance_bonus<A: ToDecimal>(&self, amounts: &[A]) -> Result<String, CurveError> {
        let family = OperationFamily::WithdrawImbalance;
        self.ensure_supported(family)?;
        let raw = self.parse_amounts(family, amounts)?;
        let balanced = self.same_value_balanced_raw(&raw).await?;

        let actual = self.raw_calc_token_amount(&raw, false, false).await?;
        let reference = self.raw_calc_token_amount(&balanced, false, false).await?;
        let bonus = slippage::bonus_on_burned(
            &self.lp_token.amount(actual).to_decimal(),
            &self.lp_token.amount(reference).to_decimal(),
        )?;
        Ok(decimal::plain_string(&bonus, BONUS_SCALE))
    }

    // Withdraw one coin

    async fn prepare_withdraw_one_coin_family<A: ToDecimal + ?Sized>(
        &self,
        family: OperationFamily,
        lp_amount: &A,
        index: usize,
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<PreparedCall, CurveError> {
        self.ensure_supported(family)?;
        self.check_index(family, index)?;
        let lp = self.lp_token.parse(lp_amount)?;
        self.check_balances(family, slice::from_ref(&self.lp_token), &[lp])
            .await?;

        let coin = &self.coins_for(family)[index];
        let expected = self
            .raw_withdraw_one_coin_expected(lp, index, family.is_wrapped())
            .await?;
        let min_amount = slippage::min_received(coin.amount(expected), &tolerance_or_default(tolerance))?;
        let mut args = vec![CallArg::Uint(lp), self.index_arg(index), CallArg::Uint(min_amount.bound.raw())];
        if self.liquidity_variant(family) == LiquidityVariant::Zap && self.metadata.capabilities.zap_donate_dust {
            args.push(CallArg::Bool(true));
        }
        let call = self.family_call(family, "remove_liquidity_one_coin", args)?;
        let approval = self.lp_approval(&call, lp);
        Ok(PreparedCall::new(family, call, approval))
    }

    pub(crate) async fn prepare_withdraw_one_coin<A: ToDecimal + ?Sized>(
        &self,
        lp_amount: &A,
        index: usize,
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<PreparedCall, CurveError> {
        self.prepare_withdraw_one_coin_family(OperationFamily::WithdrawOneCoin, lp_amount, index, tolerance)
            .await
    }

    pub(crate) async fn prepare_withdraw_one_coin_wrapped<A: ToDecimal + ?Sized>(
        &self,
        lp_amount: &A,
        index: usize,
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<PreparedCall, CurveError> {
        self.prepare_withdraw_one_coin_family(
            OperationFamily::WithdrawOneCoinWrapped,
            lp_amount,
            index,
            tolerance,
        )
        .await
    }

    pub async fn withdraw_one_coin_expected<A: ToDecimal + ?Sized>(
        &self,
        lp_amount: &A,
        index: usize,
    ) -> Result<String, CurveError> {
        let raw = self
            .raw_withdraw_one_coin_expected(self.lp_token.parse(lp_amount)?, index, false)
            .await?;
        Ok(self.underlying_coins()[index].format(raw))
    }

    pub async fn withdraw_one_coin_wrapped_expected<A: ToDecimal + ?Sized>(
        &self,
        lp_amount: &A,
        index: usize,
    ) -> Result<String, CurveError> {
        let raw = self
            .raw_withdraw_one_coin_expected(self.lp_token.parse(lp_amount)?, index, true)
            .await?;
        Ok(self.wrapped_coins()[index].format(raw))
    }

    pub async fn withdraw_one_coin_is_approved<A: ToDecimal + ?Sized>(
        &self,
        lp_amount: &A,
    ) -> Result<bool, CurveError> {
        self.maybe_is_approved(self.lp_approval_for(OperationFamily::WithdrawOneCoin, lp_amount)?)
            .await
    }

    pub async fn withdraw_one_coin_approve<A: ToDecimal + ?Sized>(
        &self,
        lp_amount: &A,
    ) -> Result<Vec<TxHash>, CurveError> {
        self.maybe_approve(self.lp_approval_for(OperationFamily::WithdrawOneCoin, lp_amount)?)
            .await
    }

    pub async fn withdraw_one_coin<A: ToDecimal + ?Sized>(
        &self,
        lp_amount: &A,
        index: usize,
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<TxHash, CurveError> {
        let prepared = self
            .prepare_withdraw_one_coin(lp_amount, index, tolerance)
            .await?;
        self.execute(prepared).await
    }

    pub async fn withdraw_one_coin_wrapped_is_approved<A: ToDecimal + ?Sized>(
        &self,
        lp_amount: &A,
    ) -> Result<bool, CurveError> {
        self.maybe_is_approved(self.lp_approval_for(OperationFamily::WithdrawOneCoinWrapped, lp_amount)?)
            .await
    }

    pub async fn withdraw_one_coin_wrapped_approve<A: ToDecimal + ?Sized>(
        &self,
        lp_amount: &A,
    ) -> Result<Vec<TxHash>, CurveError> {
        self.maybe_approve(self.lp_approval_for(OperationFamily::WithdrawOneCoinWrapped, lp_amount)?)
            .await
    }

    pub async fn withdraw_one_coin_wrapped<A: ToDecimal + ?Sized>(
        &self,
        lp_amount: &A,
        index: usize,
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<TxHash, CurveError> {
        let prepared = self
            .prepare_withdraw_one_coin_wrapped(lp_amount, index, tolerance)
            .await?;
        self.execute(prepared).await
    }

    /// Percent more value received than a balanced withdrawal of the same LP
    /// amount. Crypto pools compare in USD.
    pub async fn withdraw_one_coin_bonus<A: ToDecimal + ?Sized>(
        &self,
        lp_amount: &A,
        index: usize,
    ) -> Result<String, CurveError> {
        let lp = self.lp_token.parse(lp_amount)?;
        let single = self.raw_withdraw_one_coin_expected(lp, index, false).await?;
        let balanced = self.raw_withdraw_expected(lp, false).await?;

        let coins = self.underlying_coins();
        let prices = if self.metadata.flags.is_crypto {
            self.usd_prices(coins).await?
        } else {
            vec![BigDecimal::from(1); coins.len()]
        };
        let single_value = coins[index].amount(single).to_decimal() * &prices[index];
        let balanced_value: BigDecimal = self
            .to_decimals(coins, &balanced)
            .iter()
            .zip(&prices)
            .map(|(amount, price)| amount * price)
            .sum();
        let bonus = slippage::bonus_on_received(&single_value, &balanced_value)?;
        Ok(decimal::plain_string(&bonus, BONUS_SCALE))
    }

    // Swap

    fn swap_call(
        &self,
        family: OperationFamily,
        i: usize,
        j: usize,
        dx: U256,
        min_dy: U256,
    ) -> Result<ContractCall, CurveError> {
        let to = self.target(family)?;
        let base = vec![self.index_arg(i), self.index_arg(j), CallArg::Uint(dx), CallArg::Uint(min_dy)];
        let native = |use_eth: bool| {
            ContractCall::new(
                to,
                "exchange",
                vec![
                    CallArg::Index(i, IndexType::Uint256),
                    CallArg::Index(j, IndexType::Uint256),
                    CallArg::Uint(dx),
                    CallArg::Uint(min_dy),
                    CallArg::Bool(use_eth),
                ],
            )
        };
        let qualified = |function: &str| {
            let mut args = vec![CallArg::Address(self.address())];
            args.extend(base.iter().cloned());
            ContractCall::new(to, function, args)
        };

        Ok(if family == OperationFamily::SwapWrapped {
            match self.strategies.swap_wrapped {
                WrappedSwapVariant::NativeCapable => native(false),
                WrappedSwapVariant::Exchange => ContractCall::new(to, "exchange", base.clone()),
                WrappedSwapVariant::Unsupported => return Err(self.unsupported(family)),
            }
        } else {
            match self.strategies.swap {
                SwapVariant::NativeCapable => native(true),
                SwapVariant::MetaFactory { crypto: true } => qualified("exchange"),
                SwapVariant::MetaFactory { crypto: false } => qualified("exchange_underlying"),
                SwapVariant::Underlying => ContractCall::new(to, "exchange_underlying", base.clone()),
                SwapVariant::Plain => ContractCall::new(to, "exchange", base.clone()),
            }
        })
    }

    async fn prepare_swap_family<A: ToDecimal + ?Sized>(
        &self,
        family: OperationFamily,
        i: usize,
        j: usize,
        amount: &A,
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<PreparedCall, CurveError> {
        self.ensure_supported(family)?;
        self.check_index(family, i)?;
        self.check_index(family, j)?;
        let coins = self.coins_for(family);
        let (coin_in, coin_out) = (&coins[i], &coins[j]);
        let dx = coin_in.parse(amount)?;
        self.check_balances(family, slice::from_ref(coin_in), &[dx])
            .await?;

        let expected = self
            .raw_swap_expected(i, j, dx, family.is_wrapped())
            .await?;
        let min_dy = slippage::min_received(coin_out.amount(expected), &tolerance_or_default(tolerance))?;
        let call = self.swap_call(family, i, j, dx, min_dy.bound.raw())?;
        let call = if coin_in.is_native() {
            call.with_value(dx)
        } else {
            call
        };
        let approval = Approval {
            spender: call.to,
            coins: vec![coin_in.clone()],
            amounts: vec![dx],
        };
        Ok(PreparedCall::new(family, call, Some(approval)))
    }

    pub(crate) async fn prepare_swap<A: ToDecimal + ?Sized>(
        &self,
        i: usize,
        j: usize,
        amount: &A,
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<PreparedCall, CurveError> {
        self.prepare_swap_family(OperationFamily::Swap, i, j, amount, tolerance)
            .await
    }

    pub(crate) async fn prepare_swap_wrapped<A: ToDecimal + ?Sized>(
        &self,
        i: usize,
        j: usize,
        amount: &A,
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<PreparedCall, CurveError> {
        self.prepare_swap_family(OperationFamily::SwapWrapped, i, j, amount, tolerance)
            .await
    }

    pub(crate) fn swap_approval<A: ToDecimal + ?Sized>(
        &self,
        family: OperationFamily,
        i: usize,
        amount: &A,
    ) -> Result<Approval, CurveError> {
        self.check_index(family, i)?;
        let coin = &self.coins_for(family)[i];
        Ok(Approval {
            spender: self.target(family)?,
            coins: vec![coin.clone()],
            amounts: vec![coin.parse(amount)?],
        })
    }

    pub async fn swap_expected<A: ToDecimal + ?Sized>(
        &self,
        i: usize,
        j: usize,
        amount: &A,
    ) -> Result<String, CurveError> {
        self.check_index(OperationFamily::Swap, i)?;
        self.check_index(OperationFamily::Swap, j)?;
        let coins = self.underlying_coins();
        let dx = coins[i].parse(amount)?;
        Ok(coins[j].format(self.raw_swap_expected(i, j, dx, false).await?))
    }

    pub async fn swap_wrapped_expected<A: ToDecimal + ?Sized>(
        &self,
        i: usize,
        j: usize,
        amount: &A,
    ) -> Result<String, CurveError> {
        self.check_index(OperationFamily::SwapWrapped, i)?;
        self.check_index(OperationFamily::SwapWrapped, j)?;
        let coins = self.wrapped_coins();
        let dx = coins[i].parse(amount)?;
        Ok(coins[j].format(self.raw_swap_expected(i, j, dx, true).await?))
    }

    pub async fn swap_is_approved<A: ToDecimal + ?Sized>(&self, i: usize, amount: &A) -> Result<bool, CurveError> {
        self.is_approved(self.swap_approval(OperationFamily::Swap, i, amount)?)
            .await
    }

    pub async fn swap_approve<A: ToDecimal + ?Sized>(&self, i: usize, amount: &A) -> Result<Vec<TxHash>, CurveError> {
        self.approve(self.swap_approval(OperationFamily::Swap, i, amount)?)
            .await
    }

    pub async fn swap<A: ToDecimal + ?Sized>(
        &self,
        i: usize,
        j: usize,
        amount: &A,
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<TxHash, CurveError> {
        let prepared = self.prepare_swap(i, j, amount, tolerance).await?;
        self.execute(prepared).await
    }

    pub async fn swap_wrapped_is_approved<A: ToDecimal + ?Sized>(
        &self,
        i: usize,
        amount: &A,
    ) -> Result<bool, CurveError> {
        self.is_approved(self.swap_approval(OperationFamily::SwapWrapped, i, amount)?)
            .await
    }

    pub async fn swap_wrapped_approve<A: ToDecimal + ?Sized>(
        &self,
        i: usize,
        amount: &A,
    ) -> Result<Vec<TxHash>, CurveError> {
        self.approve(self.swap_approval(OperationFamily::SwapWrapped, i, amount)?)
            .await
    }

    pub async fn swap_wrapped<A: ToDecimal + ?Sized>(
        &self,
        i: usize,
        j: usize,
        amount: &A,
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<TxHash, CurveError> {
        let prepared = self.prepare_swap_wrapped(i, j, amount, tolerance).await?;
        self.execute(prepared).await
    }

    async fn price_impact_for(&self, i: usize, j: usize, dx: U256, wrapped: bool) -> Result<String, CurveError> {
        let family = if wrapped {
            OperationFamily::SwapWrapped
        } else {
            OperationFamily::Swap
        };
        let coins = self.coins_for(family);
        let (coin_in, coin_out) = (&coins[i], &coins[j]);
        // a hundredth of one coin, or the whole trade if it is smaller
        let unit = U256::from(10u64).pow(U256::from(coin_in.decimals.saturating_sub(2)));
        let small = dx.min(unit);

        let small_out = self.raw_swap_expected(i, j, small, wrapped).await?;
        let out = self.raw_swap_expected(i, j, dx, wrapped).await?;
        let impact = slippage::price_impact(
            &coin_in.amount(small).to_decimal(),
            &coin_out.amount(small_out).to_decimal(),
            &coin_in.amount(dx).to_decimal(),
            &coin_out.amount(out).to_decimal(),
        )?;
        Ok(decimal::plain_string(&impact, BONUS_SCALE))
    }

    /// Percent by which the trade's rate falls short of a small trade's rate.
    pub async fn swap_price_impact<A: ToDecimal + ?Sized>(
        &self,
        i: usize,
        j: usize,
        amount: &A,
    ) -> Result<String, CurveError> {
        self.check_index(OperationFamily::Swap, i)?;
        self.check_index(OperationFamily::Swap, j)?;
        let dx = self.underlying_coins()[i].parse(amount)?;
        self.price_impact_for(i, j, dx, false).await
    }

    pub async fn swap_wrapped_price_impact<A: ToDecimal + ?Sized>(
        &self,
        i: usize,
        j: usize,
        amount: &A,
    ) -> Result<String, CurveError> {
        self.check_index(OperationFamily::SwapWrapped, i)?;
        self.check_index(OperationFamily::SwapWrapped, j)?;
        self.ensure_supported(OperationFamily::SwapWrapped)?;
        let dx = self.wrapped_coins()[i].parse(amount)?;
        self.price_impact_for(i, j, dx, true).await
    }

    // Approvals

    pub(crate) async fn is_approved(&self, approval: Approval) -> Result<bool, CurveError> {
        self.allowances
            .has_allowance(&approval.coins, &approval.amounts, approval.spender)
            .await
    }

    pub(crate) async fn approve(&self, approval: Approval) -> Result<Vec<TxHash>, CurveError> {
        self.allowances
            .ensure_allowance(&approval.coins, &approval.amounts, approval.spender)
            .await
    }

    async fn maybe_is_approved(&self, approval: Option<Approval>) -> Result<bool, CurveError> {
        match approval {
            Some(approval) => self.is_approved(approval).await,
            None => Ok(true),
        }
    }

    async fn maybe_approve(&self, approval: Option<Approval>) -> Result<Vec<TxHash>, CurveError> {
        match approval {
            Some(approval) => self.approve(approval).await,
            None => Ok(Vec::new()),
        }
    }

    /// Wallet balance of `coin` as an [`Amount`].
    pub async fn wallet_balance_of(&self, coin: &Coin) -> Result<Amount, CurveError> {
        let raw = self.raw_wallet_balances(slice::from_ref(coin)).await?;
        Ok(coin.amount(raw.first().copied().unwrap_or_default()))
    }
}
