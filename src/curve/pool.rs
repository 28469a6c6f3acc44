use crate::context::CurveContext;
use crate::core::abi::{CallArg, ContractCall, IndexType, decode_u256};
use crate::core::allowance::AllowanceManager;
use crate::core::coin::Coin;
use crate::core::gas::{self, GasEstimate};
use crate::core::prices::PriceOracle;
use crate::core::transport::{ChainTransport, read_u256s};
use crate::curve::capabilities::Capabilities;
use crate::curve::constants::{PRECISION, gas_multiplier_override};
use crate::curve::descriptor::{LendingRate, PoolDescriptor};
use crate::curve::metadata::{PoolFlags, PoolMetadata, PoolMetadataResolver};
use crate::curve::strategies::{OperationFamily, StrategyRegistry, StrategySet};
use crate::errors::CurveError;
use crate::math::{ToDecimal, decimal};
use alloy_primitives::{Address, TxHash, U256};
use alloy_sol_types::sol;
use bigdecimal::BigDecimal;
use itertools::Itertools;
use std::fmt::{self, Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use tracing::{debug, info};

sol! {
    interface ILendingToken {
        function exchangeRateStored() external view returns (uint256);
        function getPricePerFullShare() external view returns (uint256);
    }
}

/// Tokens an operation spends from the signer, and the contract spending them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Approval {
    pub spender: Address,
    pub coins: Vec<Coin>,
    pub amounts: Vec<U256>,
}

/// A fully built operation, shared by the estimate and the execute path.
#[derive(Debug, Clone)]
pub(crate) struct PreparedCall {
    pub method: &'static str,
    pub family: Option<OperationFamily>,
    pub call: ContractCall,
    pub approval: Option<Approval>,
}

impl PreparedCall {
    pub fn new(family: OperationFamily, call: ContractCall, approval: Option<Approval>) -> Self {
        Self {
            method: family.method_name(),
            family: Some(family),
            call,
            approval,
        }
    }
}

/// Pool reserves and LP supply read in the same snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReserveSnapshot {
    pub reserves: Vec<U256>,
    pub lp_supply: U256,
}

/// A pool with its flags and operation variants resolved, ready to build and
/// submit calls.
pub struct CurvePool<T: ?Sized> {
    pub(crate) descriptor: Arc<PoolDescriptor>,
    pub(crate) base: Option<Arc<PoolDescriptor>>,
    pub(crate) metadata: PoolMetadata,
    pub(crate) base_capabilities: Option<Capabilities>,
    pub(crate) strategies: StrategySet,
    pub(crate) ctx: Arc<CurveContext>,
    pub(crate) transport: Arc<T>,
    pub(crate) prices: Arc<dyn PriceOracle>,
    pub(crate) allowances: AllowanceManager<T>,
    pub(crate) lp_token: Coin,
}

impl<T: ?Sized> Debug for CurvePool<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("CurvePool")
            .field("id", &self.descriptor.id)
            .field("address", &self.descriptor.swap_address)
            .field("flags", &self.metadata.flags)
            .field("strategies", &self.strategies)
            .finish_non_exhaustive()
    }
}

fn mul_div(value: U256, mul: U256, div: U256) -> Result<U256, CurveError> {
    value
        .checked_mul(mul)
        .ok_or_else(|| CurveError::CalculationError("mul_div overflow".to_string()))?
        .checked_div(div)
        .ok_or_else(|| CurveError::CalculationError("mul_div division by zero".to_string()))
}

fn balance_calls(descriptor: &PoolDescriptor, caps: &Capabilities) -> Vec<ContractCall> {
    let index_type = if caps.balances_int128 {
        IndexType::Int128
    } else {
        IndexType::Uint256
    };
    (0..descriptor.n_wrapped_coins())
        .map(|i| {
            ContractCall::new(
                descriptor.swap_address,
                "balances",
                vec![CallArg::Index(i, index_type)],
            )
        })
        .collect()
}

/// One rate call per wrapped coin that needs one, with the coin index.
fn rate_calls(descriptor: &PoolDescriptor) -> Vec<(usize, ContractCall)> {
    let Some(use_lending) = &descriptor.use_lending else {
        return Vec::new();
    };
    descriptor
        .wrapped_coins
        .iter()
        .zip(use_lending)
        .enumerate()
        .filter(|(_, (_, lending))| **lending)
        .filter_map(|(i, (coin, _))| match descriptor.lending_rate {
            LendingRate::ExchangeRateStored => Some((
                i,
                ContractCall::from_sol(coin.address, &ILendingToken::exchangeRateStoredCall {}),
            )),
            LendingRate::PricePerFullShare => Some((
                i,
                ContractCall::from_sol(coin.address, &ILendingToken::getPricePerFullShareCall {}),
            )),
            LendingRate::OneToOne => None,
        })
        .collect()
}

fn rates_from(n: usize, slots: &[(usize, ContractCall)], values: &[U256]) -> Vec<U256> {
    let mut rates = vec![PRECISION; n];
    for ((i, _), value) in slots.iter().zip(values) {
        rates[*i] = *value;
    }
    rates
}

impl<T: ChainTransport + ?Sized> CurvePool<T> {
    pub fn new(
        descriptor: Arc<PoolDescriptor>,
        base: Option<Arc<PoolDescriptor>>,
        ctx: Arc<CurveContext>,
        transport: Arc<T>,
        prices: Arc<dyn PriceOracle>,
    ) -> Result<Self, CurveError> {
        descriptor.validate()?;
        let metadata = PoolMetadataResolver::resolve(&descriptor, base.as_deref())?;
        let strategies = StrategyRegistry::select(&descriptor.id, &metadata);
        let base_capabilities = base.as_deref().map(Capabilities::resolve);
        info!(pool = %descriptor.id, ?strategies, "assembled pool");

        let lp_token = Coin::new(descriptor.token_address, format!("{}-LP", descriptor.id), 18);
        Ok(Self {
            allowances: AllowanceManager::new(ctx.clone(), transport.clone()),
            descriptor,
            base,
            metadata,
            base_capabilities,
            strategies,
            ctx,
            transport,
            prices,
            lp_token,
        })
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn address(&self) -> Address {
        self.descriptor.swap_address
    }

    pub fn descriptor(&self) -> &PoolDescriptor {
        &self.descriptor
    }

    pub fn flags(&self) -> &PoolFlags {
        &self.metadata.flags
    }

    pub fn metadata(&self) -> &PoolMetadata {
        &self.metadata
    }

    pub fn strategies(&self) -> &StrategySet {
        &self.strategies
    }

    pub fn lp_token(&self) -> &Coin {
        &self.lp_token
    }

    pub fn underlying_coins(&self) -> &[Coin] {
        &self.descriptor.underlying_coins
    }

    pub fn wrapped_coins(&self) -> &[Coin] {
        &self.descriptor.wrapped_coins
    }

    pub fn context(&self) -> &CurveContext {
        &self.ctx
    }

    /// Resolves a coin given as index, address or symbol (case-insensitive).
    pub fn coin_index(&self, coin: &str, wrapped: bool) -> Result<usize, CurveError> {
        let coins = if wrapped {
            self.wrapped_coins()
        } else {
            self.underlying_coins()
        };
        let found = if let Ok(i) = coin.parse::<usize>() {
            (i < coins.len()).then_some(i)
        } else if let Ok(address) = coin.parse::<Address>() {
            coins.iter().position(|c| c.address == address)
        } else {
            coins.iter().position(|c| c.symbol.eq_ignore_ascii_case(coin))
        };
        found.ok_or_else(|| CurveError::CoinIndexOutOfRange {
            pool: self.descriptor.id.clone(),
            method: "coin_index".to_string(),
            index: coin.to_string(),
            n_coins: coins.len(),
        })
    }

    pub(crate) fn coins_for(&self, family: OperationFamily) -> &[Coin] {
        if family.is_wrapped() {
            self.wrapped_coins()
        } else {
            self.underlying_coins()
        }
    }

    pub(crate) fn unsupported(&self, method: impl fmt::Display) -> CurveError {
        CurveError::UnsupportedOperationForPoolShape {
            pool: self.descriptor.id.clone(),
            method: method.to_string(),
        }
    }

    pub(crate) fn check_index(&self, family: OperationFamily, index: usize) -> Result<(), CurveError> {
        let n_coins = self.coins_for(family).len();
        if index >= n_coins {
            return Err(CurveError::CoinIndexOutOfRange {
                pool: self.descriptor.id.clone(),
                method: family.method_name().to_string(),
                index: index.to_string(),
                n_coins,
            });
        }
        Ok(())
    }

    pub(crate) fn zap(&self, family: OperationFamily) -> Result<Address, CurveError> {
        self.descriptor.deposit_address.ok_or_else(|| {
            CurveError::ConfigError(format!(
                "{}: {} routes through a zap but the pool has none",
                self.descriptor.id, family
            ))
        })
    }

    pub(crate) fn amounts_arg(&self, values: &[U256]) -> CallArg {
        CallArg::amounts(values, self.metadata.capabilities.dynamic_arrays)
    }

    pub(crate) fn index_arg(&self, index: usize) -> CallArg {
        CallArg::Index(index, self.metadata.capabilities.index_type)
    }

    /// Parses one human amount per coin of `family`.
    pub(crate) fn parse_amounts<A: ToDecimal>(
        &self,
        family: OperationFamily,
        amounts: &[A],
    ) -> Result<Vec<U256>, CurveError> {
        let coins = self.coins_for(family);
        if amounts.len() != coins.len() {
            return Err(CurveError::InvalidAmount(
                format!("{} amounts", amounts.len()),
                format!("{}: {family} takes {} amounts", self.descriptor.id, coins.len()),
            ));
        }
        coins.iter().zip(amounts).map(|(c, a)| c.parse(a)).collect()
    }

    pub(crate) fn format_amounts(&self, coins: &[Coin], raw: &[U256]) -> Vec<String> {
        coins.iter().zip(raw).map(|(c, r)| c.format(*r)).collect()
    }

    pub(crate) fn to_decimals(&self, coins: &[Coin], raw: &[U256]) -> Vec<BigDecimal> {
        coins
            .iter()
            .zip(raw)
            .map(|(c, r)| decimal::from_raw(*r, c.decimals))
            .collect()
    }

    pub(crate) async fn read_u256(&self, call: ContractCall) -> Result<U256, CurveError> {
        let result = self.transport.read(std::slice::from_ref(&call)).await?;
        let bytes = result
            .first()
            .ok_or_else(|| CurveError::AbiDecodeError(format!("no result for {call}")))?;
        decode_u256(bytes)
    }

    pub(crate) async fn read_u256s(&self, calls: &[ContractCall]) -> Result<Vec<U256>, CurveError> {
        read_u256s(self.transport.as_ref(), calls).await
    }

    pub(crate) fn native_value(coins: &[Coin], amounts: &[U256]) -> U256 {
        coins
            .iter()
            .zip(amounts)
            .filter(|(c, _)| c.is_native())
            .map(|(_, a)| *a)
            .fold(U256::ZERO, |acc, a| acc.saturating_add(a))
    }

    /// Fails with `InsufficientBalance` for the first coin the signer holds
    /// too little of. All balances come from one snapshot.
    pub(crate) async fn check_balances(
        &self,
        family: OperationFamily,
        coins: &[Coin],
        amounts: &[U256],
    ) -> Result<(), CurveError> {
        let balances = self.raw_wallet_balances(coins).await?;
        if let Some((coin, (needed, available))) = coins
            .iter()
            .zip(amounts.iter().zip(&balances))
            .find(|(_, (needed, available))| needed > available)
        {
            return Err(CurveError::InsufficientBalance {
                pool: self.descriptor.id.clone(),
                method: family.method_name().to_string(),
                coin: coin.symbol.clone(),
                required: coin.format(*needed),
                available: coin.format(*available),
            });
        }
        Ok(())
    }

    pub(crate) fn gas_multiplier(&self, family: Option<OperationFamily>) -> u32 {
        family
            .and_then(|f| gas_multiplier_override(self.ctx.chain_id(), &self.descriptor.id, f))
            .unwrap_or(self.ctx.network.gas_multiplier_bp)
    }

    /// Approves what `prepared` spends, then submits it.
    pub(crate) async fn execute(&self, prepared: PreparedCall) -> Result<TxHash, CurveError> {
        if let Some(approval) = &prepared.approval {
            self.allowances
                .ensure_allowance(&approval.coins, &approval.amounts, approval.spender)
                .await?;
        }
        let multiplier = self.gas_multiplier(prepared.family);
        let hash = gas::submit(self.transport.as_ref(), self.ctx.signer, &prepared.call, multiplier).await?;
        info!(pool = %self.descriptor.id, method = prepared.method, %hash, "operation submitted");
        Ok(hash)
    }

    /// Gas of `prepared` alone. The node can only simulate the call if the
    /// allowance is already in place.
    pub(crate) async fn estimate(&self, prepared: PreparedCall) -> Result<GasEstimate, CurveError> {
        if let Some(approval) = &prepared.approval {
            let missing = self
                .allowances
                .missing(&approval.coins, &approval.amounts, approval.spender)
                .await?;
            if !missing.is_empty() {
                return Err(CurveError::InsufficientAllowanceForEstimate {
                    pool: self.descriptor.id.clone(),
                    method: prepared.method.to_string(),
                    coins: missing.into_iter().map(|(coin, ..)| coin.address).collect(),
                });
            }
        }
        let estimate =
            gas::estimate_call(self.transport.as_ref(), &self.ctx.network, self.ctx.signer, &prepared.call).await?;
        debug!(pool = %self.descriptor.id, method = prepared.method, ?estimate, "estimated");
        Ok(estimate)
    }

    // Stats

    /// Pool reserves and LP supply in one multicall. In underlying terms,
    /// lending pools convert through the wrapped coins' rates and metapools
    /// split their base LP share across the base pool's reserves.
    pub(crate) async fn snapshot(&self, underlying: bool) -> Result<ReserveSnapshot, CurveError> {
        Ok(self.snapshot_with(underlying, &[]).await?.0)
    }

    /// [`Self::snapshot`] with `extra` calls read in the same batch; their
    /// values come back in order.
    pub(crate) async fn snapshot_with(
        &self,
        underlying: bool,
        extra: &[ContractCall],
    ) -> Result<(ReserveSnapshot, Vec<U256>), CurveError> {
        let flags = &self.metadata.flags;
        let mut calls = balance_calls(&self.descriptor, &self.metadata.capabilities);
        let n_wrapped = calls.len();
        calls.push(self.lp_token.total_supply_call());

        let rate_slots = if underlying && flags.is_lending {
            rate_calls(&self.descriptor)
        } else {
            Vec::new()
        };
        calls.extend(rate_slots.iter().map(|(_, c)| c.clone()));

        let base = match (&self.base, &self.base_capabilities) {
            (Some(base), Some(caps)) if underlying && flags.is_meta => Some((base, caps)),
            _ => None,
        };
        let mut base_rate_slots = Vec::new();
        if let Some((base, caps)) = base {
            calls.extend(balance_calls(base, caps));
            base_rate_slots = rate_calls(base);
            calls.extend(base_rate_slots.iter().map(|(_, c)| c.clone()));
            calls.push(Coin::new(base.token_address, "", 18).total_supply_call());
        }

        calls.extend_from_slice(extra);

        let values = self.read_u256s(&calls).await?;
        let (values, extra_values) = values.split_at(values.len() - extra.len());
        let extra_values = extra_values.to_vec();
        let (wrapped, rest) = values.split_at(n_wrapped);
        let (lp_supply, rest) = rest.split_at(1);
        let lp_supply = lp_supply[0];
        let (rates, rest) = rest.split_at(rate_slots.len());
        let rates = rates_from(n_wrapped, &rate_slots, rates);
        let own = wrapped
            .iter()
            .zip(&rates)
            .map(|(balance, rate)| mul_div(*balance, *rate, PRECISION))
            .collect::<Result<Vec<_>, _>>()?;

        let Some((base, _)) = base else {
            return Ok((
                ReserveSnapshot {
                    reserves: own,
                    lp_supply,
                },
                extra_values,
            ));
        };
        let n_base = base.n_wrapped_coins();
        let (base_balances, rest) = rest.split_at(n_base);
        let (base_rates, rest) = rest.split_at(base_rate_slots.len());
        let base_supply = rest
            .first()
            .copied()
            .ok_or_else(|| CurveError::AbiDecodeError("missing base LP supply".into()))?;
        let base_rates = rates_from(n_base, &base_rate_slots, base_rates);

        let (meta_coins, base_lp) = own.split_at(own.len() - 1);
        let base_lp = base_lp[0];
        let mut reserves = meta_coins.to_vec();
        for (balance, rate) in base_balances.iter().zip(&base_rates) {
            let underlying = mul_div(*balance, *rate, PRECISION)?;
            reserves.push(if base_supply.is_zero() {
                U256::ZERO
            } else {
                mul_div(underlying, base_lp, base_supply)?
            });
        }
        Ok((ReserveSnapshot { reserves, lp_supply }, extra_values))
    }

    pub(crate) async fn raw_lp_total_supply(&self) -> Result<U256, CurveError> {
        self.read_u256(self.lp_token.total_supply_call()).await
    }

    pub(crate) fn wallet_balance_calls(&self, coins: &[Coin]) -> Vec<ContractCall> {
        coins
            .iter()
            .map(|c| c.balance_call(self.ctx.signer, self.ctx.network.multicall))
            .collect_vec()
    }

    pub(crate) async fn raw_wallet_balances(&self, coins: &[Coin]) -> Result<Vec<U256>, CurveError> {
        self.read_u256s(&self.wallet_balance_calls(coins)).await
    }

    /// Exchange rates of the lending coins, `PRECISION` for the others.
    pub(crate) async fn raw_rates(&self) -> Result<Vec<U256>, CurveError> {
        let slots = rate_calls(&self.descriptor);
        let calls = slots.iter().map(|(_, c)| c.clone()).collect_vec();
        let values = self.read_u256s(&calls).await?;
        Ok(rates_from(self.descriptor.n_wrapped_coins(), &slots, &values))
    }

    pub(crate) async fn usd_prices(&self, coins: &[Coin]) -> Result<Vec<BigDecimal>, CurveError> {
        let addresses = coins.iter().map(|c| c.address).collect_vec();
        self.prices.usd_prices(&addresses).await
    }

    pub async fn wrapped_balances(&self) -> Result<Vec<String>, CurveError> {
        let raw = self.snapshot(false).await?.reserves;
        Ok(self.format_amounts(self.wrapped_coins(), &raw))
    }

    pub async fn underlying_balances(&self) -> Result<Vec<String>, CurveError> {
        let raw = self.snapshot(true).await?.reserves;
        Ok(self.format_amounts(self.underlying_coins(), &raw))
    }

    pub async fn lp_total_supply(&self) -> Result<String, CurveError> {
        Ok(self.lp_token.format(self.raw_lp_total_supply().await?))
    }

    // Wallet

    pub async fn wallet_underlying_balances(&self) -> Result<Vec<String>, CurveError> {
        let raw = self.raw_wallet_balances(self.underlying_coins()).await?;
        Ok(self.format_amounts(self.underlying_coins(), &raw))
    }

    pub async fn wallet_wrapped_balances(&self) -> Result<Vec<String>, CurveError> {
        let raw = self.raw_wallet_balances(self.wrapped_coins()).await?;
        Ok(self.format_amounts(self.wrapped_coins(), &raw))
    }

    pub async fn wallet_lp_balance(&self) -> Result<String, CurveError> {
        let raw = self
            .raw_wallet_balances(std::slice::from_ref(&self.lp_token))
            .await?;
        Ok(self.lp_token.format(raw.first().copied().unwrap_or_default()))
    }
}
