use crate::context::CurveContext;
use crate::core::coin::Coin;
use crate::core::gas::{self, GasEstimate};
use crate::core::transport::{ChainTransport, read_u256s};
use crate::errors::CurveError;
use alloy_primitives::{Address, TxHash, U256};
use itertools::Itertools;
use std::sync::Arc;
use tracing::{debug, warn};

/// Keeps ERC-20 allowances of the signer in line with what an operation is
/// about to spend.
///
/// Some tokens reject changing a non-zero allowance to another non-zero
/// value, so an insufficient non-zero allowance is first reset to zero.
pub struct AllowanceManager<T: ?Sized> {
    ctx: Arc<CurveContext>,
    transport: Arc<T>,
}

impl<T: ChainTransport + ?Sized> AllowanceManager<T> {
    pub fn new(ctx: Arc<CurveContext>, transport: Arc<T>) -> Self {
        Self { ctx, transport }
    }

    /// Current allowances of the signer for `spender`, in one snapshot.
    /// The native coin needs no approval and reports `U256::MAX`.
    pub async fn allowances(&self, coins: &[Coin], spender: Address) -> Result<Vec<U256>, CurveError> {
        let calls = coins
            .iter()
            .filter(|c| !c.is_native())
            .map(|c| c.allowance_call(self.ctx.signer, spender))
            .collect_vec();
        let mut read = read_u256s(self.transport.as_ref(), &calls).await?.into_iter();
        coins
            .iter()
            .map(|c| {
                if c.is_native() {
                    Ok(U256::MAX)
                } else {
                    read.next().ok_or_else(|| {
                        CurveError::AbiDecodeError("missing allowance result".into())
                    })
                }
            })
            .collect()
    }

    pub async fn has_allowance(
        &self,
        coins: &[Coin],
        amounts: &[U256],
        spender: Address,
    ) -> Result<bool, CurveError> {
        let allowances = self.allowances(coins, spender).await?;
        Ok(allowances.iter().zip(amounts).all(|(a, needed)| a >= needed))
    }

    /// Coins whose allowance is below the amount to spend, with that allowance.
    pub async fn missing(
        &self,
        coins: &[Coin],
        amounts: &[U256],
        spender: Address,
    ) -> Result<Vec<(Coin, U256, U256)>, CurveError> {
        let allowances = self.allowances(coins, spender).await?;
        Ok(coins
            .iter()
            .zip(amounts)
            .zip(allowances)
            .filter(|((_, needed), current)| current < *needed)
            .map(|((coin, needed), current)| (coin.clone(), current, *needed))
            .collect())
    }

    fn approve_amount(&self, needed: U256) -> U256 {
        if self.ctx.max_approve { U256::MAX } else { needed }
    }

    /// Submits the approvals needed for `amounts`, awaiting each one.
    /// Returns zero, one or two hashes per coin.
    pub async fn ensure_allowance(
        &self,
        coins: &[Coin],
        amounts: &[U256],
        spender: Address,
    ) -> Result<Vec<TxHash>, CurveError> {
        let multiplier = self.ctx.network.gas_multiplier_bp;
        let from = self.ctx.signer;
        let transport = self.transport.as_ref();
        let mut hashes = Vec::new();

        for (coin, current, needed) in self.missing(coins, amounts, spender).await? {
            if !current.is_zero() {
                debug!(coin = %coin.symbol, ?spender, %current, "resetting allowance");
                let reset = gas::submit(transport, from, &coin.approve_call(spender, U256::ZERO), multiplier).await?;
                transport.wait_for_confirmation(reset).await?;
                hashes.push(reset);
            }
            let amount = self.approve_amount(needed);
            debug!(coin = %coin.symbol, ?spender, %amount, "approving");
            let approve = gas::submit(transport, from, &coin.approve_call(spender, amount), multiplier).await?;
            transport.wait_for_confirmation(approve).await?;
            hashes.push(approve);
        }
        Ok(hashes)
    }

    /// Gas the approvals of [`Self::ensure_allowance`] would use.
    ///
    /// When a reset is needed the second approval can usually not be
    /// simulated against the current non-zero allowance; its cost is then
    /// taken as equal to the reset and the estimate is marked approximated.
    pub async fn estimate_ensure_allowance(
        &self,
        coins: &[Coin],
        amounts: &[U256],
        spender: Address,
    ) -> Result<GasEstimate, CurveError> {
        let network = &self.ctx.network;
        let from = self.ctx.signer;
        let transport = self.transport.as_ref();
        let mut total = GasEstimate::default();

        for (coin, current, needed) in self.missing(coins, amounts, spender).await? {
            let approve = coin.approve_call(spender, self.approve_amount(needed));
            if current.is_zero() {
                total = total + gas::estimate_call(transport, network, from, &approve).await?;
                continue;
            }
            let reset = gas::estimate_call(transport, network, from, &coin.approve_call(spender, U256::ZERO)).await?;
            let second = match gas::estimate_call(transport, network, from, &approve).await {
                Ok(estimate) => estimate,
                Err(e) => {
                    warn!(coin = %coin.symbol, error = %e, "approve estimate unavailable, doubling reset gas");
                    reset.approximate()
                }
            };
            total = total + reset + second;
        }
        Ok(total)
    }
}
