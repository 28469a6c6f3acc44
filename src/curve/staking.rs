use crate::core::abi::ContractCall;
use crate::core::transport::ChainTransport;
use crate::curve::pool::{Approval, CurvePool, PreparedCall};
use crate::errors::CurveError;
use crate::math::ToDecimal;
use alloy_primitives::{Address, TxHash, U256};
use alloy_sol_types::sol;
use std::slice;

sol! {
    interface IGauge {
        function deposit(uint256 value) external;
        function withdraw(uint256 value) external;
        function claimable_tokens(address addr) external returns (uint256);
        function balanceOf(address owner) external view returns (uint256);
    }

    interface IMinter {
        function mint(address gauge) external;
    }
}

/// CRV is minted on mainnet only.
const CRV_CHAIN_ID: u64 = 1;

impl<T: ChainTransport + ?Sized> CurvePool<T> {
    fn gauge(&self, method: &str) -> Result<Address, CurveError> {
        self.descriptor
            .gauge_address
            .filter(|gauge| !gauge.is_zero())
            .ok_or_else(|| self.unsupported(method))
    }

    fn crv_minter(&self, method: &str) -> Result<Address, CurveError> {
        let current = self.ctx.chain_id();
        if current != CRV_CHAIN_ID {
            return Err(CurveError::NetworkRestricted {
                pool: self.descriptor.id.clone(),
                method: method.to_string(),
                required: CRV_CHAIN_ID,
                current,
            });
        }
        self.ctx.network.minter.ok_or_else(|| {
            CurveError::ConfigError(format!("{}: no CRV minter configured", self.ctx.network.name))
        })
    }

    pub(crate) fn stake_approval(&self, lp: U256) -> Result<Approval, CurveError> {
        Ok(Approval {
            spender: self.gauge("stake")?,
            coins: vec![self.lp_token.clone()],
            amounts: vec![lp],
        })
    }

    pub(crate) async fn prepare_stake<A: ToDecimal + ?Sized>(&self, lp_amount: &A) -> Result<PreparedCall, CurveError> {
        let gauge = self.gauge("stake")?;
        let lp = self.lp_token.parse(lp_amount)?;
        let lp_token = slice::from_ref(&self.lp_token);
        let balances = self.raw_wallet_balances(lp_token).await?;
        if balances.first().is_none_or(|available| *available < lp) {
            return Err(CurveError::InsufficientBalance {
                pool: self.descriptor.id.clone(),
                method: "stake".to_string(),
                coin: self.lp_token.symbol.clone(),
                required: self.lp_token.format(lp),
                available: self.lp_token.format(balances.first().copied().unwrap_or_default()),
            });
        }
        Ok(PreparedCall {
            method: "stake",
            family: None,
            call: ContractCall::from_sol(gauge, &IGauge::depositCall { value: lp }),
            approval: Some(self.stake_approval(lp)?),
        })
    }

    pub(crate) async fn prepare_unstake<A: ToDecimal + ?Sized>(&self, lp_amount: &A) -> Result<PreparedCall, CurveError> {
        let gauge = self.gauge("unstake")?;
        let lp = self.lp_token.parse(lp_amount)?;
        let staked = self.raw_staked_balance(gauge).await?;
        if staked < lp {
            return Err(CurveError::InsufficientBalance {
                pool: self.descriptor.id.clone(),
                method: "unstake".to_string(),
                coin: format!("staked {}", self.lp_token.symbol),
                required: self.lp_token.format(lp),
                available: self.lp_token.format(staked),
            });
        }
        Ok(PreparedCall {
            method: "unstake",
            family: None,
            call: ContractCall::from_sol(gauge, &IGauge::withdrawCall { value: lp }),
            approval: None,
        })
    }

    pub(crate) fn prepare_claim_crv(&self) -> Result<PreparedCall, CurveError> {
        let minter = self.crv_minter("claim_crv")?;
        let gauge = self.gauge("claim_crv")?;
        Ok(PreparedCall {
            method: "claim_crv",
            family: None,
            call: ContractCall::from_sol(minter, &IMinter::mintCall { gauge }),
            approval: None,
        })
    }

    async fn raw_staked_balance(&self, gauge: Address) -> Result<U256, CurveError> {
        let call = ContractCall::from_sol(gauge, &IGauge::balanceOfCall { owner: self.ctx.signer });
        self.read_u256(call).await
    }

    pub async fn stake_is_approved<A: ToDecimal + ?Sized>(&self, lp_amount: &A) -> Result<bool, CurveError> {
        let approval = self.stake_approval(self.lp_token.parse(lp_amount)?)?;
        self.is_approved(approval).await
    }

    pub async fn stake_approve<A: ToDecimal + ?Sized>(&self, lp_amount: &A) -> Result<Vec<TxHash>, CurveError> {
        let approval = self.stake_approval(self.lp_token.parse(lp_amount)?)?;
        self.approve(approval).await
    }

    /// Deposits LP tokens into the pool's gauge.
    pub async fn stake<A: ToDecimal + ?Sized>(&self, lp_amount: &A) -> Result<TxHash, CurveError> {
        let prepared = self.prepare_stake(lp_amount).await?;
        self.execute(prepared).await
    }

    pub async fn unstake<A: ToDecimal + ?Sized>(&self, lp_amount: &A) -> Result<TxHash, CurveError> {
        let prepared = self.prepare_unstake(lp_amount).await?;
        self.execute(prepared).await
    }

    pub async fn wallet_staked_balance(&self) -> Result<String, CurveError> {
        let gauge = self.gauge("wallet_staked_balance")?;
        Ok(self.lp_token.format(self.raw_staked_balance(gauge).await?))
    }

    /// CRV the signer can mint for this gauge. The gauge computes it in a
    /// state-changing function, so it is read through a simulated call.
    pub async fn claimable_crv(&self) -> Result<String, CurveError> {
        self.crv_minter("claimable_crv")?;
        let gauge = self.gauge("claimable_crv")?;
        let call = ContractCall::from_sol(gauge, &IGauge::claimable_tokensCall { addr: self.ctx.signer });
        let raw = self.read_u256(call).await?;
        Ok(crate::math::format_units(raw, 18))
    }

    pub async fn claim_crv(&self) -> Result<TxHash, CurveError> {
        let prepared = self.prepare_claim_crv()?;
        self.execute(prepared).await
    }
}
