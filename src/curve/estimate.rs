use crate::core::gas::GasEstimate;
use crate::core::transport::ChainTransport;
use crate::curve::pool::{Approval, CurvePool};
use crate::curve::slippage::SlippageTolerance;
use crate::curve::strategies::OperationFamily;
use crate::errors::CurveError;
use crate::math::ToDecimal;

pub struct EstimateGas<'a, T: ?Sized> {
    pool: &'a CurvePool<T>,
}

impl<T: ChainTransport + ?Sized> CurvePool<T> {
    pub fn estimate_gas(&self) -> EstimateGas<'_, T> {
        EstimateGas { pool: self }
    }
}

impl<T: ChainTransport + ?Sized> EstimateGas<'_, T> {
    async fn approvals(&self, approval: Option<Approval>) -> Result<GasEstimate, CurveError> {
        match approval {
            Some(a) => {
                self.pool
                    .allowances
                    .estimate_ensure_allowance(&a.coins, &a.amounts, a.spender)
                    .await
            }
            None => Ok(GasEstimate::default()),
        }
    }

    pub async fn deposit_approve<A: ToDecimal>(&self, amounts: &[A]) -> Result<GasEstimate, CurveError> {
        let approval = self.pool.deposit_approval(OperationFamily::Deposit, amounts)?;
        self.approvals(Some(approval)).await
    }

    pub async fn deposit<A: ToDecimal>(
        &self,
        amounts: &[A],
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<GasEstimate, CurveError> {
        let prepared = self.pool.prepare_deposit(amounts, tolerance).await?;
        self.pool.estimate(prepared).await
    }

    pub async fn deposit_wrapped_approve<A: ToDecimal>(&self, amounts: &[A]) -> Result<GasEstimate, CurveError> {
        let approval = self
            .pool
            .deposit_approval(OperationFamily::DepositWrapped, amounts)?;
        self.approvals(Some(approval)).await
    }

    pub async fn deposit_wrapped<A: ToDecimal>(
        &self,
        amounts: &[A],
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<GasEstimate, CurveError> {
        let prepared = self.pool.prepare_deposit_wrapped(amounts, tolerance).await?;
        self.pool.estimate(prepared).await
    }

    pub async fn withdraw_approve<A: ToDecimal + ?Sized>(&self, lp_amount: &A) -> Result<GasEstimate, CurveError> {
        let approval = self.pool.lp_approval_for(OperationFamily::Withdraw, lp_amount)?;
        self.approvals(approval).await
    }

    pub async fn withdraw<A: ToDecimal + ?Sized>(
        &self,
        lp_amount: &A,
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<GasEstimate, CurveError> {
        let prepared = self.pool.prepare_withdraw(lp_amount, tolerance).await?;
        self.pool.estimate(prepared).await
    }

    pub async fn withdraw_wrapped_approve<A: ToDecimal + ?Sized>(
        &self,
        lp_amount: &A,
    ) -> Result<GasEstimate, CurveError> {
        let approval = self
            .pool
            .lp_approval_for(OperationFamily::WithdrawWrapped, lp_amount)?;
        self.approvals(approval).await
    }

    pub async fn withdraw_wrapped<A: ToDecimal + ?Sized>(
        &self,
        lp_amount: &A,
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<GasEstimate, CurveError> {
        let prepared = self
            .pool
            .prepare_withdraw_wrapped(lp_amount, tolerance)
            .await?;
        self.pool.estimate(prepared).await
    }

    pub async fn withdraw_imbalance_approve<A: ToDecimal>(&self, amounts: &[A]) -> Result<GasEstimate, CurveError> {
        let approval = self
            .pool
            .imbalance_approval(OperationFamily::WithdrawImbalance, amounts)
            .await?;
        self.approvals(approval).await
    }

    pub async fn withdraw_imbalance<A: ToDecimal>(
        &self,
        amounts: &[A],
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<GasEstimate, CurveError> {
        let prepared = self
            .pool
            .prepare_withdraw_imbalance(amounts, tolerance)
            .await?;
        self.pool.estimate(prepared).await
    }

    pub async fn withdraw_imbalance_wrapped_approve<A: ToDecimal>(
        &self,
        amounts: &[A],
    ) -> Result<GasEstimate, CurveError> {
        let approval = self
            .pool
            .imbalance_approval(OperationFamily::WithdrawImbalanceWrapped, amounts)
            .await?;
        self.approvals(approval).await
    }

    pub async fn withdraw_imbalance_wrapped<A: ToDecimal>(
        &self,
        amounts: &[A],
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<GasEstimate, CurveError> {
        let prepared = self
            .pool
            .prepare_withdraw_imbalance_wrapped(amounts, tolerance)
            .await?;
        self.pool.estimate(prepared).await
    }

    pub async fn withdraw_one_coin_approve<A: ToDecimal + ?Sized>(
        &self,
        lp_amount: &A,
    ) -> Result<GasEstimate, CurveError> {
        let approval = self
            .pool
            .lp_approval_for(OperationFamily::WithdrawOneCoin, lp_amount)?;
        self.approvals(approval).await
    }

    pub async fn withdraw_one_coin<A: ToDecimal + ?Sized>(
        &self,
        lp_amount: &A,
        index: usize,
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<GasEstimate, CurveError> {
        let prepared = self
            .pool
            .prepare_withdraw_one_coin(lp_amount, index, tolerance)
            .await?;
        self.pool.estimate(prepared).await
    }

    pub async fn withdraw_one_coin_wrapped_approve<A: ToDecimal + ?Sized>(
        &self,
        lp_amount: &A,
    ) -> Result<GasEstimate, CurveError> {
        let approval = self
            .pool
            .lp_approval_for(OperationFamily::WithdrawOneCoinWrapped, lp_amount)?;
        self.approvals(approval).await
    }

    pub async fn withdraw_one_coin_wrapped<A: ToDecimal + ?Sized>(
        &self,
        lp_amount: &A,
        index: usize,
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<GasEstimate, CurveError> {
        let prepared = self
            .pool
            .prepare_withdraw_one_coin_wrapped(lp_amount, index, tolerance)
            .await?;
        self.pool.estimate(prepared).await
    }

    pub async fn swap_approve<A: ToDecimal + ?Sized>(&self, i: usize, amount: &A) -> Result<GasEstimate, CurveError> {
        let approval = self.pool.swap_approval(OperationFamily::Swap, i, amount)?;
        self.approvals(Some(approval)).await
    }

    pub async fn swap<A: ToDecimal + ?Sized>(
        &self,
        i: usize,
        j: usize,
        amount: &A,
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<GasEstimate, CurveError> {
        let prepared = self.pool.prepare_swap(i, j, amount, tolerance).await?;
        self.pool.estimate(prepared).await
    }

    pub async fn swap_wrapped_approve<A: ToDecimal + ?Sized>(
        &self,
        i: usize,
        amount: &A,
    ) -> Result<GasEstimate, CurveError> {
        let approval = self
            .pool
            .swap_approval(OperationFamily::SwapWrapped, i, amount)?;
        self.approvals(Some(approval)).await
    }

    pub async fn swap_wrapped<A: ToDecimal + ?Sized>(
        &self,
        i: usize,
        j: usize,
        amount: &A,
        tolerance: Option<&SlippageTolerance>,
    ) -> Result<GasEstimate, CurveError> {
        let prepared = self
            .pool
            .prepare_swap_wrapped(i, j, amount, tolerance)
            .await?;
        self.pool.estimate(prepared).await
    }

    pub async fn stake_approve<A: ToDecimal + ?Sized>(&self, lp_amount: &A) -> Result<GasEstimate, CurveError> {
        let approval = self.pool.stake_approval(self.pool.lp_token.parse(lp_amount)?)?;
        self.approvals(Some(approval)).await
    }

    pub async fn stake<A: ToDecimal + ?Sized>(&self, lp_amount: &A) -> Result<GasEstimate, CurveError> {
        let prepared = self.pool.prepare_stake(lp_amount).await?;
        self.pool.estimate(prepared).await
    }

    pub async fn unstake<A: ToDecimal + ?Sized>(&self, lp_amount: &A) -> Result<GasEstimate, CurveError> {
        let prepared = self.pool.prepare_unstake(lp_amount).await?;
        self.pool.estimate(prepared).await
    }

    pub async fn claim_crv(&self) -> Result<GasEstimate, CurveError> {
        let prepared = self.pool.prepare_claim_crv()?;
        self.pool.estimate(prepared).await
    }
}
