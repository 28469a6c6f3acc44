use crate::context::NetworkConfig;
use crate::core::abi::ContractCall;
use crate::core::transport::ChainTransport;
use crate::errors::CurveError;
use alloy_primitives::{Address, TxHash};
use serde::Serialize;
use std::iter::Sum;
use std::ops::Add;
use tracing::debug;

const BP_DENOMINATOR: u128 = 10_000;

/// Gas reported by an estimate-only call.
///
/// `l1_data` is set on rollups. `approximated` marks estimates that include
/// a heuristic component (see [`crate::core::allowance`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct GasEstimate {
    pub execution: u64,
    pub l1_data: Option<u64>,
    pub approximated: bool,
}

impl GasEstimate {
    pub fn execution(gas: u64) -> Self {
        Self {
            execution: gas,
            ..Self::default()
        }
    }

    pub fn rollup(execution: u64, l1_data: u64) -> Self {
        Self {
            execution,
            l1_data: Some(l1_data),
            approximated: false,
        }
    }

    pub fn approximate(mut self) -> Self {
        self.approximated = true;
        self
    }

    /// `[execution]` or `[execution, l1_data]`.
    pub fn components(&self) -> Vec<u64> {
        match self.l1_data {
            Some(data) => vec![self.execution, data],
            None => vec![self.execution],
        }
    }
}

impl Add for GasEstimate {
    type Output = GasEstimate;

    fn add(self, rhs: GasEstimate) -> GasEstimate {
        let l1_data = match (self.l1_data, rhs.l1_data) {
            (None, None) => None,
            (a, b) => Some(a.unwrap_or(0).saturating_add(b.unwrap_or(0))),
        };
        GasEstimate {
            execution: self.execution.saturating_add(rhs.execution),
            l1_data,
            approximated: self.approximated || rhs.approximated,
        }
    }
}

impl Sum for GasEstimate {
    fn sum<I: Iterator<Item = GasEstimate>>(iter: I) -> Self {
        iter.fold(GasEstimate::default(), Add::add)
    }
}

/// `ceil(raw * multiplier_bp / 10_000)`.
pub fn apply_multiplier(raw: u64, multiplier_bp: u32) -> u64 {
    let scaled = (u128::from(raw) * u128::from(multiplier_bp)).div_ceil(BP_DENOMINATOR);
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

/// Gas limit for a transaction whose estimate is `estimate`.
pub fn gas_limit(estimate: &GasEstimate, multiplier_bp: u32) -> u64 {
    apply_multiplier(estimate.execution, multiplier_bp)
}

pub async fn estimate_call<T: ChainTransport + ?Sized>(
    transport: &T,
    network: &NetworkConfig,
    from: Address,
    call: &ContractCall,
) -> Result<GasEstimate, CurveError> {
    let execution = transport.estimate_gas(from, call).await?;
    if network.is_rollup {
        let l1_data = transport.estimate_l1_data_gas(call).await?;
        Ok(GasEstimate::rollup(execution, l1_data))
    } else {
        Ok(GasEstimate::execution(execution))
    }
}

/// Estimates `call`, scales the execution gas and submits it.
pub async fn submit<T: ChainTransport + ?Sized>(
    transport: &T,
    from: Address,
    call: &ContractCall,
    multiplier_bp: u32,
) -> Result<TxHash, CurveError> {
    let raw = transport.estimate_gas(from, call).await?;
    let limit = apply_multiplier(raw, multiplier_bp);
    debug!(%call, raw, limit, multiplier_bp, "submitting");
    transport.send(from, call, limit).await
}
