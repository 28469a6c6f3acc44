use crate::core::abi::{ContractCall, decode_u256};
use crate::errors::CurveError;
use alloy_network::ReceiptResponse;
use alloy_primitives::{Address, Bytes, TxHash, U256};
use alloy_provider::Provider;
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::{SolCall, sol};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

sol! {
    interface IMulticall3 {
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        struct Result {
            bool success;
            bytes returnData;
        }

        function aggregate3(Call3[] calldata calls) external payable returns (Result[] memory returnData);
        function getEthBalance(address addr) external view returns (uint256 balance);
    }

    interface IGasPriceOracle {
        function getL1GasUsed(bytes memory data) external view returns (uint256);
    }
}

/// The contract-call collaborator every pool operation goes through.
///
/// `read` resolves all of its calls against one block so the values are a
/// consistent snapshot. Writes are submitted one at a time; callers await
/// `wait_for_confirmation` before submitting anything that depends on them.
#[async_trait]
pub trait ChainTransport: Send + Sync {
    async fn read(&self, calls: &[ContractCall]) -> Result<Vec<Bytes>, CurveError>;

    async fn estimate_gas(&self, from: Address, call: &ContractCall) -> Result<u64, CurveError>;

    /// L1 data-posting gas of `call` on a rollup.
    async fn estimate_l1_data_gas(&self, call: &ContractCall) -> Result<u64, CurveError>;

    async fn send(
        &self,
        from: Address,
        call: &ContractCall,
        gas_limit: u64,
    ) -> Result<TxHash, CurveError>;

    async fn wait_for_confirmation(&self, hash: TxHash) -> Result<(), CurveError>;
}

/// Reads `calls` in one batch and decodes every result as a single `uint256`.
pub async fn read_u256s<T: ChainTransport + ?Sized>(
    transport: &T,
    calls: &[ContractCall],
) -> Result<Vec<U256>, CurveError> {
    let results = transport.read(calls).await?;
    if results.len() != calls.len() {
        return Err(CurveError::AbiDecodeError(format!(
            "{} results for {} calls",
            results.len(),
            calls.len()
        )));
    }
    results.iter().map(decode_u256).collect()
}

/// [`ChainTransport`] backed by an alloy provider. Batched reads go through
/// Multicall3 `aggregate3`; the provider is expected to carry the signer.
pub struct AlloyTransport<P: ?Sized> {
    provider: Arc<P>,
    multicall: Address,
    l1_gas_oracle: Option<Address>,
    poll_interval: Duration,
}

impl<P: Provider + Send + Sync + 'static + ?Sized> AlloyTransport<P> {
    pub fn new(provider: Arc<P>, multicall: Address, l1_gas_oracle: Option<Address>) -> Self {
        Self {
            provider,
            multicall,
            l1_gas_oracle,
            poll_interval: Duration::from_secs(2),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn request(from: Option<Address>, call: &ContractCall) -> TransactionRequest {
        let request = TransactionRequest::default()
            .to(call.to)
            .input(call.calldata.clone().into())
            .value(call.value);
        match from {
            Some(from) => request.from(from),
            None => request,
        }
    }
}

#[async_trait]
impl<P: Provider + Send + Sync + 'static + ?Sized> ChainTransport for AlloyTransport<P> {
    async fn read(&self, calls: &[ContractCall]) -> Result<Vec<Bytes>, CurveError> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }
        trace!(count = calls.len(), multicall = %self.multicall, "aggregate3 read");

        let batch = IMulticall3::aggregate3Call {
            calls: calls
                .iter()
                .map(|c| IMulticall3::Call3 {
                    target: c.to,
                    allowFailure: false,
                    callData: c.calldata.clone(),
                })
                .collect(),
        };
        let request = TransactionRequest::default()
            .to(self.multicall)
            .input(batch.abi_encode().into());
        let result_bytes = self
            .provider
            .call(request)
            .await
            .map_err(|e| CurveError::ProviderError(e.to_string()))?;
        let results = IMulticall3::aggregate3Call::abi_decode_returns(&result_bytes)?;

        if results.len() != calls.len() {
            return Err(CurveError::AbiDecodeError(format!(
                "aggregate3 returned {} results for {} calls",
                results.len(),
                calls.len()
            )));
        }
        Ok(results.into_iter().map(|r| r.returnData).collect())
    }

    async fn estimate_gas(&self, from: Address, call: &ContractCall) -> Result<u64, CurveError> {
        let gas = self
            .provider
            .estimate_gas(Self::request(Some(from), call))
            .await
            .map_err(|e| CurveError::ProviderError(format!("{call}: {e}")))?;
        trace!(%call, gas, "estimated execution gas");
        Ok(gas)
    }

    async fn estimate_l1_data_gas(&self, call: &ContractCall) -> Result<u64, CurveError> {
        let oracle = self.l1_gas_oracle.ok_or_else(|| {
            CurveError::ConfigError("no L1 gas oracle configured for this network".into())
        })?;
        let request = TransactionRequest::default().to(oracle).input(
            IGasPriceOracle::getL1GasUsedCall {
                data: call.calldata.clone(),
            }
            .abi_encode()
            .into(),
        );
        let result_bytes = self
            .provider
            .call(request)
            .await
            .map_err(|e| CurveError::ProviderError(e.to_string()))?;
        let gas = decode_u256(&result_bytes)?;
        u64::try_from(gas)
            .map_err(|_| CurveError::CalculationError(format!("L1 data gas {gas} overflows u64")))
    }

    async fn send(
        &self,
        from: Address,
        call: &ContractCall,
        gas_limit: u64,
    ) -> Result<TxHash, CurveError> {
        let pending = self
            .provider
            .send_transaction(Self::request(Some(from), call).gas_limit(gas_limit))
            .await
            .map_err(|e| CurveError::ProviderError(format!("{call}: {e}")))?;
        let hash = *pending.tx_hash();
        debug!(%call, %hash, gas_limit, "transaction submitted");
        Ok(hash)
    }

    async fn wait_for_confirmation(&self, hash: TxHash) -> Result<(), CurveError> {
        loop {
            let receipt = self
                .provider
                .get_transaction_receipt(hash)
                .await
                .map_err(|e| CurveError::ProviderError(e.to_string()))?;
            if let Some(receipt) = receipt {
                if !receipt.status() {
                    return Err(CurveError::TransactionReverted(hash));
                }
                debug!(%hash, "transaction confirmed");
                return Ok(());
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
